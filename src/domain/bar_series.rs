//! Bar series: a time-indexed series of candles with pull-based refill.
//!
//! The cursor marks the most recent bar the caller has stepped onto. `next()`
//! advances it one bar at a time; once the series runs out and a data source is
//! registered, the source is asked for more bars under the [`RefillPolicy`].
//! Refilled bars are held back and appended one per step, so a window bound
//! smaller than a refill batch never evicts a bar before the cursor reaches it.

use crate::domain::error::SamtaError;
use crate::domain::ohlcv::Bar;
use crate::domain::series::{Node, NodeId, SeriesId, TimeSeries, Timestamp};
use crate::ports::data_port::{DataSource, RefillRequest};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Retry and deadline rules for refills.
#[derive(Debug, Clone, PartialEq)]
pub struct RefillPolicy {
    /// Total tries per refill, at least 1.
    pub max_attempts: u32,
    /// Per-attempt deadline; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Pause between failed attempts.
    pub backoff: Duration,
}

impl Default for RefillPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            timeout: Some(Duration::from_secs(5)),
            backoff: Duration::ZERO,
        }
    }
}

impl RefillPolicy {
    /// Asks `source` for bars after `after`, retrying failed or late responses.
    pub fn fetch(
        &self,
        source: &mut dyn DataSource,
        after: Option<Timestamp>,
    ) -> Result<Vec<Bar>, SamtaError> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let request = RefillRequest {
                after,
                deadline: self.timeout.map(|t| Instant::now() + t),
            };
            let outcome = source.populate(&request).and_then(|bars| {
                if request.expired() {
                    Err(SamtaError::RefillTimeout {
                        timeout_ms: self.timeout.map_or(0, |t| t.as_millis() as u64),
                    })
                } else {
                    Ok(bars)
                }
            });
            match outcome {
                Ok(bars) => return Ok(bars),
                Err(err) if attempt < attempts => {
                    warn!(attempt, max_attempts = attempts, error = %err, "refill attempt failed");
                    if !self.backoff.is_zero() {
                        std::thread::sleep(self.backoff);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

pub struct BarSeries {
    bars: TimeSeries<Bar>,
    // fetched but not yet stepped onto, oldest first
    pending: VecDeque<Bar>,
    source: Option<Box<dyn DataSource>>,
    policy: RefillPolicy,
}

impl Default for BarSeries {
    fn default() -> Self {
        Self::new()
    }
}

impl BarSeries {
    pub fn new() -> Self {
        Self {
            bars: TimeSeries::new(),
            pending: VecDeque::new(),
            source: None,
            policy: RefillPolicy::default(),
        }
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            bars: TimeSeries::with_max_len(max_len),
            ..Self::new()
        }
    }

    pub fn from_bars(bars: impl IntoIterator<Item = Bar>) -> Self {
        let mut series = Self::new();
        for bar in bars {
            series.push(bar);
        }
        series
    }

    /// Series that falls back to `source` once the given bars are consumed.
    pub fn dynamic(bars: impl IntoIterator<Item = Bar>, source: Box<dyn DataSource>) -> Self {
        let mut series = Self::from_bars(bars);
        series.register_data_source(source);
        series
    }

    pub fn id(&self) -> SeriesId {
        self.bars.id()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Refilled bars waiting to be appended by `next()`.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn series(&self) -> &TimeSeries<Bar> {
        &self.bars
    }

    pub fn get(&self, timestamp: Timestamp) -> Option<&Bar> {
        self.bars.get(timestamp)
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first().map(Node::value)
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last().map(Node::value)
    }

    pub fn current(&self) -> Option<&Bar> {
        self.bars.value()
    }

    /// Appends at the tail, replacing a bar with the same timestamp.
    pub fn push(&mut self, bar: Bar) {
        self.bars.set(bar.timestamp, bar);
    }

    /// Overwrites the most recent bar in place. Returns false when `bar` does
    /// not carry the last bar's timestamp.
    ///
    /// Values already derived at that timestamp are not revisited.
    pub fn update_last(&mut self, bar: Bar) -> bool {
        match self.bars.last() {
            Some(last) if last.timestamp() == bar.timestamp => {
                self.bars.set(bar.timestamp, bar);
                true
            }
            _ => false,
        }
    }

    pub fn shift(&mut self) -> bool {
        self.bars.shift()
    }

    pub fn set_max_len(&mut self, max_len: usize) {
        self.bars.set_max_len(max_len);
    }

    pub fn max_len(&self) -> usize {
        self.bars.max_len()
    }

    pub fn register_data_source(&mut self, source: Box<dyn DataSource>) {
        self.source = Some(source);
    }

    pub fn set_refill_policy(&mut self, policy: RefillPolicy) {
        self.policy = policy;
    }

    /// Moves the cursor to the first bar.
    pub fn go_to_first(&mut self) -> Option<&Bar> {
        match self.bars.first_id() {
            Some(first) => self.bars.set_current_id(first),
            None => self.bars.clear_current(),
        }
        self.current()
    }

    /// Places the cursor directly on `timestamp`.
    pub fn set_current(&mut self, timestamp: Timestamp) -> bool {
        self.bars.set_current(timestamp)
    }

    /// Advances the cursor by one bar, refilling from the data source when the
    /// series is exhausted. `Ok(None)` means no more data right now; the cursor
    /// has not moved. On a refill error the series is left untouched.
    pub fn next(&mut self) -> Result<Option<&Bar>, SamtaError> {
        let target = match self.bars.current() {
            None => match self.bars.first_id() {
                Some(first) => Some(first),
                None => self.append_pending()?,
            },
            Some(cur) => match cur.next() {
                Some(next) => Some(next),
                None => self.append_pending()?,
            },
        };

        match target {
            Some(id) => {
                self.bars.set_current_id(id);
                Ok(self.current())
            }
            None => Ok(None),
        }
    }

    /// Appends the oldest pending bar, refilling first when none is pending.
    fn append_pending(&mut self) -> Result<Option<NodeId>, SamtaError> {
        if self.pending.is_empty() && !self.refill()? {
            return Ok(None);
        }
        let Some(bar) = self.pending.pop_front() else {
            return Ok(None);
        };
        self.bars.set(bar.timestamp, bar);
        Ok(self.bars.last_id())
    }

    fn refill(&mut self) -> Result<bool, SamtaError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(false);
        };
        let after = self.bars.last().map(Node::timestamp);
        let bars = self
            .policy
            .fetch(source.as_mut(), after)
            .map_err(|err| SamtaError::Refill {
                operation: match after {
                    Some(at) => format!("next() on bar series {} after {}", self.bars.id(), at),
                    None => format!("next() on empty bar series {}", self.bars.id()),
                },
                source: Box::new(err),
            })?;
        if bars.is_empty() {
            return Ok(false);
        }
        info!(series = %self.bars.id(), count = bars.len(), "queueing refilled bars");
        self.pending.extend(bars);
        Ok(true)
    }
}
