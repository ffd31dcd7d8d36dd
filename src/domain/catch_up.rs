//! The catch-up traversal shared by every derivation.
//!
//! A derived series records the last source timestamp it consumed (its
//! watermark). Each call walks the source from the node after the watermark up
//! to a stop timestamp captured once at the start, applies the derivation's
//! recurrence to every node, and leaves the derived cursor on the stop.

use crate::domain::cache::{CacheEntry, SeriesCache, Signature};
use crate::domain::error::SamtaError;
use crate::domain::ohlcv::Bar;
use crate::domain::series::{Node, NodeId, SeriesId, TimeSeries, Timestamp};
use std::collections::VecDeque;

/// What a recurrence sees at one source node.
pub(crate) struct Step<'a, T> {
    cache: &'a SeriesCache,
    source: &'a TimeSeries<T>,
    output: &'a TimeSeries<f64>,
    node: &'a Node<T>,
}

impl<'a, T> Step<'a, T> {
    pub(crate) fn timestamp(&self) -> Timestamp {
        self.node.timestamp()
    }

    pub(crate) fn value(&self) -> &T {
        self.node.value()
    }

    /// Value of the source node preceding this one.
    pub(crate) fn prev_value(&self) -> Option<&T> {
        self.prev_node().map(Node::value)
    }

    /// Output already written at the preceding source node.
    pub(crate) fn prev_output(&self) -> Option<f64> {
        self.prev_node()
            .and_then(|prev| self.output.get(prev.timestamp()))
            .copied()
    }

    /// Another cached series, read-only.
    pub(crate) fn input(&self, id: SeriesId) -> Result<&'a TimeSeries<f64>, SamtaError> {
        self.cache.source(id)
    }

    /// Value of `id` at this step's timestamp.
    pub(crate) fn aligned(&self, id: SeriesId) -> Result<Option<f64>, SamtaError> {
        Ok(self.input(id)?.get(self.timestamp()).copied())
    }

    /// Source nodes before this one, newest first.
    pub(crate) fn earlier(&self) -> impl Iterator<Item = &'a Node<T>> {
        let source = self.source;
        std::iter::successors(self.prev_node(), move |node| {
            node.prev().and_then(|id| source.node(id))
        })
    }

    fn prev_node(&self) -> Option<&'a Node<T>> {
        self.node.prev().and_then(|id| self.source.node(id))
    }
}

/// Extends the series for `signature` over the cached source `src`.
///
/// `window` is how many trailing source values (current one included) the
/// recurrence receives; 0 disables the buffer. Returning `Ok(None)` from the
/// recurrence leaves the point absent.
pub(crate) fn catch_up<F>(
    cache: &mut SeriesCache,
    signature: Signature,
    src: SeriesId,
    window: usize,
    recurrence: F,
) -> Result<SeriesId, SamtaError>
where
    F: FnMut(&Step<'_, f64>, &VecDeque<f64>) -> Result<Option<f64>, SamtaError>,
{
    let name = signature.to_string();
    let dst = cache.resolve(signature);
    let stop = match cache.source(src) {
        Ok(source) => source.current().map(Node::timestamp),
        Err(err) => return Err(err.within(name)),
    };
    let Some(stop) = stop else {
        return Ok(dst);
    };

    let mut entry = cache.take(dst).map_err(|e| e.within(name.clone()))?;
    let outcome = {
        let shared: &SeriesCache = cache;
        shared
            .source(src)
            .and_then(|source| walk(shared, source, &mut entry, stop, window, recurrence))
    };
    finish(cache, dst, entry, outcome, name)
}

/// Same traversal with a bar series as the source.
pub(crate) fn catch_up_bars<F>(
    cache: &mut SeriesCache,
    signature: Signature,
    bars: &TimeSeries<Bar>,
    window: usize,
    recurrence: F,
) -> Result<SeriesId, SamtaError>
where
    F: FnMut(&Step<'_, Bar>, &VecDeque<Bar>) -> Result<Option<f64>, SamtaError>,
{
    let name = signature.to_string();
    let dst = cache.resolve(signature);
    let Some(stop) = bars.current().map(Node::timestamp) else {
        return Ok(dst);
    };

    let mut entry = cache.take(dst).map_err(|e| e.within(name.clone()))?;
    let outcome = walk(cache, bars, &mut entry, stop, window, recurrence);
    finish(cache, dst, entry, outcome, name)
}

fn finish(
    cache: &mut SeriesCache,
    dst: SeriesId,
    entry: CacheEntry,
    outcome: Result<u64, SamtaError>,
    name: String,
) -> Result<SeriesId, SamtaError> {
    cache.restore(dst, entry);
    match outcome {
        Ok(visited) => {
            cache.record_visits(visited);
            Ok(dst)
        }
        Err(err) => Err(err.within(name)),
    }
}

fn resume_point<T>(
    source: &TimeSeries<T>,
    watermark: Option<Timestamp>,
) -> Result<Option<NodeId>, SamtaError> {
    let Some(mark) = watermark else {
        return Ok(source.first_id());
    };
    let id = source.node_at(mark).ok_or_else(|| SamtaError::Structural {
        reason: format!(
            "source {} no longer holds {mark}, the last point already consumed",
            source.id()
        ),
    })?;
    Ok(source.node(id).and_then(Node::next))
}

fn walk<T, F>(
    cache: &SeriesCache,
    source: &TimeSeries<T>,
    entry: &mut CacheEntry,
    stop: Timestamp,
    window: usize,
    mut recurrence: F,
) -> Result<u64, SamtaError>
where
    T: Clone,
    F: FnMut(&Step<'_, T>, &VecDeque<T>) -> Result<Option<f64>, SamtaError>,
{
    let resume = resume_point(source, entry.watermark)?;

    let mut buffer = VecDeque::with_capacity(window + 1);
    if window > 1 {
        if let Some(prev) = resume.and_then(|id| source.node(id)).and_then(Node::prev) {
            buffer.extend(source.trailing(prev, window - 1).into_iter().cloned());
        }
    }

    let mut visited = 0;
    let mut at = resume;
    while let Some(node) = at.and_then(|id| source.node(id)) {
        let timestamp = node.timestamp();
        if timestamp > stop {
            break;
        }
        if window > 0 {
            buffer.push_back(node.value().clone());
            if buffer.len() > window {
                buffer.pop_front();
            }
        }

        let step = Step {
            cache,
            source,
            output: &entry.series,
            node,
        };
        let out = recurrence(&step, &buffer)?;
        if let Some(value) = out {
            entry.series.set(timestamp, value);
        }
        entry.watermark = Some(timestamp);
        visited += 1;

        if timestamp == stop {
            break;
        }
        at = node.next();
    }

    entry.series.set_current(stop);
    Ok(visited)
}
