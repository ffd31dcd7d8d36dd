#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use samta::domain::bar_series::BarSeries;
use samta::domain::cache::SeriesCache;
use samta::domain::error::SamtaError;
pub use samta::domain::ohlcv::Bar;
use samta::domain::series::{SeriesId, TimeSeries, Timestamp};
use samta::ports::data_port::{DataSource, RefillRequest};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Scripted data source: answers each `populate` call with the next queued
/// response and records the `after` timestamp it was asked for.
pub struct MockDataSource {
    pub responses: VecDeque<Result<Vec<Bar>, String>>,
    pub requests: Rc<RefCell<Vec<Option<Timestamp>>>>,
    pub delay: Duration,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            requests: Rc::new(RefCell::new(Vec::new())),
            delay: Duration::ZERO,
        }
    }

    pub fn with_bars(mut self, bars: Vec<Bar>) -> Self {
        self.responses.push_back(Ok(bars));
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.responses.push_back(Err(reason.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn request_log(&self) -> Rc<RefCell<Vec<Option<Timestamp>>>> {
        Rc::clone(&self.requests)
    }
}

impl DataSource for MockDataSource {
    fn populate(&mut self, request: &RefillRequest) -> Result<Vec<Bar>, SamtaError> {
        self.requests.borrow_mut().push(request.after);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        match self.responses.pop_front() {
            Some(Ok(bars)) => Ok(bars),
            Some(Err(reason)) => Err(SamtaError::Data { reason }),
            None => Ok(Vec::new()),
        }
    }
}

/// Five-minute spaced timestamps.
pub fn at(i: i64) -> Timestamp {
    Utc.timestamp_opt(1_700_000_000 + i * 300, 0).unwrap()
}

pub fn make_bar(i: i64, close: f64) -> Bar {
    Bar {
        timestamp: at(i),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
    }
}

pub fn make_ohlcv(i: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
    Bar {
        timestamp: at(i),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Flat bars from closes, starting at index `from`.
pub fn bars_from(from: i64, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(from + i as i64, c))
        .collect()
}

/// Bar series over `closes` with the cursor on the last bar.
pub fn bar_series(closes: &[f64]) -> BarSeries {
    let mut bars = BarSeries::from_bars(bars_from(0, closes));
    bars.set_current(at(closes.len() as i64 - 1));
    bars
}

/// Registers `values` as a plain series with the cursor on the last point.
pub fn series_of(cache: &mut SeriesCache, values: &[f64]) -> SeriesId {
    let mut series = TimeSeries::new();
    for (i, &v) in values.iter().enumerate() {
        series.set(at(i as i64), v);
    }
    series.set_current(at(values.len() as i64 - 1));
    cache.insert_series(series)
}

/// Ten bars of fixed OHLCV data.
pub fn static_bars() -> Vec<Bar> {
    [
        (11.3, 19.7, 11.1, 16.5, 11.6),
        (12.9, 19.1, 12.3, 18.7, 13.0),
        (11.0, 18.8, 10.3, 18.2, 13.8),
        (19.2, 19.6, 11.7, 11.9, 15.9),
        (18.1, 19.5, 11.2, 19.3, 16.8),
        (19.4, 19.8, 13.5, 14.2, 19.1),
        (19.1, 19.5, 12.9, 14.4, 14.7),
        (10.6, 19.9, 10.3, 11.0, 11.7),
        (18.8, 19.0, 12.4, 14.7, 17.4),
        (17.1, 17.6, 10.0, 10.3, 15.0),
    ]
    .iter()
    .enumerate()
    .map(|(i, &(o, h, l, c, v))| make_ohlcv(i as i64, o, h, l, c, v))
    .collect()
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
