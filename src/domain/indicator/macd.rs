//! Moving Average Convergence Divergence.
//!
//! line = EMA(fast) - EMA(slow), signal = EMA(line, signal),
//! histogram = line - signal.

use crate::domain::cache::SeriesCache;
use crate::domain::error::SamtaError;
use crate::domain::indicator::ema::ema;
use crate::domain::indicator::operation::sub;
use crate::domain::series::SeriesId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdSeries {
    pub line: SeriesId,
    pub signal: SeriesId,
    pub histogram: SeriesId,
}

pub fn macd(
    cache: &mut SeriesCache,
    src: SeriesId,
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<MacdSeries, SamtaError> {
    lines(cache, src, fast, slow, signal)
        .map_err(|e| e.within(format!("macd({src}, {fast}, {slow}, {signal})")))
}

fn lines(
    cache: &mut SeriesCache,
    src: SeriesId,
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<MacdSeries, SamtaError> {
    let fast = ema(cache, src, fast)?;
    let slow = ema(cache, src, slow)?;
    let line = sub(cache, fast, slow)?;
    let signal = ema(cache, line, signal)?;
    let histogram = sub(cache, line, signal)?;
    Ok(MacdSeries {
        line,
        signal,
        histogram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::testing::{at, series_of};
    use approx::assert_relative_eq;

    #[test]
    fn macd_lines_relate() {
        let mut cache = SeriesCache::new();
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let close = series_of(&mut cache, &closes);
        let out = macd(&mut cache, close, 3, 6, 4).unwrap();

        let fast = ema(&mut cache, close, 3).unwrap();
        let slow = ema(&mut cache, close, 6).unwrap();

        // the slow EMA gates the line
        assert_eq!(cache.value_at(out.line, at(4)), None);
        let line = cache.value_at(out.line, at(5)).unwrap();
        let expected = cache.value_at(fast, at(5)).unwrap() - cache.value_at(slow, at(5)).unwrap();
        assert_relative_eq!(line, expected);

        // signal needs 4 line points
        assert_eq!(cache.value_at(out.signal, at(7)), None);
        assert!(cache.value_at(out.signal, at(8)).is_some());

        let hist = cache.value(out.histogram).unwrap();
        assert_relative_eq!(
            hist,
            cache.value(out.line).unwrap() - cache.value(out.signal).unwrap()
        );
    }

    #[test]
    fn macd_is_memoized() {
        let mut cache = SeriesCache::new();
        let close = series_of(&mut cache, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let a = macd(&mut cache, close, 2, 3, 2).unwrap();
        let b = macd(&mut cache, close, 2, 3, 2).unwrap();
        assert_eq!(a, b);
    }
}
