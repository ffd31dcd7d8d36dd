//! Exponential and Wilder (running) moving averages.
//!
//! Both seed with the SMA of the first n values, then
//! v[t] = (src[t] - v[t-1]) * k + v[t-1], with k = 2/(n+1) for EMA and
//! k = 1/n for RMA. Warmup: the first (n-1) points are absent.

use crate::domain::cache::{SeriesCache, Signature};
use crate::domain::catch_up::catch_up;
use crate::domain::error::SamtaError;
use crate::domain::indicator::{mean, require_lookback};
use crate::domain::series::SeriesId;

pub fn ema(cache: &mut SeriesCache, src: SeriesId, length: usize) -> Result<SeriesId, SamtaError> {
    smooth(cache, "ema", src, length, 2.0 / (length as f64 + 1.0))
}

/// Wilder smoothing, the basis of RSI, ATR and DMI.
pub fn rma(cache: &mut SeriesCache, src: SeriesId, length: usize) -> Result<SeriesId, SamtaError> {
    smooth(cache, "rma", src, length, 1.0 / length as f64)
}

fn smooth(
    cache: &mut SeriesCache,
    kind: &'static str,
    src: SeriesId,
    length: usize,
    k: f64,
) -> Result<SeriesId, SamtaError> {
    require_lookback(cache, kind, src, length, length)?;
    let signature = Signature::new(kind, [src], [length.into()]);
    catch_up(cache, signature, src, length, |step, window| {
        if let Some(prev) = step.prev_output() {
            return Ok(Some((step.value() - prev) * k + prev));
        }
        Ok((window.len() == length).then(|| mean(window)))
    })
}
