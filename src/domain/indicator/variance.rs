//! Sample variance and standard deviation over a trailing window.
//!
//! variance[t] = sum((x - mean[t])^2) / max(n - 1, 1) over the last n values,
//! where mean[t] = SMA(n)[t]. stdev = variance^0.5.

use crate::domain::cache::{SeriesCache, Signature};
use crate::domain::catch_up::catch_up;
use crate::domain::error::SamtaError;
use crate::domain::indicator::operation::pow;
use crate::domain::indicator::require_lookback;
use crate::domain::indicator::sma::sma;
use crate::domain::series::SeriesId;

pub fn variance(
    cache: &mut SeriesCache,
    src: SeriesId,
    length: usize,
) -> Result<SeriesId, SamtaError> {
    require_lookback(cache, "variance", src, length, length)?;
    let signature = Signature::new("variance", [src], [length.into()]);
    let average = sma(cache, src, length).map_err(|e| e.within(signature.to_string()))?;
    let divisor = length.saturating_sub(1).max(1) as f64;

    catch_up(cache, signature, src, length, |step, window| {
        if window.len() < length {
            return Ok(None);
        }
        let Some(mean) = step.aligned(average)? else {
            return Ok(None);
        };
        let squares: f64 = window.iter().map(|x| (x - mean).powi(2)).sum();
        Ok(Some(squares / divisor))
    })
}

pub fn stdev(cache: &mut SeriesCache, src: SeriesId, length: usize) -> Result<SeriesId, SamtaError> {
    let var = variance(cache, src, length)?;
    pow(cache, var, 0.5).map_err(|e| e.within(format!("stdev({src}, {length})")))
}
