//! Commodity Channel Index.
//!
//! cci[t] = (src[t] - SMA(n)[t]) / (0.015 * md[t]), where md is the mean
//! absolute deviation of the window from SMA(n)[t]. Absent when md is 0.

use crate::domain::cache::{SeriesCache, Signature};
use crate::domain::catch_up::catch_up;
use crate::domain::error::SamtaError;
use crate::domain::indicator::require_lookback;
use crate::domain::indicator::sma::sma;
use crate::domain::series::SeriesId;

const LAMBERT: f64 = 0.015;

/// Usually fed the typical price projection.
pub fn cci(cache: &mut SeriesCache, src: SeriesId, length: usize) -> Result<SeriesId, SamtaError> {
    require_lookback(cache, "cci", src, length, length)?;
    let signature = Signature::new("cci", [src], [length.into()]);
    let average = sma(cache, src, length).map_err(|e| e.within(signature.to_string()))?;

    catch_up(cache, signature, src, length, |step, window| {
        if window.len() < length {
            return Ok(None);
        }
        let Some(mean) = step.aligned(average)? else {
            return Ok(None);
        };
        let deviation = window.iter().map(|x| (x - mean).abs()).sum::<f64>() / length as f64;
        if deviation == 0.0 {
            return Ok(None);
        }
        Ok(Some((step.value() - mean) / (LAMBERT * deviation)))
    })
}
