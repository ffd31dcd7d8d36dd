//! Windowed sum.
//!
//! Summed in full the first time n values are available, then carried forward
//! as prev - dropped + added.

use crate::domain::cache::{SeriesCache, Signature};
use crate::domain::catch_up::catch_up;
use crate::domain::error::SamtaError;
use crate::domain::indicator::require_lookback;
use crate::domain::series::SeriesId;

pub fn sum(cache: &mut SeriesCache, src: SeriesId, length: usize) -> Result<SeriesId, SamtaError> {
    require_lookback(cache, "sum", src, length, length)?;
    let signature = Signature::new("sum", [src], [length.into()]);
    catch_up(cache, signature, src, length + 1, |step, window| {
        if window.len() == length + 1 {
            if let Some(prev) = step.prev_output() {
                return Ok(Some(prev - window[0] + step.value()));
            }
        }
        if window.len() < length {
            return Ok(None);
        }
        Ok(Some(window.iter().skip(window.len() - length).sum::<f64>()))
    })
}
