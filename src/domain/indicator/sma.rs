//! Simple Moving Average.
//!
//! SMA[t] = mean of the trailing n source values ending at t.
//! Absent until n values exist.

use crate::domain::cache::{SeriesCache, Signature};
use crate::domain::catch_up::catch_up;
use crate::domain::error::SamtaError;
use crate::domain::indicator::{mean, require_lookback};
use crate::domain::series::SeriesId;

pub fn sma(cache: &mut SeriesCache, src: SeriesId, length: usize) -> Result<SeriesId, SamtaError> {
    require_lookback(cache, "sma", src, length, length)?;
    let signature = Signature::new("sma", [src], [length.into()]);
    catch_up(cache, signature, src, length, |_, window| {
        Ok((window.len() == length).then(|| mean(window)))
    })
}
