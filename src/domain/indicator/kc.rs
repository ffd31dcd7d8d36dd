//! Keltner channel.
//!
//! middle = EMA(src, n), range = EMA(true range or high - low, n),
//! upper/lower = middle +/- mult * range.

use crate::domain::bar_series::BarSeries;
use crate::domain::cache::SeriesCache;
use crate::domain::error::SamtaError;
use crate::domain::indicator::ema::ema;
use crate::domain::indicator::operation::{add, mul_const, sub};
use crate::domain::ohlcv::Field;
use crate::domain::projection::project;
use crate::domain::series::SeriesId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeltnerSeries {
    pub middle: SeriesId,
    pub upper: SeriesId,
    pub lower: SeriesId,
}

pub fn kc(
    cache: &mut SeriesCache,
    bars: &BarSeries,
    src: SeriesId,
    length: usize,
    mult: f64,
    use_true_range: bool,
) -> Result<KeltnerSeries, SamtaError> {
    channel(cache, bars, src, length, mult, use_true_range).map_err(|e| {
        e.within(format!(
            "kc({src}, {}, {length}, {mult}, {use_true_range})",
            bars.id()
        ))
    })
}

fn channel(
    cache: &mut SeriesCache,
    bars: &BarSeries,
    src: SeriesId,
    length: usize,
    mult: f64,
    use_true_range: bool,
) -> Result<KeltnerSeries, SamtaError> {
    let middle = ema(cache, src, length)?;
    let span = if use_true_range {
        project(cache, bars, Field::TrueRange)?
    } else {
        let high = project(cache, bars, Field::High)?;
        let low = project(cache, bars, Field::Low)?;
        sub(cache, high, low)?
    };
    let range = ema(cache, span, length)?;
    let offset = mul_const(cache, range, mult)?;
    Ok(KeltnerSeries {
        middle,
        upper: add(cache, middle, offset)?,
        lower: sub(cache, middle, offset)?,
    })
}
