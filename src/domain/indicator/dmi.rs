//! Directional Movement Index.
//!
//! +DM = up move when it exceeds the down move and is positive, else 0 (and
//! the mirror for -DM). +DI/-DI = 100 * RMA(DM, n) / RMA(true range, n);
//! ADX = 100 * RMA(|+DI - -DI| / (+DI + -DI), smoothing), with a zero sum
//! treated as 1.

use crate::domain::bar_series::BarSeries;
use crate::domain::cache::SeriesCache;
use crate::domain::error::SamtaError;
use crate::domain::indicator::change::change;
use crate::domain::indicator::ema::rma;
use crate::domain::indicator::operation::{add, combine, diff_abs, div, map, mul_const};
use crate::domain::ohlcv::Field;
use crate::domain::projection::project;
use crate::domain::series::SeriesId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmiSeries {
    pub plus: SeriesId,
    pub minus: SeriesId,
    pub adx: SeriesId,
}

pub fn dmi(
    cache: &mut SeriesCache,
    bars: &BarSeries,
    length: usize,
    smoothing: usize,
) -> Result<DmiSeries, SamtaError> {
    directional(cache, bars, length, smoothing)
        .map_err(|e| e.within(format!("dmi({}, {length}, {smoothing})", bars.id())))
}

fn directional(
    cache: &mut SeriesCache,
    bars: &BarSeries,
    length: usize,
    smoothing: usize,
) -> Result<DmiSeries, SamtaError> {
    let high = project(cache, bars, Field::High)?;
    let low = project(cache, bars, Field::Low)?;
    let true_range = project(cache, bars, Field::TrueRange)?;

    let up = change(cache, high, 1)?;
    let down = change(cache, low, 1)?;
    let plus_dm = combine(cache, "plus_dm", up, down, |up, down| {
        if up > -down && up > 0.0 { up } else { 0.0 }
    })?;
    let minus_dm = combine(cache, "minus_dm", down, up, |down, up| {
        if -down > up && -down > 0.0 { -down } else { 0.0 }
    })?;

    let range = rma(cache, true_range, length)?;
    let plus_avg = rma(cache, plus_dm, length)?;
    let minus_avg = rma(cache, minus_dm, length)?;
    let plus_ratio = div(cache, plus_avg, range)?;
    let minus_ratio = div(cache, minus_avg, range)?;
    let plus = mul_const(cache, plus_ratio, 100.0)?;
    let minus = mul_const(cache, minus_ratio, 100.0)?;

    let total = add(cache, plus, minus)?;
    let denom = map(cache, "nonzero", total, [], |x| if x == 0.0 { 1.0 } else { x })?;
    let spread = diff_abs(cache, plus, minus)?;
    let dx = div(cache, spread, denom)?;
    let dx_avg = rma(cache, dx, smoothing)?;
    let adx = mul_const(cache, dx_avg, 100.0)?;

    Ok(DmiSeries { plus, minus, adx })
}
