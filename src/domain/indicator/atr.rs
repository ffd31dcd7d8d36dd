//! Average True Range: Wilder smoothing of the true range.

use crate::domain::bar_series::BarSeries;
use crate::domain::cache::SeriesCache;
use crate::domain::error::SamtaError;
use crate::domain::indicator::ema::rma;
use crate::domain::ohlcv::Field;
use crate::domain::projection::project;
use crate::domain::series::SeriesId;

pub fn atr(cache: &mut SeriesCache, bars: &BarSeries, length: usize) -> Result<SeriesId, SamtaError> {
    let true_range = project(cache, bars, Field::TrueRange)?;
    rma(cache, true_range, length).map_err(|e| e.within(format!("atr({}, {length})", bars.id())))
}
