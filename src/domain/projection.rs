//! Projection of a bar field into a cached value series.

use crate::domain::bar_series::BarSeries;
use crate::domain::cache::{SeriesCache, Signature};
use crate::domain::catch_up::catch_up_bars;
use crate::domain::error::SamtaError;
use crate::domain::ohlcv::Field;
use crate::domain::series::SeriesId;

/// Extends the cached `field` series of `bars` up to the bar series' cursor.
///
/// The result is keyed on the bar series identity, so every derivation fed from
/// `project(cache, bars, Field::Close)` shares one close series.
pub fn project(
    cache: &mut SeriesCache,
    bars: &BarSeries,
    field: Field,
) -> Result<SeriesId, SamtaError> {
    let signature = Signature::new("project", [bars.id()], [field.into()]);
    catch_up_bars(cache, signature, bars.series(), 0, |step, _| {
        Ok(Some(field.extract(step.value(), step.prev_value())))
    })
}
