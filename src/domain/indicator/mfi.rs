//! Money Flow Index.
//!
//! Raw flow = typical price * volume, counted as positive when the typical
//! price rose and negative when it fell (both for the first bar).
//! mfi = 100 - 100 / (1 + sum(positive, n) / sum(negative, n)).

use crate::domain::bar_series::BarSeries;
use crate::domain::cache::{SeriesCache, Signature};
use crate::domain::catch_up::catch_up;
use crate::domain::error::SamtaError;
use crate::domain::indicator::sum::sum;
use crate::domain::ohlcv::Field;
use crate::domain::projection::project;
use crate::domain::series::SeriesId;

pub fn mfi(cache: &mut SeriesCache, bars: &BarSeries, length: usize) -> Result<SeriesId, SamtaError> {
    let signature = Signature::new("mfi", [bars.id()], [length.into()]);
    let name = signature.to_string();
    let (upper, lower) = flows(cache, bars, length).map_err(|e| e.within(name))?;

    catch_up(cache, signature, upper, 0, |step, _| {
        let Some(lower) = step.aligned(lower)? else {
            return Ok(None);
        };
        let index = 100.0 - 100.0 / (1.0 + step.value() / lower);
        Ok((!index.is_nan()).then_some(index))
    })
}

fn flows(
    cache: &mut SeriesCache,
    bars: &BarSeries,
    length: usize,
) -> Result<(SeriesId, SeriesId), SamtaError> {
    let typical = project(cache, bars, Field::TypicalPrice)?;
    let volume = project(cache, bars, Field::Volume)?;
    let positive = money_flow(cache, "mfi_positive", typical, volume, |delta| delta > 0.0)?;
    let negative = money_flow(cache, "mfi_negative", typical, volume, |delta| delta < 0.0)?;
    Ok((sum(cache, positive, length)?, sum(cache, negative, length)?))
}

fn money_flow(
    cache: &mut SeriesCache,
    kind: &'static str,
    typical: SeriesId,
    volume: SeriesId,
    counts: fn(f64) -> bool,
) -> Result<SeriesId, SamtaError> {
    let signature = Signature::new(kind, [typical, volume], []);
    catch_up(cache, signature, typical, 0, |step, _| {
        let Some(volume) = step.aligned(volume)? else {
            return Ok(None);
        };
        let price = *step.value();
        let counted = step.prev_value().is_none_or(|prev| counts(price - prev));
        Ok(Some(if counted { price * volume } else { 0.0 }))
    })
}
