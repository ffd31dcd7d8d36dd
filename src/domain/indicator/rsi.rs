//! Relative Strength Index.
//!
//! Gains and losses are the summed positive and negative moves over the last n
//! deltas, kept up to date by dropping the oldest delta and adding the newest.
//! Each is smoothed with RMA(n); RS = avg gain / avg loss and
//! RSI = 100 - 100 / (1 + RS). An infinite RS is replaced by 100.

use crate::domain::cache::{SeriesCache, Signature};
use crate::domain::catch_up::catch_up;
use crate::domain::error::SamtaError;
use crate::domain::indicator::ema::rma;
use crate::domain::indicator::require_lookback;
use crate::domain::series::SeriesId;

pub fn rsi(cache: &mut SeriesCache, src: SeriesId, length: usize) -> Result<SeriesId, SamtaError> {
    require_lookback(cache, "rsi", src, length, length + 1)?;
    let signature = Signature::new("rsi", [src], [length.into()]);
    let name = signature.to_string();

    let parts = |cache: &mut SeriesCache| -> Result<(SeriesId, SeriesId), SamtaError> {
        let gains = movement(cache, "rsi_gain", src, length, |delta| delta.max(0.0))?;
        let losses = movement(cache, "rsi_loss", src, length, |delta| (-delta).max(0.0))?;
        Ok((rma(cache, gains, length)?, rma(cache, losses, length)?))
    };
    let (avg_gain, avg_loss) = parts(cache).map_err(|e| e.within(name))?;

    catch_up(cache, signature, avg_gain, 0, |step, _| {
        let Some(loss) = step.aligned(avg_loss)? else {
            return Ok(None);
        };
        Ok(relative_strength(*step.value(), loss).map(|rs| 100.0 - 100.0 / (1.0 + rs)))
    })
}

fn relative_strength(gain: f64, loss: f64) -> Option<f64> {
    let rs = gain / loss;
    if rs.is_nan() {
        // flat market: no gains and no losses
        None
    } else if rs == f64::INFINITY {
        Some(100.0)
    } else {
        Some(rs)
    }
}

/// Total of `side(delta)` over the last `length` deltas.
fn movement(
    cache: &mut SeriesCache,
    kind: &'static str,
    src: SeriesId,
    length: usize,
    side: fn(f64) -> f64,
) -> Result<SeriesId, SamtaError> {
    let signature = Signature::new(kind, [src], [length.into()]);
    catch_up(cache, signature, src, length + 2, |step, window| {
        let n = window.len();
        if n == length + 2 {
            if let Some(prev) = step.prev_output() {
                let dropped = side(window[1] - window[0]);
                let added = side(window[n - 1] - window[n - 2]);
                return Ok(Some(prev - dropped + added));
            }
        }
        if n < length + 1 {
            return Ok(None);
        }
        let recent = window.iter().skip(n - length - 1);
        let total: f64 = recent
            .clone()
            .zip(recent.skip(1))
            .map(|(a, b)| side(b - a))
            .sum();
        Ok(Some(total))
    })
}
