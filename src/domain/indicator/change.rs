//! Change and rate of change against the value n points back.
//!
//! change[t] = src[t] - src[t-n]; roc[t] = 100 * change[t] / src[t-n].

use crate::domain::cache::{SeriesCache, Signature};
use crate::domain::catch_up::catch_up;
use crate::domain::error::SamtaError;
use crate::domain::indicator::require_lookback;
use crate::domain::series::SeriesId;

pub fn change(cache: &mut SeriesCache, src: SeriesId, length: usize) -> Result<SeriesId, SamtaError> {
    against_lag(cache, "change", src, length, |now, then| now - then)
}

pub fn roc(cache: &mut SeriesCache, src: SeriesId, length: usize) -> Result<SeriesId, SamtaError> {
    against_lag(cache, "roc", src, length, |now, then| 100.0 * (now - then) / then)
}

fn against_lag(
    cache: &mut SeriesCache,
    kind: &'static str,
    src: SeriesId,
    length: usize,
    op: fn(f64, f64) -> f64,
) -> Result<SeriesId, SamtaError> {
    require_lookback(cache, kind, src, length, length + 1)?;
    let signature = Signature::new(kind, [src], [length.into()]);
    catch_up(cache, signature, src, length + 1, |step, window| {
        Ok((window.len() == length + 1).then(|| op(*step.value(), window[0])))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::testing::{at, series_of};
    use approx::assert_relative_eq;

    fn values(cache: &SeriesCache, id: SeriesId) -> Vec<Option<f64>> {
        (0..4).map(|i| cache.value_at(id, at(i))).collect()
    }

    #[test]
    fn change_by_lag() {
        let mut cache = SeriesCache::new();
        let close = series_of(&mut cache, &[11.0, 14.0, 12.0, 13.0]);

        let c1 = change(&mut cache, close, 1).unwrap();
        let c2 = change(&mut cache, close, 2).unwrap();
        let c3 = change(&mut cache, close, 3).unwrap();

        assert_eq!(values(&cache, c1), vec![None, Some(3.0), Some(-2.0), Some(1.0)]);
        assert_eq!(values(&cache, c2), vec![None, None, Some(1.0), Some(-1.0)]);
        assert_eq!(values(&cache, c3), vec![None, None, None, Some(2.0)]);
    }

    #[test]
    fn roc_is_percent_of_lagged_value() {
        let mut cache = SeriesCache::new();
        let close = series_of(&mut cache, &[10.0, 11.0, 12.0, 9.0]);
        let out = roc(&mut cache, close, 2).unwrap();
        assert_eq!(cache.value_at(out, at(1)), None);
        assert_relative_eq!(cache.value_at(out, at(2)).unwrap(), 20.0);
        assert_relative_eq!(cache.value(out).unwrap(), -100.0 * 2.0 / 11.0);
    }

    #[test]
    fn zero_lag_is_rejected() {
        let mut cache = SeriesCache::new();
        let close = series_of(&mut cache, &[1.0]);
        assert!(matches!(
            change(&mut cache, close, 0),
            Err(SamtaError::Config { .. })
        ));
    }
}
