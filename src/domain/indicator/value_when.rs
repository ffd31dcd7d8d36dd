//! Source value captured at the n-th most recent point where a condition held.
//!
//! `condition` is a 0/1 series. Occurrence 0 is the latest point with
//! condition == 1, occurrence 1 the one before it, and so on.

use crate::domain::cache::{SeriesCache, Signature};
use crate::domain::catch_up::catch_up;
use crate::domain::error::SamtaError;
use crate::domain::series::SeriesId;
use std::collections::VecDeque;

pub fn value_when(
    cache: &mut SeriesCache,
    condition: SeriesId,
    src: SeriesId,
    occurrence: usize,
) -> Result<SeriesId, SamtaError> {
    let signature = Signature::new("value_when", [condition, src], [occurrence.into()]);
    let keep = occurrence + 1;
    let mut captured: Option<VecDeque<f64>> = None;

    catch_up(cache, signature, src, 0, |step, _| {
        let flags = step.input(condition)?;
        let held = |ts| flags.get(ts).is_some_and(|&flag| flag == 1.0);

        let captured = captured.get_or_insert_with(|| {
            // rebuild from history when resuming a cached result
            let mut seed: VecDeque<f64> = step
                .earlier()
                .filter(|node| held(node.timestamp()))
                .take(keep)
                .map(|node| *node.value())
                .collect();
            seed.make_contiguous().reverse();
            seed
        });

        if held(step.timestamp()) {
            captured.push_back(*step.value());
            if captured.len() > keep {
                captured.pop_front();
            }
        }
        Ok((captured.len() == keep).then(|| captured[0]))
    })
}
