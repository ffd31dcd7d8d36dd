//! Crossing detection between two series.
//!
//! Evaluated on `a`'s points: 1 when the ordering of a and b flipped since each
//! series' previous point, 0 otherwise. Points where `b` has no value are
//! absent; a point where either series has no previous value is 0.

use crate::domain::cache::{SeriesCache, Signature};
use crate::domain::catch_up::catch_up;
use crate::domain::error::SamtaError;
use crate::domain::series::{Node, SeriesId};

/// a moved from below b to above it.
pub fn crossover(cache: &mut SeriesCache, a: SeriesId, b: SeriesId) -> Result<SeriesId, SamtaError> {
    crossing(cache, "crossover", a, b, |[px, py], [x, y]| px < py && x > y)
}

/// a moved from above b to below it.
pub fn crossunder(cache: &mut SeriesCache, a: SeriesId, b: SeriesId) -> Result<SeriesId, SamtaError> {
    crossing(cache, "crossunder", a, b, |[px, py], [x, y]| px > py && x < y)
}

/// Either direction.
pub fn cross(cache: &mut SeriesCache, a: SeriesId, b: SeriesId) -> Result<SeriesId, SamtaError> {
    crossing(cache, "cross", a, b, |[px, py], [x, y]| {
        (px < py && x > y) || (px > py && x < y)
    })
}

fn crossing(
    cache: &mut SeriesCache,
    kind: &'static str,
    a: SeriesId,
    b: SeriesId,
    fired: fn([f64; 2], [f64; 2]) -> bool,
) -> Result<SeriesId, SamtaError> {
    let signature = Signature::new(kind, [a, b], []);
    catch_up(cache, signature, a, 0, |step, _| {
        let other = step.input(b)?;
        let Some(node) = other.node_at(step.timestamp()).and_then(|id| other.node(id)) else {
            return Ok(None);
        };
        let other_prev = node.prev().and_then(|id| other.node(id)).map(Node::value);
        let (Some(&prev_a), Some(&prev_b)) = (step.prev_value(), other_prev) else {
            return Ok(Some(0.0));
        };
        let now = [*step.value(), *node.value()];
        Ok(Some(if fired([prev_a, prev_b], now) { 1.0 } else { 0.0 }))
    })
}
