//! Point-wise arithmetic over cached series.
//!
//! Binary operations are aligned on the first operand: a point exists where
//! both operands have a value at the same timestamp. The second operand must
//! already be caught up to the first operand's cursor.

use crate::domain::cache::{Param, SeriesCache, Signature};
use crate::domain::catch_up::catch_up;
use crate::domain::error::SamtaError;
use crate::domain::series::SeriesId;

pub fn add(cache: &mut SeriesCache, a: SeriesId, b: SeriesId) -> Result<SeriesId, SamtaError> {
    combine(cache, "add", a, b, |x, y| x + y)
}

pub fn sub(cache: &mut SeriesCache, a: SeriesId, b: SeriesId) -> Result<SeriesId, SamtaError> {
    combine(cache, "sub", a, b, |x, y| x - y)
}

pub fn mul(cache: &mut SeriesCache, a: SeriesId, b: SeriesId) -> Result<SeriesId, SamtaError> {
    combine(cache, "mul", a, b, |x, y| x * y)
}

/// IEEE division: a zero divisor yields an infinite or NaN point.
pub fn div(cache: &mut SeriesCache, a: SeriesId, b: SeriesId) -> Result<SeriesId, SamtaError> {
    combine(cache, "div", a, b, |x, y| x / y)
}

/// |a - b|
pub fn diff_abs(cache: &mut SeriesCache, a: SeriesId, b: SeriesId) -> Result<SeriesId, SamtaError> {
    combine(cache, "diff_abs", a, b, |x, y| (x - y).abs())
}

pub fn add_const(cache: &mut SeriesCache, src: SeriesId, k: f64) -> Result<SeriesId, SamtaError> {
    map(cache, "add_const", src, [Param::float(k)], move |x| x + k)
}

pub fn sub_const(cache: &mut SeriesCache, src: SeriesId, k: f64) -> Result<SeriesId, SamtaError> {
    map(cache, "sub_const", src, [Param::float(k)], move |x| x - k)
}

pub fn mul_const(cache: &mut SeriesCache, src: SeriesId, k: f64) -> Result<SeriesId, SamtaError> {
    map(cache, "mul_const", src, [Param::float(k)], move |x| x * k)
}

pub fn div_const(cache: &mut SeriesCache, src: SeriesId, k: f64) -> Result<SeriesId, SamtaError> {
    map(cache, "div_const", src, [Param::float(k)], move |x| x / k)
}

pub fn pow(cache: &mut SeriesCache, src: SeriesId, exp: f64) -> Result<SeriesId, SamtaError> {
    map(cache, "pow", src, [Param::float(exp)], move |x| x.powf(exp))
}

/// Binary operation under its own cache `kind`.
pub(crate) fn combine(
    cache: &mut SeriesCache,
    kind: &'static str,
    a: SeriesId,
    b: SeriesId,
    op: fn(f64, f64) -> f64,
) -> Result<SeriesId, SamtaError> {
    let signature = Signature::new(kind, [a, b], []);
    catch_up(cache, signature, a, 0, |step, _| {
        Ok(step.aligned(b)?.map(|y| op(*step.value(), y)))
    })
}

/// Unary operation; `params` must capture everything `op` depends on.
pub(crate) fn map<F>(
    cache: &mut SeriesCache,
    kind: &'static str,
    src: SeriesId,
    params: impl IntoIterator<Item = Param>,
    op: F,
) -> Result<SeriesId, SamtaError>
where
    F: Fn(f64) -> f64,
{
    let signature = Signature::new(kind, [src], params);
    catch_up(cache, signature, src, 0, |step, _| Ok(Some(op(*step.value()))))
}
