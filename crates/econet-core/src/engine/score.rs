//! Scalar index from class posteriors.
//!
//! Reduces each k-category posterior to its expected ordinal level, then
//! min-max rescales the batch to `[0, 1]` using the batch's own observed
//! extremes. The result is a *relative* index within the batch, not an
//! absolute scale. When the target has more categories than there are
//! levels, the trailing `k` categories of the domain ordering are used.

use crate::engine::errors::EcoNetError;
use crate::engine::predict::Posterior;

/// Index value returned for every row of a degenerate (constant) batch,
/// where min-max rescaling would divide by zero.
pub const DEGENERATE_INDEX: f64 = 0.5;

/// Expected ordinal level per row, before rescaling.
///
/// `levels[i]` is the numeric level of the i-th of the trailing
/// `levels.len()` target categories. Skipped rows stay empty.
pub fn expected_values(
    posteriors: &[Option<Posterior>],
    levels: &[f64],
) -> Result<Vec<Option<f64>>, EcoNetError> {
    if levels.is_empty() {
        return Err(EcoNetError::Config("score: class levels are empty".into()));
    }
    if let Some(bad) = levels.iter().find(|l| !l.is_finite()) {
        return Err(EcoNetError::Config(format!(
            "score: class level {bad} is not finite"
        )));
    }

    let mut values = Vec::with_capacity(posteriors.len());
    for posterior in posteriors {
        match posterior {
            None => values.push(None),
            Some(p) => {
                let cardinality = p.probabilities.len();
                if cardinality < levels.len() {
                    return Err(EcoNetError::Config(format!(
                        "score: {} class levels but the target has {} categories",
                        levels.len(),
                        cardinality
                    )));
                }
                values.push(Some(p.expected_value(levels)));
            }
        }
    }
    Ok(values)
}

/// Min-max rescales the batch to `[0, 1]` in place.
///
/// A constant batch becomes [`DEGENERATE_INDEX`] everywhere instead of
/// propagating NaN; empty slots are left untouched and excluded from the
/// extremes.
pub fn min_max_rescale(values: &mut [Option<f64>]) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in values.iter().flatten() {
        min = min.min(*value);
        max = max.max(*value);
    }
    if min > max {
        // No observed values.
        return;
    }
    let range = max - min;
    for value in values.iter_mut() {
        if let Some(v) = value {
            *v = if range > 0.0 {
                (*v - min) / range
            } else {
                DEGENERATE_INDEX
            };
        }
    }
}

/// Full scoring step: expected ordinal level per row, rescaled to `[0, 1]`.
pub fn score(
    posteriors: &[Option<Posterior>],
    levels: &[f64],
) -> Result<Vec<Option<f64>>, EcoNetError> {
    let mut values = expected_values(posteriors, levels)?;
    min_max_rescale(&mut values);
    Ok(values)
}
