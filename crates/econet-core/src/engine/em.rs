//! Expectation-maximization refinement of CPTs under partial observation.
//!
//! Each iteration runs an E-step (per-row posterior over the row's missing
//! variables under the current tables, used as fractional counts) and an
//! M-step (the frequency normalization of the estimator applied to the
//! expected counts). Iteration stops when the maximum absolute CPT entry
//! change drops below `epsilon` or the iteration cap is reached; hitting the
//! cap is a soft condition reported in the diagnostics, never an error.
//!
//! The per-row E-step is independent across rows and runs on rayon when the
//! `parallel` feature is enabled; the reduction sums soft counts and is
//! associative, so results agree with the sequential path up to
//! floating-point summation order.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::engine::cpt::{Cpt, FittedNetwork};
use crate::engine::errors::EcoNetError;
use crate::engine::estimator::cpt_from_counts;
use crate::engine::inference::{for_each_completion, log_likelihood};
use crate::engine::structure::NetworkStructure;
use crate::engine::table::EncodedTable;

/// Configuration for EM refinement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmConfig {
    /// Convergence threshold on the maximum absolute CPT entry change.
    pub epsilon: f64,
    /// Iteration cap. Reaching it is reported as non-convergence.
    pub max_iterations: usize,
}

impl Default for EmConfig {
    fn default() -> Self {
        Self {
            epsilon: 7e-5,
            max_iterations: 100,
        }
    }
}

impl EmConfig {
    pub fn validate(self) -> Result<Self, EcoNetError> {
        if !(self.epsilon > 0.0) || !self.epsilon.is_finite() {
            return Err(EcoNetError::Config(
                "em: epsilon must be finite and > 0".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(EcoNetError::Config("em: max_iterations must be > 0".into()));
        }
        Ok(self)
    }
}

/// Runtime diagnostics from one EM run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmDiagnostics {
    /// Iterations actually executed.
    pub iterations_run: usize,
    /// Whether the entry-change threshold was reached before the cap.
    pub converged: bool,
    /// Maximum absolute CPT entry change of the last iteration.
    pub final_max_delta: f64,
    /// Observed-data log-likelihood after each iteration's M-step.
    /// Non-decreasing within floating tolerance.
    pub log_likelihoods: Vec<f64>,
    /// Uniform-filled CPT columns in the final M-step.
    pub uniform_filled_columns: usize,
    /// Rows whose completions all had zero mass in the final E-step; such
    /// rows contribute no counts.
    pub zero_mass_rows: usize,
}

/// Refines `initial` CPTs on `data` until convergence or the iteration cap.
///
/// The last iterate is always returned; check
/// [`EmDiagnostics::converged`] for the outcome.
pub fn refine(
    structure: &NetworkStructure,
    initial: Vec<Cpt>,
    data: &EncodedTable,
    config: EmConfig,
) -> Result<(FittedNetwork, EmDiagnostics), EcoNetError> {
    let config = config.validate()?;
    if initial.len() != structure.len() {
        return Err(EcoNetError::Internal(format!(
            "em: expected {} initial CPTs, got {}",
            structure.len(),
            initial.len()
        )));
    }

    let mut cpts = initial;
    let mut diagnostics = EmDiagnostics {
        iterations_run: 0,
        converged: false,
        final_max_delta: f64::INFINITY,
        log_likelihoods: Vec::new(),
        uniform_filled_columns: 0,
        zero_mass_rows: 0,
    };

    for iteration in 0..config.max_iterations {
        let (counts, zero_mass_rows) = expected_counts(structure, &cpts, data);

        let mut next = Vec::with_capacity(cpts.len());
        let mut uniform_filled = 0usize;
        for var in structure.var_ids() {
            let (cpt, filled) = cpt_from_counts(structure, var, &counts[var.index()]);
            uniform_filled += filled;
            next.push(cpt);
        }

        let max_delta = cpts
            .iter()
            .zip(&next)
            .map(|(old, new)| old.max_abs_diff(new))
            .fold(0.0, f64::max);
        cpts = next;

        diagnostics.iterations_run = iteration + 1;
        diagnostics.final_max_delta = max_delta;
        diagnostics.uniform_filled_columns = uniform_filled;
        diagnostics.zero_mass_rows = zero_mass_rows;
        diagnostics
            .log_likelihoods
            .push(log_likelihood(structure, &cpts, data));

        tracing::debug!(
            iteration = diagnostics.iterations_run,
            max_delta,
            log_likelihood = diagnostics.log_likelihoods.last().copied().unwrap_or(f64::NAN),
            "em iteration"
        );

        if max_delta < config.epsilon {
            diagnostics.converged = true;
            break;
        }
    }

    if !diagnostics.converged {
        tracing::warn!(
            iterations = diagnostics.iterations_run,
            final_max_delta = diagnostics.final_max_delta,
            epsilon = config.epsilon,
            "em did not converge within the iteration cap; returning last iterate"
        );
    }

    let fitted = FittedNetwork::new(structure.clone(), cpts)?;
    Ok((fitted, diagnostics))
}

fn empty_counts(structure: &NetworkStructure, cpts: &[Cpt]) -> Vec<Vec<f64>> {
    structure
        .var_ids()
        .map(|v| vec![0.0; cpts[v.index()].values().len()])
        .collect()
}

/// E-step: expected family counts over all rows.
///
/// Fully observed rows contribute hard indicator counts; partially observed
/// rows contribute their completion posteriors as fractional counts. Returns
/// the per-variable count vectors and the number of zero-mass rows.
fn expected_counts(
    structure: &NetworkStructure,
    cpts: &[Cpt],
    data: &EncodedTable,
) -> (Vec<Vec<f64>>, usize) {
    #[cfg(feature = "parallel")]
    {
        (0..data.n_rows())
            .into_par_iter()
            .fold(
                || (empty_counts(structure, cpts), 0usize),
                |(mut counts, mut zero_mass), row| {
                    if !row_counts_into(structure, cpts, data.row(row), &mut counts) {
                        zero_mass += 1;
                    }
                    (counts, zero_mass)
                },
            )
            .reduce(
                || (empty_counts(structure, cpts), 0usize),
                |(mut left, lz), (right, rz)| {
                    for (l, r) in left.iter_mut().zip(&right) {
                        for (a, b) in l.iter_mut().zip(r) {
                            *a += b;
                        }
                    }
                    (left, lz + rz)
                },
            )
    }
    #[cfg(not(feature = "parallel"))]
    {
        let mut counts = empty_counts(structure, cpts);
        let mut zero_mass = 0usize;
        for row in 0..data.n_rows() {
            if !row_counts_into(structure, cpts, data.row(row), &mut counts) {
                zero_mass += 1;
            }
        }
        (counts, zero_mass)
    }
}

/// Adds one row's expected counts. Returns false when the row has missing
/// values and zero completion mass.
fn row_counts_into(
    structure: &NetworkStructure,
    cpts: &[Cpt],
    row: &[Option<usize>],
    counts: &mut [Vec<f64>],
) -> bool {
    let mut parent_codes: SmallVec<[usize; 4]> = SmallVec::new();

    if row.iter().all(Option::is_some) {
        let codes: SmallVec<[usize; 16]> = row.iter().flatten().copied().collect();
        add_assignment(structure, cpts, &codes, 1.0, counts, &mut parent_codes);
        return true;
    }

    // Two passes: total completion mass first, then fractional counts.
    let total = for_each_completion(structure, cpts, row, |_, _| {});
    if total <= 0.0 {
        return false;
    }
    for_each_completion(structure, cpts, row, |codes, weight| {
        if weight > 0.0 {
            add_assignment(
                structure,
                cpts,
                codes,
                weight / total,
                counts,
                &mut parent_codes,
            );
        }
    });
    true
}

#[inline]
fn add_assignment(
    structure: &NetworkStructure,
    cpts: &[Cpt],
    codes: &[usize],
    weight: f64,
    counts: &mut [Vec<f64>],
    parent_codes: &mut SmallVec<[usize; 4]>,
) {
    for var in structure.var_ids() {
        parent_codes.clear();
        parent_codes.extend(structure.parents(var).iter().map(|p| codes[p.index()]));
        let cpt = &cpts[var.index()];
        let config = cpt.config_index(parent_codes);
        counts[var.index()][config * cpt.cardinality() + codes[var.index()]] += weight;
    }
}
