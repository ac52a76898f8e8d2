//! End-to-end index pipeline.
//!
//! Wires the learning and scoring stages together the way the batch job
//! runs them: build the structure from a table's observed domains plus an
//! external arc list, fit (frequency estimate seeding EM) on the rows whose
//! target label is observed, then predict and score over the full table,
//! returning one optional scalar per input row.

use crate::engine::cpt::FittedNetwork;
use crate::engine::domain::CategoricalDomain;
use crate::engine::em::{refine, EmConfig, EmDiagnostics};
use crate::engine::errors::EcoNetError;
use crate::engine::estimator::{estimate_all, EstimationDiagnostics};
use crate::engine::predict::predict;
use crate::engine::score::score;
use crate::engine::structure::{NetworkBuilder, NetworkStructure, VarId};
use crate::engine::table::{DataTable, EncodedTable, RowIssue};

/// Diagnostics from the learning half of the pipeline.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitDiagnostics {
    /// Rows with an observed target label, used for training.
    pub training_rows: usize,
    pub estimation: EstimationDiagnostics,
    pub em: EmDiagnostics,
    /// Encoding issues over the training table.
    pub encoding_issues: Vec<RowIssue>,
}

/// Scored batch: one optional index value per input row plus per-row
/// diagnostics from prediction.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoredIndex {
    pub index: Vec<Option<f64>>,
    pub issues: Vec<RowIssue>,
}

/// Builds a network structure from a table's observed column domains and an
/// external arc list.
///
/// Each variable's domain is the distinct labels observed in its column
/// (numeric-aware ordering); arcs come from an adjacency specification and
/// are validated against the variables as they are added.
pub fn build_structure(
    table: &DataTable,
    variables: &[String],
    arcs: &[(String, String)],
) -> Result<NetworkStructure, EcoNetError> {
    let mut builder = NetworkBuilder::new();
    for name in variables {
        let column = table.column_index(name).ok_or_else(|| {
            EcoNetError::Schema(format!("table has no column for variable '{name}'"))
        })?;
        let domain = CategoricalDomain::from_observed(table.observed_labels(column))
            .map_err(|_| {
                EcoNetError::Schema(format!("column '{name}' has no observed labels"))
            })?;
        builder.add_variable(name.clone(), domain)?;
    }
    for (parent, child) in arcs {
        builder.add_arc(parent, child)?;
    }
    Ok(builder.build())
}

/// Fits the network on the rows of `table` whose target label is observed.
///
/// The frequency estimate seeds EM, so a fully observed training subset
/// converges in one iteration.
pub fn fit(
    structure: &NetworkStructure,
    table: &DataTable,
    target: VarId,
    em: EmConfig,
) -> Result<(FittedNetwork, FitDiagnostics), EcoNetError> {
    let (encoded, encoding_issues) = EncodedTable::encode(structure, table)?;
    let training = encoded.filter_rows(|row| encoded.row(row)[target.index()].is_some());
    if training.n_rows() == 0 {
        return Err(EcoNetError::Schema(format!(
            "no training rows observe the target '{}'",
            structure.variable(target).name
        )));
    }

    let (initial, estimation) = estimate_all(structure, &training);
    let (fitted, em_diagnostics) = refine(structure, initial, &training, em)?;
    Ok((
        fitted,
        FitDiagnostics {
            training_rows: training.n_rows(),
            estimation,
            em: em_diagnostics,
            encoding_issues,
        },
    ))
}

/// Predicts target posteriors over `table` and reduces them to the scalar
/// index with the given ordinal class levels.
pub fn score_index(
    fitted: &FittedNetwork,
    target: VarId,
    table: &DataTable,
    class_levels: &[f64],
) -> Result<ScoredIndex, EcoNetError> {
    let outcome = predict(fitted, target, table)?;
    let index = score(&outcome.posteriors, class_levels)?;
    Ok(ScoredIndex {
        index,
        issues: outcome.issues,
    })
}

/// Full pipeline over one table: fit on observed-target rows, score every
/// row.
pub fn run_index_pipeline(
    structure: &NetworkStructure,
    table: &DataTable,
    target_name: &str,
    class_levels: &[f64],
    em: EmConfig,
) -> Result<(ScoredIndex, FitDiagnostics), EcoNetError> {
    let target = structure.var_by_name(target_name).ok_or_else(|| {
        EcoNetError::Schema(format!("unknown target variable '{target_name}'"))
    })?;
    let (fitted, fit_diagnostics) = fit(structure, table, target, em)?;
    let scored = score_index(&fitted, target, table, class_levels)?;
    Ok((scored, fit_diagnostics))
}
