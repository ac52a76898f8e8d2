//! Per-row class posteriors from a fitted network.
//!
//! For each input row, computes `P(target = c | observed variables)` for
//! every category `c` of the target by exact inference over the DAG
//! factorization. Rows carrying a label outside an evidence variable's
//! domain are skipped (their slot stays empty) and reported per row; the
//! batch never aborts. The target column never acts as evidence, so an
//! unexpected label there is reported but does not suppress the prediction.
//! Output order matches input row order, also on the parallel path.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::engine::cpt::FittedNetwork;
use crate::engine::errors::EcoNetError;
use crate::engine::inference::posterior;
use crate::engine::structure::VarId;
use crate::engine::table::{DataTable, EncodedTable, RowIssue, RowIssueKind};

/// Posterior distribution over the target's categories for one row.
///
/// Probabilities follow the target domain's label ordering and sum to 1.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Posterior {
    pub probabilities: Vec<f64>,
}

impl Posterior {
    /// Expected value under ordinal levels assigned to the trailing
    /// `levels.len()` categories.
    pub fn expected_value(&self, levels: &[f64]) -> f64 {
        let skip = self.probabilities.len().saturating_sub(levels.len());
        self.probabilities[skip..]
            .iter()
            .zip(levels)
            .map(|(p, l)| p * l)
            .sum()
    }
}

/// Batch prediction result: one optional posterior per input row plus the
/// collected per-row diagnostics.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredictionOutcome {
    /// One entry per input row, in input order. `None` marks a skipped row.
    pub posteriors: Vec<Option<Posterior>>,
    pub issues: Vec<RowIssue>,
}

/// Predicts target posteriors for every row of `table`.
///
/// Every network variable needs a matching table column except the target,
/// whose column (if present) is ignored as evidence.
pub fn predict(
    fitted: &FittedNetwork,
    target: VarId,
    table: &DataTable,
) -> Result<PredictionOutcome, EcoNetError> {
    let structure = fitted.structure();
    let target_name = &structure.variable(target).name;
    let (encoded, mut issues) = encode_evidence(fitted, target, table)?;

    // Only evidence columns can invalidate a row; the target column is
    // masked before inference anyway.
    let mut skip = vec![false; encoded.n_rows()];
    for issue in &issues {
        if issue.kind == RowIssueKind::CategoryNotInDomain && issue.variable != *target_name {
            skip[issue.row] = true;
        }
    }

    let row_posterior = |row: usize| -> (Option<Posterior>, Option<RowIssue>) {
        if skip[row] {
            return (None, None);
        }
        let (probabilities, degenerate) =
            posterior(structure, fitted.cpts(), encoded.row(row), target);
        let issue = degenerate.then(|| RowIssue {
            row,
            variable: target_name.clone(),
            label: None,
            kind: RowIssueKind::ZeroProbabilityEvidence,
        });
        (Some(Posterior { probabilities }), issue)
    };

    #[cfg(feature = "parallel")]
    let results: Vec<(Option<Posterior>, Option<RowIssue>)> =
        (0..encoded.n_rows()).into_par_iter().map(row_posterior).collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<(Option<Posterior>, Option<RowIssue>)> =
        (0..encoded.n_rows()).map(row_posterior).collect();

    let mut posteriors = Vec::with_capacity(results.len());
    for (p, issue) in results {
        posteriors.push(p);
        issues.extend(issue);
    }
    Ok(PredictionOutcome { posteriors, issues })
}

/// Encodes `table` for prediction.
///
/// A missing target column is tolerated by encoding against a view of the
/// table that carries an all-missing target column.
fn encode_evidence(
    fitted: &FittedNetwork,
    target: VarId,
    table: &DataTable,
) -> Result<(EncodedTable, Vec<RowIssue>), EcoNetError> {
    let structure = fitted.structure();
    let target_name = &structure.variable(target).name;
    if table.column_index(target_name).is_some() {
        return EncodedTable::encode(structure, table);
    }

    let mut widened = DataTable::new(
        table
            .columns()
            .iter()
            .cloned()
            .chain(std::iter::once(target_name.clone())),
    )?;
    for row in 0..table.n_rows() {
        let mut cells: Vec<Option<String>> = (0..table.columns().len())
            .map(|c| table.cell(row, c).map(str::to_string))
            .collect();
        cells.push(None);
        widened.push_row(cells)?;
    }
    EncodedTable::encode(structure, &widened)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::domain::CategoricalDomain;
    use crate::engine::estimator::estimate_all;
    use crate::engine::structure::NetworkBuilder;
    use crate::engine::table::EncodedTable;

    fn fitted_ab() -> FittedNetwork {
        let mut builder = NetworkBuilder::new();
        builder
            .add_variable("a", CategoricalDomain::from_labels(["0", "1"]).unwrap())
            .unwrap();
        builder
            .add_variable("b", CategoricalDomain::from_labels(["0", "1"]).unwrap())
            .unwrap();
        builder.add_arc("a", "b").unwrap();
        let structure = builder.build();

        let mut table = DataTable::new(["a", "b"]).unwrap();
        let counts = [(("0", "0"), 6), (("0", "1"), 4), (("1", "0"), 2), (("1", "1"), 8)];
        for ((a, b), n) in counts {
            for _ in 0..n {
                table
                    .push_row(vec![Some(a.to_string()), Some(b.to_string())])
                    .unwrap();
            }
        }
        let (data, _) = EncodedTable::encode(&structure, &table).unwrap();
        let (cpts, _) = estimate_all(&structure, &data);
        FittedNetwork::new(structure, cpts).unwrap()
    }

    #[test]
    fn posteriors_follow_the_fitted_conditionals() {
        let fitted = fitted_ab();
        let target = fitted.structure().var_by_name("b").unwrap();

        let mut table = DataTable::new(["a"]).unwrap();
        table.push_row(vec![Some("0".into())]).unwrap();
        table.push_row(vec![Some("1".into())]).unwrap();

        let outcome = predict(&fitted, target, &table).unwrap();
        assert!(outcome.issues.is_empty());
        let p0 = outcome.posteriors[0].as_ref().unwrap();
        let p1 = outcome.posteriors[1].as_ref().unwrap();
        assert!((p0.probabilities[0] - 0.6).abs() < 1e-9);
        assert!((p0.probabilities[1] - 0.4).abs() < 1e-9);
        assert!((p1.probabilities[0] - 0.2).abs() < 1e-9);
        assert!((p1.probabilities[1] - 0.8).abs() < 1e-9);
    }

    #[test]
    fn target_column_in_the_table_is_ignored_as_evidence() {
        let fitted = fitted_ab();
        let target = fitted.structure().var_by_name("b").unwrap();

        let mut table = DataTable::new(["a", "b"]).unwrap();
        table
            .push_row(vec![Some("0".into()), Some("1".into())])
            .unwrap();

        let outcome = predict(&fitted, target, &table).unwrap();
        let p = outcome.posteriors[0].as_ref().unwrap();
        assert!((p.probabilities[0] - 0.6).abs() < 1e-9);
    }

    #[test]
    fn out_of_domain_row_is_skipped_not_fatal() {
        let fitted = fitted_ab();
        let target = fitted.structure().var_by_name("b").unwrap();

        let mut table = DataTable::new(["a"]).unwrap();
        table.push_row(vec![Some("7".into())]).unwrap();
        table.push_row(vec![Some("1".into())]).unwrap();

        let outcome = predict(&fitted, target, &table).unwrap();
        assert!(outcome.posteriors[0].is_none());
        assert!(outcome.posteriors[1].is_some());
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].row, 0);
        assert_eq!(outcome.issues[0].kind, RowIssueKind::CategoryNotInDomain);
    }

    #[test]
    fn unexpected_target_label_does_not_suppress_the_prediction() {
        let fitted = fitted_ab();
        let target = fitted.structure().var_by_name("b").unwrap();

        // Valid evidence, target cell outside the domain: the target never
        // acts as evidence, so the row is still scored.
        let mut table = DataTable::new(["a", "b"]).unwrap();
        table
            .push_row(vec![Some("1".into()), Some("7".into())])
            .unwrap();

        let outcome = predict(&fitted, target, &table).unwrap();
        let p = outcome.posteriors[0].as_ref().unwrap();
        assert!((p.probabilities[0] - 0.2).abs() < 1e-9);
        assert!((p.probabilities[1] - 0.8).abs() < 1e-9);
        // The bad label is still reported.
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].variable, "b");
        assert_eq!(outcome.issues[0].kind, RowIssueKind::CategoryNotInDomain);
    }

    #[test]
    fn each_posterior_sums_to_one() {
        let fitted = fitted_ab();
        let target = fitted.structure().var_by_name("b").unwrap();

        let mut table = DataTable::new(["a"]).unwrap();
        for label in ["0", "1"] {
            table.push_row(vec![Some(label.into())]).unwrap();
        }
        // A row with no evidence at all: the posterior is the marginal.
        table.push_row(vec![None]).unwrap();

        let outcome = predict(&fitted, target, &table).unwrap();
        for posterior in outcome.posteriors.iter().flatten() {
            let sum: f64 = posterior.probabilities.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn expected_value_weights_levels_by_probability() {
        let posterior = Posterior {
            probabilities: vec![0.2, 0.3, 0.5],
        };
        let value = posterior.expected_value(&[1.0, 2.0, 3.0]);
        assert!((value - 2.3).abs() < 1e-12);
        // Fewer levels than categories: levels bind to the trailing ones.
        let trailing = posterior.expected_value(&[1.0, 2.0]);
        assert!((trailing - (0.3 + 1.0)).abs() < 1e-12);
    }
}
