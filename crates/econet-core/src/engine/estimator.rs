//! Maximum-likelihood CPT estimation by conditional frequency counting.
//!
//! For each variable, rows observing the variable and all of its parents
//! contribute one count to the (value, parent-configuration) contingency
//! table; each configuration's column is then normalized by its total. The
//! exclusion of partially observed rows is decided per variable, so a row
//! missing one column still counts for every family it fully observes.
//!
//! A parent configuration with no supporting rows keeps a uniform column
//! (soft condition, logged at warn level) so the table stays valid for
//! inference.

use smallvec::SmallVec;

use crate::engine::cpt::Cpt;
use crate::engine::structure::{NetworkStructure, VarId};
use crate::engine::table::EncodedTable;

/// Soft-condition counters from one estimation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EstimationDiagnostics {
    /// Parent configurations that had zero supporting rows and were filled
    /// uniformly.
    pub uniform_filled_columns: usize,
}

/// Normalizes a flat count vector into a CPT for `var`.
///
/// Zero-total configurations keep the uniform column. Returns the table and
/// the number of uniform-filled configurations.
pub(crate) fn cpt_from_counts(
    structure: &NetworkStructure,
    var: VarId,
    counts: &[f64],
) -> (Cpt, usize) {
    let mut cpt = Cpt::uniform(structure, var);
    debug_assert_eq!(counts.len(), cpt.values().len());
    let cardinality = cpt.cardinality();
    let mut uniform_filled = 0usize;
    for config in 0..cpt.num_configs() {
        let column = &counts[config * cardinality..(config + 1) * cardinality];
        let total: f64 = column.iter().sum();
        if total > 0.0 {
            let out = cpt.column_mut(config);
            for (slot, &count) in out.iter_mut().zip(column) {
                *slot = count / total;
            }
        } else {
            uniform_filled += 1;
        }
    }
    (cpt, uniform_filled)
}

/// Accumulates hard frequency counts for `var` over the fully observed
/// families of `data`.
fn count_family(structure: &NetworkStructure, data: &EncodedTable, var: VarId) -> Vec<f64> {
    let parents = structure.parents(var);
    let shape = Cpt::uniform(structure, var);
    let mut counts = vec![0.0; shape.values().len()];
    let mut parent_codes: SmallVec<[usize; 4]> = SmallVec::with_capacity(parents.len());
    for row in 0..data.n_rows() {
        if !data.observes_family(row, var, parents) {
            continue;
        }
        let codes = data.row(row);
        let Some(value) = codes[var.index()] else {
            continue;
        };
        parent_codes.clear();
        parent_codes.extend(parents.iter().filter_map(|p| codes[p.index()]));
        let config = shape.config_index(&parent_codes);
        counts[config * shape.cardinality() + value] += 1.0;
    }
    counts
}

/// Estimates the CPT of one variable from fully observed families.
///
/// Deterministic given the dataset; no smoothing.
pub fn estimate_cpt(
    structure: &NetworkStructure,
    data: &EncodedTable,
    var: VarId,
) -> (Cpt, EstimationDiagnostics) {
    let counts = count_family(structure, data, var);
    let (cpt, uniform_filled) = cpt_from_counts(structure, var, &counts);
    if uniform_filled > 0 {
        tracing::warn!(
            variable = %structure.variable(var).name,
            configs = uniform_filled,
            "no supporting rows for parent configuration(s); filled uniformly"
        );
    }
    (
        cpt,
        EstimationDiagnostics {
            uniform_filled_columns: uniform_filled,
        },
    )
}

/// Estimates the CPT of every variable in the network.
///
/// Tables are returned ordered by variable id.
pub fn estimate_all(
    structure: &NetworkStructure,
    data: &EncodedTable,
) -> (Vec<Cpt>, EstimationDiagnostics) {
    let mut cpts = Vec::with_capacity(structure.len());
    let mut diagnostics = EstimationDiagnostics::default();
    for var in structure.var_ids() {
        let (cpt, d) = estimate_cpt(structure, data, var);
        diagnostics.uniform_filled_columns += d.uniform_filled_columns;
        cpts.push(cpt);
    }
    (cpts, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cpt::NORMALIZATION_EPSILON;
    use crate::engine::domain::CategoricalDomain;
    use crate::engine::structure::NetworkBuilder;
    use crate::engine::table::DataTable;

    fn ab_structure() -> NetworkStructure {
        let mut builder = NetworkBuilder::new();
        builder
            .add_variable("a", CategoricalDomain::from_labels(["0", "1"]).unwrap())
            .unwrap();
        builder
            .add_variable("b", CategoricalDomain::from_labels(["0", "1"]).unwrap())
            .unwrap();
        builder.add_arc("a", "b").unwrap();
        builder.build()
    }

    fn encoded(structure: &NetworkStructure, rows: &[(Option<&str>, Option<&str>)]) -> EncodedTable {
        let mut table = DataTable::new(["a", "b"]).unwrap();
        for (a, b) in rows {
            table
                .push_row(vec![
                    a.map(str::to_string),
                    b.map(str::to_string),
                ])
                .unwrap();
        }
        EncodedTable::encode(structure, &table).unwrap().0
    }

    fn repeat(pattern: (&'static str, &'static str), n: usize) -> Vec<(Option<&'static str>, Option<&'static str>)> {
        std::iter::repeat((Some(pattern.0), Some(pattern.1)))
            .take(n)
            .collect()
    }

    #[test]
    fn conditional_frequencies_match_hand_computed_values() {
        let structure = ab_structure();
        let mut rows = repeat(("0", "0"), 6);
        rows.extend(repeat(("0", "1"), 4));
        rows.extend(repeat(("1", "0"), 2));
        rows.extend(repeat(("1", "1"), 8));
        let data = encoded(&structure, &rows);

        let b = structure.var_by_name("b").unwrap();
        let (cpt, diagnostics) = estimate_cpt(&structure, &data, b);
        assert_eq!(diagnostics.uniform_filled_columns, 0);
        assert!((cpt.probability(0, &[0]) - 0.6).abs() < 1e-12);
        assert!((cpt.probability(1, &[0]) - 0.4).abs() < 1e-12);
        assert!((cpt.probability(0, &[1]) - 0.2).abs() < 1e-12);
        assert!((cpt.probability(1, &[1]) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn root_variable_gets_marginal_frequencies() {
        let structure = ab_structure();
        let mut rows = repeat(("0", "0"), 3);
        rows.extend(repeat(("1", "0"), 1));
        let data = encoded(&structure, &rows);

        let a = structure.var_by_name("a").unwrap();
        let (cpt, _) = estimate_cpt(&structure, &data, a);
        assert_eq!(cpt.num_configs(), 1);
        assert!((cpt.probability(0, &[]) - 0.75).abs() < 1e-12);
        assert!((cpt.probability(1, &[]) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn rows_missing_a_family_member_are_excluded_per_variable() {
        let structure = ab_structure();
        let rows = vec![
            (Some("0"), Some("0")),
            (Some("0"), None),
            (None, Some("1")),
            (Some("0"), Some("1")),
        ];
        let data = encoded(&structure, &rows);

        let b = structure.var_by_name("b").unwrap();
        let (cpt, _) = estimate_cpt(&structure, &data, b);
        // Only rows 0 and 3 observe both a and b.
        assert!((cpt.probability(0, &[0]) - 0.5).abs() < 1e-12);

        let a = structure.var_by_name("a").unwrap();
        let (cpt_a, _) = estimate_cpt(&structure, &data, a);
        // Rows 0, 1, 3 observe a.
        assert!((cpt_a.probability(0, &[]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unseen_parent_configuration_is_filled_uniformly() {
        let structure = ab_structure();
        let data = encoded(&structure, &repeat(("0", "1"), 5));

        let b = structure.var_by_name("b").unwrap();
        let (cpt, diagnostics) = estimate_cpt(&structure, &data, b);
        assert_eq!(diagnostics.uniform_filled_columns, 1);
        assert!((cpt.probability(0, &[1]) - 0.5).abs() < 1e-12);
        assert!((cpt.probability(1, &[1]) - 0.5).abs() < 1e-12);
        cpt.check_normalized(&structure).unwrap();
    }

    #[test]
    fn estimation_is_deterministic_across_reruns() {
        let structure = ab_structure();
        let mut rows = repeat(("0", "0"), 7);
        rows.extend(repeat(("1", "1"), 3));
        let data = encoded(&structure, &rows);

        let (first, _) = estimate_all(&structure, &data);
        let (second, _) = estimate_all(&structure, &data);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.values(), b.values());
        }
    }

    #[test]
    fn every_estimated_column_is_normalized() {
        let structure = ab_structure();
        let rows = vec![
            (Some("0"), Some("0")),
            (Some("1"), Some("1")),
            (Some("1"), Some("0")),
        ];
        let data = encoded(&structure, &rows);
        let (cpts, _) = estimate_all(&structure, &data);
        for cpt in &cpts {
            cpt.check_normalized(&structure).unwrap();
            for config in 0..cpt.num_configs() {
                let sum: f64 = cpt.column(config).iter().sum();
                assert!((sum - 1.0).abs() < NORMALIZATION_EPSILON);
            }
        }
    }
}
