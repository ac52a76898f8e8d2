//! Exact inference over the DAG factorization.
//!
//! The joint probability of a full assignment is the product of every
//! variable's CPT entry given its parents. Posteriors are obtained by
//! enumerating the completions of a partially observed row (all assignments
//! to its missing variables), accumulating completion weights, and
//! normalizing. Enumeration is exponential only in the number of *missing*
//! variables per row, which in this workload is typically one (the evidence
//! label).

use smallvec::SmallVec;

use crate::engine::cpt::Cpt;
use crate::engine::structure::{NetworkStructure, VarId};
use crate::engine::table::EncodedTable;

/// Joint probability of a fully assigned row under the factorization.
pub fn joint_weight(structure: &NetworkStructure, cpts: &[Cpt], codes: &[usize]) -> f64 {
    let mut parent_codes: SmallVec<[usize; 4]> = SmallVec::new();
    let mut weight = 1.0;
    for var in structure.var_ids() {
        parent_codes.clear();
        parent_codes.extend(structure.parents(var).iter().map(|p| codes[p.index()]));
        weight *= cpts[var.index()].probability(codes[var.index()], &parent_codes);
        if weight == 0.0 {
            return 0.0;
        }
    }
    weight
}

/// Enumerates every completion of a partially observed row.
///
/// `visit` receives the full assignment and its joint weight. Returns the
/// total weight over all completions.
pub fn for_each_completion(
    structure: &NetworkStructure,
    cpts: &[Cpt],
    row: &[Option<usize>],
    mut visit: impl FnMut(&[usize], f64),
) -> f64 {
    let missing: SmallVec<[VarId; 4]> = structure
        .var_ids()
        .filter(|v| row[v.index()].is_none())
        .collect();
    let mut codes: Vec<usize> = row.iter().map(|c| c.unwrap_or(0)).collect();

    if missing.is_empty() {
        let weight = joint_weight(structure, cpts, &codes);
        visit(&codes, weight);
        return weight;
    }

    let radix: SmallVec<[usize; 4]> = missing
        .iter()
        .map(|&v| structure.cardinality(v))
        .collect();
    let mut digits: SmallVec<[usize; 4]> = SmallVec::from_elem(0, missing.len());
    let mut total = 0.0;
    loop {
        for (&var, &digit) in missing.iter().zip(&digits) {
            codes[var.index()] = digit;
        }
        let weight = joint_weight(structure, cpts, &codes);
        total += weight;
        visit(&codes, weight);

        // Advance the mixed-radix counter, last missing variable fastest.
        let mut pos = digits.len();
        loop {
            if pos == 0 {
                return total;
            }
            pos -= 1;
            digits[pos] += 1;
            if digits[pos] < radix[pos] {
                break;
            }
            digits[pos] = 0;
        }
    }
}

/// Posterior over `target` given the row's observed codes.
///
/// The target's own code in `row` is ignored; only the other observed
/// variables act as evidence. Returns the normalized distribution and a flag
/// that is true when every completion had zero weight (the distribution then
/// falls back to uniform).
pub fn posterior(
    structure: &NetworkStructure,
    cpts: &[Cpt],
    row: &[Option<usize>],
    target: VarId,
) -> (Vec<f64>, bool) {
    let mut masked: SmallVec<[Option<usize>; 16]> = SmallVec::from_slice(row);
    masked[target.index()] = None;

    let cardinality = structure.cardinality(target);
    let mut accumulated = vec![0.0; cardinality];
    let total = for_each_completion(structure, cpts, &masked, |codes, weight| {
        accumulated[codes[target.index()]] += weight;
    });

    if total > 0.0 {
        for p in &mut accumulated {
            *p /= total;
        }
        (accumulated, false)
    } else {
        (vec![1.0 / cardinality as f64; cardinality], true)
    }
}

/// Observed-data log-likelihood of the whole table.
///
/// Each row contributes the log of its total completion weight. Rows whose
/// completion mass is zero are skipped so the trace stays finite.
pub fn log_likelihood(structure: &NetworkStructure, cpts: &[Cpt], data: &EncodedTable) -> f64 {
    let mut ll = 0.0;
    for row in 0..data.n_rows() {
        let total = for_each_completion(structure, cpts, data.row(row), |_, _| {});
        if total > 0.0 {
            ll += total.ln();
        }
    }
    ll
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::domain::CategoricalDomain;
    use crate::engine::estimator::estimate_all;
    use crate::engine::structure::NetworkBuilder;
    use crate::engine::table::DataTable;

    fn ab_fixture() -> (NetworkStructure, Vec<Cpt>) {
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
        let (data, _) = crate::engine::table::EncodedTable::encode(&structure, &table).unwrap();
        let (cpts, _) = estimate_all(&structure, &data);
        (structure, cpts)
    }

    #[test]
    fn joint_weight_is_the_cpt_product() {
        let (structure, cpts) = ab_fixture();
        // P(a=0) = 0.5, P(b=1 | a=0) = 0.4.
        let weight = joint_weight(&structure, &cpts, &[0, 1]);
        assert!((weight - 0.2).abs() < 1e-12);
    }

    #[test]
    fn completions_of_a_full_row_are_the_row_itself() {
        let (structure, cpts) = ab_fixture();
        let mut visits = 0;
        let total = for_each_completion(&structure, &cpts, &[Some(1), Some(1)], |_, _| {
            visits += 1;
        });
        assert_eq!(visits, 1);
        assert!((total - 0.4).abs() < 1e-12);
    }

    #[test]
    fn completion_total_marginalizes_missing_variables() {
        let (structure, cpts) = ab_fixture();
        // Sum over b of P(a=0, b) = P(a=0) = 0.5.
        let total = for_each_completion(&structure, &cpts, &[Some(0), None], |_, _| {});
        assert!((total - 0.5).abs() < 1e-12);
    }

    #[test]
    fn posterior_conditions_on_observed_evidence() {
        let (structure, cpts) = ab_fixture();
        let b = structure.var_by_name("b").unwrap();
        let (dist, degenerate) = posterior(&structure, &cpts, &[Some(1), None], b);
        assert!(!degenerate);
        assert!((dist[0] - 0.2).abs() < 1e-12);
        assert!((dist[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn posterior_sums_to_one() {
        let (structure, cpts) = ab_fixture();
        let a = structure.var_by_name("a").unwrap();
        let (dist, _) = posterior(&structure, &cpts, &[None, Some(0)], a);
        let sum: f64 = dist.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_mass_evidence_falls_back_to_uniform() {
        let (structure, mut cpts) = ab_fixture();
        // Make b = 0 impossible under every parent configuration.
        let b = structure.var_by_name("b").unwrap();
        let mut impossible = Cpt::uniform(&structure, b);
        for config in 0..impossible.num_configs() {
            let column = impossible.column_mut(config);
            column[0] = 0.0;
            column[1] = 1.0;
        }
        cpts[b.index()] = impossible;

        let a = structure.var_by_name("a").unwrap();
        let (dist, degenerate) = posterior(&structure, &cpts, &[None, Some(0)], a);
        assert!(degenerate);
        assert!((dist[0] - 0.5).abs() < 1e-12);
    }
}
