//! Conditional probability tables and fitted networks.
//!
//! A [`Cpt`] stores `P(variable = value | parent configuration)` as a flat
//! vector: `values[config * cardinality + value]`, where `config` is the
//! mixed-radix index over the variable's parents in the frozen structure
//! ordering (first parent most significant). For every configuration the
//! column over values sums to 1.

use smallvec::SmallVec;

use crate::engine::errors::EcoNetError;
use crate::engine::structure::{NetworkStructure, VarId};

/// Tolerance for the column-normalization invariant.
pub const NORMALIZATION_EPSILON: f64 = 1e-9;

/// Conditional probability table of one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Cpt {
    var: VarId,
    cardinality: usize,
    parent_cardinalities: SmallVec<[usize; 4]>,
    values: Vec<f64>,
}

impl Cpt {
    /// Builds a uniform CPT shaped for `var` under `structure`.
    pub fn uniform(structure: &NetworkStructure, var: VarId) -> Self {
        let cardinality = structure.cardinality(var);
        let parent_cardinalities: SmallVec<[usize; 4]> = structure
            .parents(var)
            .iter()
            .map(|&p| structure.cardinality(p))
            .collect();
        let configs: usize = parent_cardinalities.iter().product();
        Self {
            var,
            cardinality,
            parent_cardinalities,
            values: vec![1.0 / cardinality as f64; configs * cardinality],
        }
    }

    /// Variable this table belongs to.
    pub fn var(&self) -> VarId {
        self.var
    }

    /// Cardinality of the owning variable.
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Number of parent configurations (1 for a root variable).
    pub fn num_configs(&self) -> usize {
        self.values.len() / self.cardinality
    }

    /// Flat probability values, column-major over configurations.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mixed-radix configuration index for the given parent value codes.
    ///
    /// `parent_codes` must follow the structure's parent ordering; the first
    /// parent is the most significant digit.
    #[inline]
    pub fn config_index(&self, parent_codes: &[usize]) -> usize {
        debug_assert_eq!(parent_codes.len(), self.parent_cardinalities.len());
        let mut config = 0usize;
        for (&code, &card) in parent_codes.iter().zip(&self.parent_cardinalities) {
            debug_assert!(code < card);
            config = config * card + code;
        }
        config
    }

    /// Probability column for one parent configuration.
    #[inline]
    pub fn column(&self, config: usize) -> &[f64] {
        let start = config * self.cardinality;
        &self.values[start..start + self.cardinality]
    }

    #[inline]
    pub(crate) fn column_mut(&mut self, config: usize) -> &mut [f64] {
        let start = config * self.cardinality;
        &mut self.values[start..start + self.cardinality]
    }

    /// `P(var = value | parents = parent_codes)`.
    #[inline]
    pub fn probability(&self, value: usize, parent_codes: &[usize]) -> f64 {
        self.column(self.config_index(parent_codes))[value]
    }

    /// Maximum absolute entry difference against another table of the same
    /// shape. Used for EM convergence checks.
    pub fn max_abs_diff(&self, other: &Cpt) -> f64 {
        debug_assert_eq!(self.values.len(), other.values.len());
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// Verifies every column sums to 1 within [`NORMALIZATION_EPSILON`] and
    /// every entry lies in `[0, 1]`.
    pub fn check_normalized(&self, structure: &NetworkStructure) -> Result<(), EcoNetError> {
        let name = &structure.variable(self.var).name;
        for config in 0..self.num_configs() {
            let column = self.column(config);
            let sum: f64 = column.iter().sum();
            if (sum - 1.0).abs() > NORMALIZATION_EPSILON {
                return Err(EcoNetError::Normalization(format!(
                    "CPT column for '{name}' config {config} sums to {sum}"
                )));
            }
            if let Some(bad) = column.iter().find(|p| !(0.0..=1.0).contains(*p)) {
                return Err(EcoNetError::Normalization(format!(
                    "CPT entry {bad} for '{name}' config {config} outside [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// An immutable structure plus one normalized CPT per variable.
///
/// Produced once by the learning pipeline; consumed read-only by the
/// posterior predictor.
#[derive(Debug, Clone)]
pub struct FittedNetwork {
    structure: NetworkStructure,
    cpts: Vec<Cpt>,
}

impl FittedNetwork {
    /// Assembles a fitted network, verifying one table per variable and the
    /// normalization invariant on each.
    pub fn new(structure: NetworkStructure, cpts: Vec<Cpt>) -> Result<Self, EcoNetError> {
        if cpts.len() != structure.len() {
            return Err(EcoNetError::Internal(format!(
                "expected {} CPTs, got {}",
                structure.len(),
                cpts.len()
            )));
        }
        for (i, cpt) in cpts.iter().enumerate() {
            if cpt.var().index() != i {
                return Err(EcoNetError::Internal(
                    "CPTs must be ordered by variable id".into(),
                ));
            }
            cpt.check_normalized(&structure)?;
        }
        Ok(Self { structure, cpts })
    }

    pub fn structure(&self) -> &NetworkStructure {
        &self.structure
    }

    pub fn cpt(&self, var: VarId) -> &Cpt {
        &self.cpts[var.index()]
    }

    pub fn cpts(&self) -> &[Cpt] {
        &self.cpts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::domain::CategoricalDomain;
    use crate::engine::structure::NetworkBuilder;

    fn two_parent_structure() -> NetworkStructure {
        let mut builder = NetworkBuilder::new();
        builder
            .add_variable("p1", CategoricalDomain::from_labels(["0", "1"]).unwrap())
            .unwrap();
        builder
            .add_variable(
                "p2",
                CategoricalDomain::from_labels(["0", "1", "2"]).unwrap(),
            )
            .unwrap();
        builder
            .add_variable("c", CategoricalDomain::from_labels(["0", "1"]).unwrap())
            .unwrap();
        builder.add_arc("p1", "c").unwrap();
        builder.add_arc("p2", "c").unwrap();
        builder.build()
    }

    #[test]
    fn uniform_cpt_has_expected_shape_and_is_normalized() {
        let structure = two_parent_structure();
        let c = structure.var_by_name("c").unwrap();
        let cpt = Cpt::uniform(&structure, c);
        assert_eq!(cpt.cardinality(), 2);
        assert_eq!(cpt.num_configs(), 6);
        cpt.check_normalized(&structure).unwrap();
    }

    #[test]
    fn config_index_is_mixed_radix_first_parent_most_significant() {
        let structure = two_parent_structure();
        let c = structure.var_by_name("c").unwrap();
        let cpt = Cpt::uniform(&structure, c);
        // p1 in {0,1} (most significant), p2 in {0,1,2}.
        assert_eq!(cpt.config_index(&[0, 0]), 0);
        assert_eq!(cpt.config_index(&[0, 2]), 2);
        assert_eq!(cpt.config_index(&[1, 0]), 3);
        assert_eq!(cpt.config_index(&[1, 2]), 5);
    }

    #[test]
    fn check_normalized_catches_bad_column() {
        let structure = two_parent_structure();
        let c = structure.var_by_name("c").unwrap();
        let mut cpt = Cpt::uniform(&structure, c);
        cpt.column_mut(3)[0] = 0.9;
        assert!(cpt.check_normalized(&structure).is_err());
    }

    #[test]
    fn fitted_network_rejects_missing_tables() {
        let structure = two_parent_structure();
        let c = structure.var_by_name("c").unwrap();
        let cpts = vec![Cpt::uniform(&structure, c)];
        assert!(FittedNetwork::new(structure, cpts).is_err());
    }
}
