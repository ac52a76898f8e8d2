//! Categorical domains and network variables.
//!
//! A [`CategoricalDomain`] is the finite, ordered label set of one discrete
//! variable. Domains are immutable once built; every later component (CPT
//! shapes, row encoding, posterior ordering, trailing-k category selection
//! in the scorer) relies on the ordering fixed here.

use rustc_hash::FxHashMap;

use crate::engine::errors::EcoNetError;

/// Finite ordered label set of a discrete variable.
///
/// Labels are unique; cardinality is at least 1. A reverse index gives O(1)
/// label-to-code lookup during row encoding.
#[derive(Debug, Clone)]
pub struct CategoricalDomain {
    labels: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl CategoricalDomain {
    /// Builds a domain from an explicit ordered label list.
    ///
    /// Fails if the list is empty or contains duplicates.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, EcoNetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(EcoNetError::Structure(
                "categorical domain must have at least one label".into(),
            ));
        }
        let mut index = FxHashMap::default();
        for (code, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), code).is_some() {
                return Err(EcoNetError::Structure(format!(
                    "duplicate label '{label}' in categorical domain"
                )));
            }
        }
        Ok(Self { labels, index })
    }

    /// Builds a domain from the distinct labels observed in a column.
    ///
    /// When every observed label parses as a finite `f64` the labels are
    /// sorted numerically ascending; otherwise first-appearance order is
    /// kept. Missing cells must be filtered out by the caller before this
    /// point.
    pub fn from_observed<'a, I>(observed: I) -> Result<Self, EcoNetError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = FxHashMap::default();
        let mut labels: Vec<String> = Vec::new();
        for label in observed {
            if !seen.contains_key(label) {
                seen.insert(label.to_string(), labels.len());
                labels.push(label.to_string());
            }
        }
        if labels.is_empty() {
            return Err(EcoNetError::Structure(
                "no observed labels to build a categorical domain from".into(),
            ));
        }

        let numeric: Option<Vec<f64>> = labels
            .iter()
            .map(|l| l.parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect();
        if let Some(values) = numeric {
            let mut paired: Vec<(f64, String)> =
                values.into_iter().zip(labels.iter().cloned()).collect();
            paired.sort_by(|a, b| a.0.total_cmp(&b.0));
            labels = paired.into_iter().map(|(_, l)| l).collect();
        }

        Self::from_labels(labels)
    }

    /// Number of categories in the domain.
    pub fn cardinality(&self) -> usize {
        self.labels.len()
    }

    /// Ordered labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label at `code`, if in range.
    pub fn label(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    /// Code of `label`, if the label belongs to the domain.
    pub fn code_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }
}

/// A named network variable bound to its categorical domain.
///
/// Created when a node is added to a [`NetworkBuilder`]; never mutated
/// afterwards.
///
/// [`NetworkBuilder`]: crate::engine::structure::NetworkBuilder
#[derive(Debug, Clone)]
pub struct Variable {
    /// Name, unique within a network.
    pub name: String,
    /// Ordered category labels.
    pub domain: CategoricalDomain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_labels_rejects_duplicates() {
        let result = CategoricalDomain::from_labels(["a", "b", "a"]);
        assert!(result.is_err());
    }

    #[test]
    fn from_labels_rejects_empty() {
        let result = CategoricalDomain::from_labels(Vec::<String>::new());
        assert!(result.is_err());
    }

    #[test]
    fn from_observed_sorts_numeric_labels_ascending() {
        let domain = CategoricalDomain::from_observed(["3.0", "1.0", "2.0", "1.0"]).unwrap();
        assert_eq!(domain.labels(), &["1.0", "2.0", "3.0"]);
        assert_eq!(domain.cardinality(), 3);
    }

    #[test]
    fn from_observed_keeps_appearance_order_for_text_labels() {
        let domain = CategoricalDomain::from_observed(["forest", "water", "farming"]).unwrap();
        assert_eq!(domain.labels(), &["forest", "water", "farming"]);
    }

    #[test]
    fn code_lookup_round_trips() {
        let domain = CategoricalDomain::from_observed(["low", "mid", "high"]).unwrap();
        assert_eq!(domain.code_of("mid"), Some(1));
        assert_eq!(domain.label(2), Some("high"));
        assert_eq!(domain.code_of("absent"), None);
    }
}
