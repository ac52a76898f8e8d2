//! # EcoNet Core
//!
//! Discrete Bayesian network learning and posterior-based index scoring.
//!
//! The crate computes a probabilistic ecological-integrity index from
//! heterogeneous discrete covariates: a DAG over categorical variables is
//! supplied externally, conditional probability tables are learned by
//! frequency counting and refined with expectation-maximization, and new
//! observations are scored by reducing their class posteriors to a scalar
//! in `[0, 1]`.
//!
//! ## Pipeline
//!
//! ```rust
//! use econet_core::engine::em::EmConfig;
//! use econet_core::engine::pipeline::{build_structure, run_index_pipeline};
//! use econet_core::engine::table::DataTable;
//!
//! let mut table = DataTable::new(["cover", "condition"]).unwrap();
//! for (cover, condition) in [
//!     ("1.0", Some("1.0")),
//!     ("1.0", Some("2.0")),
//!     ("2.0", Some("2.0")),
//!     ("2.0", Some("3.0")),
//!     ("2.0", None),
//! ] {
//!     table
//!         .push_row(vec![Some(cover.to_string()), condition.map(String::from)])
//!         .unwrap();
//! }
//!
//! let structure = build_structure(
//!     &table,
//!     &["cover".into(), "condition".into()],
//!     &[("cover".into(), "condition".into())],
//! )
//! .unwrap();
//!
//! let (scored, diagnostics) = run_index_pipeline(
//!     &structure,
//!     &table,
//!     "condition",
//!     &[1.0, 2.0, 3.0],
//!     EmConfig::default(),
//! )
//! .unwrap();
//! assert_eq!(scored.index.len(), 5);
//! assert!(diagnostics.em.converged);
//! ```

#![forbid(unsafe_code)]

pub mod engine;

// Re-export commonly used types
pub use engine::cpt::{Cpt, FittedNetwork};
pub use engine::domain::CategoricalDomain;
pub use engine::em::{EmConfig, EmDiagnostics};
pub use engine::errors::EcoNetError;
pub use engine::predict::{Posterior, PredictionOutcome};
pub use engine::structure::{NetworkBuilder, NetworkStructure, VarId};
pub use engine::table::{DataTable, RowIssue, RowIssueKind};
