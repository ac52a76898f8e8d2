//! The learning and inference engine.
//!
//! This module provides:
//! - **errors**: Error types for structure building and learning failures
//! - **domain**: Categorical domains and network variables
//! - **structure**: DAG construction with a build-then-freeze pattern
//! - **cpt**: Conditional probability tables and fitted networks
//! - **table**: Schema-validated data tables and row diagnostics
//! - **estimator**: Frequency-based maximum-likelihood CPT estimation
//! - **inference**: Exact posterior inference over the DAG factorization
//! - **em**: Expectation-maximization refinement of CPTs
//! - **predict**: Per-row class posteriors from a fitted network
//! - **score**: Expected-ordinal-level reduction and batch rescaling
//! - **pipeline**: End-to-end fit and score wiring

pub mod errors;
pub mod domain;
pub mod structure;
pub mod cpt;
pub mod table;
pub mod estimator;
pub mod inference;
pub mod em;
pub mod predict;
pub mod score;
pub mod pipeline;
