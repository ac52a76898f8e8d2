//! # EcoNet I/O
//!
//! Tabular collaborators around the learning core:
//!
//! - **csv_table**: CSV ingestion into [`DataTable`] with missing-value
//!   sentinel handling, plus scalar-index CSV export
//! - **adjacency**: adjacency-matrix CSV parsing into an arc list
//! - **discretize**: equal-width discretization of numeric columns
//! - **grid**: ESRI ASCII grid export of the scalar index
//!
//! [`DataTable`]: econet_core::DataTable

#![forbid(unsafe_code)]

pub mod adjacency;
pub mod csv_table;
pub mod discretize;
pub mod grid;

use thiserror::Error;

/// Errors from the I/O layer.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum IoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A cell or header could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// A table/grid shape mismatch.
    #[error("shape error: {0}")]
    Shape(String),

    /// Error propagated from the core table layer.
    #[error(transparent)]
    Core(#[from] econet_core::EcoNetError),
}
