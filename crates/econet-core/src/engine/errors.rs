//! Error types for network construction, learning, and inference.

use thiserror::Error;

/// Errors that can occur while building a network or running the learning
/// and inference pipeline.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// without breaking changes.
///
/// Per-row data-quality problems (unknown category labels, zero-probability
/// evidence) are *not* errors: they are collected as [`RowIssue`] diagnostics
/// alongside the result so one bad row never aborts a batch.
///
/// [`RowIssue`]: crate::engine::table::RowIssue
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EcoNetError {
    /// Structure construction error.
    ///
    /// An arc references an unknown variable, would introduce a cycle, or a
    /// variable name collides with an existing one. Fatal at build time.
    #[error("structure error: {0}")]
    Structure(String),

    /// Schema mismatch between a data table and a network structure.
    ///
    /// A network variable has no matching table column, or a table is used
    /// with a structure it was not encoded against.
    #[error("schema error: {0}")]
    Schema(String),

    /// Invalid configuration value.
    ///
    /// Examples: non-positive EM epsilon, zero iteration cap, empty class
    /// level list.
    #[error("config error: {0}")]
    Config(String),

    /// Normalization invariant violation.
    ///
    /// A CPT column or posterior failed to sum to 1 beyond floating
    /// tolerance after estimation. Indicates an internal bug; this must
    /// never occur in correct code.
    #[error("normalization invariant violated: {0}")]
    Normalization(String),

    /// Internal error.
    ///
    /// An unexpected condition such as an out-of-range variable id. Used
    /// only for programmer errors, not data errors.
    #[error("internal error: {0}")]
    Internal(String),
}
