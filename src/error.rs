//! Error types for the statistics and indexing engines.
//!
//! Every fallible function in this crate returns `anyhow::Result`; the variants
//! below are the distinct failure signals callers may want to match on. They
//! travel inside the `anyhow::Error` and are recovered with
//! `err.downcast_ref::<StatsError>()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    /// The mask does not cover the data matrix entry for entry.
    #[error("Mask shape {mask:?} does not match matrix shape {matrix:?}")]
    MaskShapeMismatch {
        matrix: (usize, usize),
        mask: (usize, usize),
    },

    /// The target vector and the data matrix disagree on the number of rows.
    #[error("Target has {target} rows but matrix has {matrix} rows")]
    TargetLengthMismatch { matrix: usize, target: usize },

    /// Column labels must be one per column.
    #[error("Expected {expected} column names, got {found}")]
    ColumnCountMismatch { expected: usize, found: usize },

    /// The axis is not meaningful for the requested operation.
    #[error("Invalid axis: {0}")]
    InvalidAxis(String),

    /// Unknown constancy method name.
    #[error("Unknown method `{0}`, expected `variance` or `nnz`")]
    UnknownMethod(String),

    /// Operation exists in the API but has no implementation.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    /// A persisted blob holds something other than a feature matrix.
    #[error("Stored object is a `{found}`, not a FeatureMatrix")]
    NotAFeatureMatrix { found: String },
}
