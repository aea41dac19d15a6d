//! # spartans
//!
//! Descriptive statistics and feature-selection indices computed directly on
//! compressed sparse matrices, with optional validity masks.
//!
//! ## Modules
//! - **Sparse** ([`sparse`]): reductions and kernels over CSC and CSR matrices
//! - **Masking** ([`masking`]): NaN masks and per-lane valid-entry counts
//! - **Statistics** ([`statistics`]): mean, variance, covariance and correlation
//! - **Indexing** ([`indexing`]): non-zero, constant and non-constant lanes
//! - **Feature matrix** ([`feature_matrix`]): labelled matrix with a stored mask,
//!   a statistics cache and binary persistence
//!
//! Fallible functions return `anyhow::Result`; failures with a distinct meaning
//! carry a [`StatsError`].

pub mod error;
pub mod feature_matrix;
pub mod indexing;
pub mod masking;
pub mod sparse;
pub mod statistics;
mod utils;

#[cfg(test)]
mod testing;

pub use error::StatsError;
pub use feature_matrix::{FeatureMatrix, FeatureMatrixBuilder, StatKey};
pub use indexing::{constant_index, non_constant_index, non_zero_index, ConstancyMethod, Selection};
pub use masking::{complement_count, make_nan_mask, MaskMatrix};
pub use statistics::{correlation, covariance, density, mean, variance, Advisory, Computed, Pairwise, Reduction};
pub use utils::Axis;
pub use utils::FloatOps;
pub use utils::NumericOps;
