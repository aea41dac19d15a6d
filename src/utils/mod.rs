use std::fmt::{Debug, Display};
use std::iter::Sum;
use std::ops::AddAssign;

use anyhow::anyhow;
use nalgebra::RealField;
use num_traits::{Float, NumCast};
use serde::{Deserialize, Serialize};

use crate::error::StatsError;

/// Scalar types the sparse matrices may store.
pub trait NumericOps: NumCast + Copy + PartialOrd + Default + Debug + Send + Sync + 'static {}

impl<T> NumericOps for T where T: NumCast + Copy + PartialOrd + Default + Debug + Send + Sync + 'static {}

/// Floating point scalars the statistics are computed in. `RealField` brings the
/// bounds nalgebra-sparse needs for sparse products, `Float` brings the NaN
/// sentinel.
pub trait FloatOps: NumericOps + Float + RealField + AddAssign + Sum + Display {}

impl<T> FloatOps for T where T: NumericOps + Float + RealField + AddAssign + Sum + Display {}

/// The axis a statistic is reduced along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// One value per column, reducing over the rows (numpy `axis=0`).
    Column,
    /// One value per row, reducing over the columns (numpy `axis=1`).
    Row,
    /// A single value for the whole matrix (numpy `axis=None`).
    All,
}

impl Axis {
    /// Maps a numpy-style axis index onto an [`Axis`].
    pub fn from_index(index: Option<usize>) -> anyhow::Result<Self> {
        match index {
            None => Ok(Axis::All),
            Some(0) => Ok(Axis::Column),
            Some(1) => Ok(Axis::Row),
            Some(other) => Err(StatsError::InvalidAxis(format!("axis index {}", other)).into()),
        }
    }

    /// Number of entries a lane along this axis spans for a matrix of `shape`.
    pub fn lane_len(&self, shape: (usize, usize)) -> usize {
        match self {
            Axis::Column => shape.0,
            Axis::Row => shape.1,
            Axis::All => shape.0 * shape.1,
        }
    }

    /// Number of values a reduction along this axis produces.
    pub fn lane_count(&self, shape: (usize, usize)) -> usize {
        match self {
            Axis::Column => shape.1,
            Axis::Row => shape.0,
            Axis::All => 1,
        }
    }
}

pub(crate) fn cast<S: NumCast + Copy + Debug, T: NumCast>(value: S) -> anyhow::Result<T> {
    T::from(value).ok_or_else(|| anyhow!("Failed to convert {:?} to target type", value))
}
