//! # Feature-selection indices
//!
//! Classifies the rows or columns of a sparse matrix as non-zero, constant or
//! non-constant. Results come back either as a boolean flag per lane or as the
//! ascending positions of the selected lanes.

use std::fmt;
use std::str::FromStr;

use log::debug;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::sparse::CompressedMatrix;
use crate::statistics::{as_float, variance, Reduction};
use crate::{Axis, FloatOps};

/// Lanes picked by an index query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// One flag per lane.
    Flags(Array1<bool>),
    /// Positions of the selected lanes, ascending.
    Positions(Vec<usize>),
}

impl Selection {
    fn from_flags(flags: Array1<bool>, as_bool: bool) -> Self {
        if as_bool {
            Selection::Flags(flags)
        } else {
            Selection::Positions(
                flags
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &selected)| selected.then_some(i))
                    .collect(),
            )
        }
    }

    pub fn into_flags(self) -> Option<Array1<bool>> {
        match self {
            Selection::Flags(flags) => Some(flags),
            Selection::Positions(_) => None,
        }
    }

    pub fn into_positions(self) -> Option<Vec<usize>> {
        match self {
            Selection::Flags(_) => None,
            Selection::Positions(positions) => Some(positions),
        }
    }
}

/// How [`non_constant_index`] decides that a lane is informative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConstancyMethod {
    /// Lane variance above the threshold. Honours the mask.
    #[default]
    Variance,
    /// Number of stored entries above the threshold. The mask does not apply.
    Nnz,
}

impl FromStr for ConstancyMethod {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "variance" => Ok(ConstancyMethod::Variance),
            "nnz" => Ok(ConstancyMethod::Nnz),
            other => Err(StatsError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for ConstancyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstancyMethod::Variance => write!(f, "variance"),
            ConstancyMethod::Nnz => write!(f, "nnz"),
        }
    }
}

fn lane_axis(axis: Axis) -> Result<Axis, StatsError> {
    match axis {
        Axis::All => Err(StatsError::InvalidAxis(
            "index queries need a row or column axis".to_string(),
        )),
        lane => Ok(lane),
    }
}

fn lane_variance<T, M>(x: &M, axis: Axis, mask: Option<&M::Mask>) -> anyhow::Result<Array1<T>>
where
    T: FloatOps,
    M: CompressedMatrix<T>,
{
    match variance(x, axis, mask, false)?.into_value() {
        Reduction::Lanes(values) => Ok(values),
        Reduction::Scalar(_) => Err(StatsError::InvalidAxis(format!("{:?}", axis)).into()),
    }
}

/// Rows or columns holding at least one non-zero entry.
///
/// A lane is selected when the sum of its absolute values is not zero. NaN
/// entries make the sum NaN, so those lanes are selected too.
pub fn non_zero_index<T, M>(x: &M, axis: Axis, as_bool: bool) -> anyhow::Result<Selection>
where
    T: FloatOps,
    M: CompressedMatrix<T>,
{
    let abs_sums: Vec<T> = match lane_axis(axis)? {
        Axis::Row => x.abs_sum_row()?,
        _ => x.abs_sum_col()?,
    };
    let flags = Array1::from_iter(abs_sums.into_iter().map(|s| !s.is_zero()));
    Ok(Selection::from_flags(flags, as_bool))
}

/// Rows or columns that are informative: variance (or stored-entry count, with
/// [`ConstancyMethod::Nnz`]) strictly above `threshold`.
///
/// With a zero threshold and no mask, any lane with a non-zero entry counts as
/// non-constant and the variance is never computed. A lane holding the same
/// non-zero value everywhere is therefore reported as non-constant on that path.
pub fn non_constant_index<T, M>(
    x: &M,
    axis: Axis,
    mask: Option<&M::Mask>,
    as_bool: bool,
    threshold: T,
    method: ConstancyMethod,
) -> anyhow::Result<Selection>
where
    T: FloatOps,
    M: CompressedMatrix<T>,
{
    let axis = lane_axis(axis)?;
    if threshold.is_zero() && mask.is_none() {
        return non_zero_index(x, axis, as_bool);
    }
    debug!(
        "non-constant lanes along {:?} by {} above {}",
        axis, method, threshold
    );

    let flags = match method {
        ConstancyMethod::Variance => lane_variance(x, axis, mask)?.mapv(|v| v > threshold),
        ConstancyMethod::Nnz => {
            let counts: Vec<usize> = match axis {
                Axis::Row => x.nonzero_row()?,
                _ => x.nonzero_col()?,
            };
            Array1::from_iter(counts.into_iter().map(|c| as_float::<T>(c) > threshold))
        }
    };
    Ok(Selection::from_flags(flags, as_bool))
}

/// Rows or columns whose variance is at most `threshold`; the complement of the
/// variance test in [`non_constant_index`].
pub fn constant_index<T, M>(
    x: &M,
    axis: Axis,
    mask: Option<&M::Mask>,
    as_bool: bool,
    threshold: T,
) -> anyhow::Result<Selection>
where
    T: FloatOps,
    M: CompressedMatrix<T>,
{
    let axis = lane_axis(axis)?;
    let flags = lane_variance(x, axis, mask)?.mapv(|v| v <= threshold);
    Ok(Selection::from_flags(flags, as_bool))
}
