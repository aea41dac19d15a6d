//! # Masked descriptive statistics
//!
//! Mean, variance, covariance and correlation computed directly on compressed
//! sparse matrices. Every formula is written so the expensive part stays a
//! sparse reduction or a sparse product:
//!
//! - `var = E[x²] − E[x]²` (two masked means, no per-entry deviation)
//! - `cov = xᵀy / n − E[x]ᵀE[y]`
//!
//! The one-pass variance is less stable than a deviation-based one when the
//! variance is tiny relative to the mean. The intended inputs are sparse counts
//! and ratios, where this does not matter.
//!
//! ## Masks
//! A mask marks entries to exclude. Masked means divide by the number of valid
//! entries per lane ([`complement_count`]). Masked entries still contribute to
//! the sums unless `safe` is requested: the caller either guarantees masked
//! entries are already zero, or pays for a private zeroed copy. The caller's
//! matrix is never mutated.

mod types;

use log::{debug, warn};
use ndarray::{Array1, ArrayView1};
use num_traits::{Float, NumCast};

use anyhow::anyhow;

use crate::error::StatsError;
use crate::masking::{check_mask_shape, complement_count};
use crate::sparse::CompressedMatrix;
use crate::{Axis, FloatOps};

pub use types::*;

pub(crate) fn as_float<T: FloatOps>(count: usize) -> T {
    <T as NumCast>::from(count).unwrap_or_else(<T as Float>::nan)
}

pub(crate) fn axis_sum<T, M>(x: &M, axis: Axis) -> anyhow::Result<Reduction<T>>
where
    T: FloatOps,
    M: CompressedMatrix<T>,
{
    Ok(match axis {
        Axis::Column => Reduction::Lanes(Array1::from(x.sum_col::<T>()?)),
        Axis::Row => Reduction::Lanes(Array1::from(x.sum_row::<T>()?)),
        Axis::All => Reduction::Scalar(x.sum_all::<T>()?),
    })
}

/// Fraction of entries explicitly stored.
pub fn density<T, M>(x: &M) -> f64
where
    T: FloatOps,
    M: CompressedMatrix<T>,
{
    let (nrows, ncols) = x.shape();
    x.stored() as f64 / (nrows * ncols) as f64
}

fn nan_advisory<T: FloatOps>(values: &Reduction<T>) -> Option<Advisory> {
    let count = match values {
        Reduction::Scalar(v) => {
            if Float::is_nan(*v) {
                1
            } else {
                0
            }
        }
        Reduction::Lanes(values) => values.iter().filter(|&&v| Float::is_nan(v)).count(),
    };
    if count > 0 {
        warn!(
            "Result contains {} NaN value(s). Consider adding a NaN mask",
            count
        );
        Some(Advisory::NanInResult { count })
    } else {
        None
    }
}

fn merge_advisories(into: &mut Vec<Advisory>, from: Vec<Advisory>) {
    for advisory in from {
        if !into.contains(&advisory) {
            into.push(advisory);
        }
    }
}

/// Arithmetic mean along `axis`.
///
/// Without a mask every lane is divided by its full length. With a mask, the
/// divisor is the number of entries the mask leaves valid, and `safe` decides
/// whether masked entries are zeroed on a copy before summing. With
/// `safe = false` the caller guarantees masked entries are already zero;
/// non-zero masked values would be summed as if they were valid.
///
/// NaN values in the result are returned as-is and reported as
/// [`Advisory::NanInResult`].
pub fn mean<T, M>(
    x: &M,
    axis: Axis,
    mask: Option<&M::Mask>,
    safe: bool,
) -> anyhow::Result<Computed<Reduction<T>>>
where
    T: FloatOps,
    M: CompressedMatrix<T>,
{
    let shape = x.shape();
    debug!(
        "mean over {:?} ({} stored) along {:?}, masked: {}, safe: {}",
        shape,
        x.stored(),
        axis,
        mask.is_some(),
        safe
    );

    let mut advisories = Vec::new();
    let means = match mask {
        None => {
            let n: T = as_float(axis.lane_len(shape));
            axis_sum(x, axis)?.map(|sum| sum / n)
        }
        Some(mask) => {
            check_mask_shape(shape, mask)?;
            let sums = if safe {
                warn!("Masking safely: zeroing masked entries on a copy of the matrix. May be slow");
                advisories.push(Advisory::SafeMaskingCopy);
                axis_sum(&x.masked_zeroed(mask), axis)?
            } else {
                axis_sum(x, axis)?
            };
            let counts = complement_count(mask, axis);
            sums.zip_with(&counts, |sum, count| sum / as_float::<T>(count))?
        }
    };

    if let Some(advisory) = nan_advisory(&means) {
        advisories.push(advisory);
    }
    Ok(Computed::with_advisories(means, advisories))
}

/// Population variance (ddof = 0) along `axis`, as `E[x²] − E[x]²`.
pub fn variance<T, M>(
    x: &M,
    axis: Axis,
    mask: Option<&M::Mask>,
    safe: bool,
) -> anyhow::Result<Computed<Reduction<T>>>
where
    T: FloatOps,
    M: CompressedMatrix<T>,
{
    if let Some(mask) = mask {
        check_mask_shape(x.shape(), mask)?;
    }

    let second_moment = mean(&x.squared(), axis, mask, safe)?;
    let first_moment = mean(x, axis, mask, safe)?;
    let value = second_moment
        .value
        .zip_with(&first_moment.value, |sq, m| sq - m * m)?;

    let mut advisories = second_moment.advisories;
    merge_advisories(&mut advisories, first_moment.advisories);
    Ok(Computed::with_advisories(value, advisories))
}

fn dense_mean<T: FloatOps>(y: ArrayView1<T>) -> T {
    y.iter().copied().sum::<T>() / as_float(y.len())
}

fn dense_variance<T: FloatOps>(y: ArrayView1<T>) -> T {
    let m = dense_mean(y);
    y.iter().map(|&v| (v - m) * (v - m)).sum::<T>() / as_float(y.len())
}

fn check_target<T>(nrows: usize, target: Option<ArrayView1<T>>) -> Result<(), StatsError> {
    match target {
        Some(y) if y.len() != nrows => Err(StatsError::TargetLengthMismatch {
            matrix: nrows,
            target: y.len(),
        }),
        _ => Ok(()),
    }
}

/// Covariance of the columns of `x` (ddof = 0).
///
/// Without a target this is the square auto-covariance matrix; with a target
/// vector `y` (one entry per row, fully observed) it is the covariance of every
/// column with `y`. Column means honour the mask, trusting masked entries to be
/// zero. `blocks` is reserved for row-blocked computation and must be 1.
pub fn covariance<T, M>(
    x: &M,
    target: Option<ArrayView1<T>>,
    mask: Option<&M::Mask>,
    blocks: usize,
) -> anyhow::Result<Computed<Pairwise<T>>>
where
    T: FloatOps,
    M: CompressedMatrix<T>,
{
    if blocks != 1 {
        return Err(StatsError::NotImplemented("Blocked covariance (blocks != 1)").into());
    }
    let (nrows, ncols) = x.shape();
    if let Some(mask) = mask {
        check_mask_shape((nrows, ncols), mask)?;
    }
    check_target(nrows, target)?;
    debug!(
        "covariance of {} columns over {} rows ({} stored), target: {}",
        ncols,
        nrows,
        x.stored(),
        target.is_some()
    );

    let column_means = mean(x, Axis::Column, mask, false)?;
    let advisories = column_means.advisories;
    let xmean = column_means
        .value
        .into_lanes()
        .ok_or_else(|| anyhow!("Column means must be one value per column"))?;
    let n: T = as_float(nrows);

    let value = match target {
        None => {
            let mut cov = x.gram();
            for ((i, j), v) in cov.indexed_iter_mut() {
                *v = *v / n - xmean[i] * xmean[j];
            }
            Pairwise::Auto(cov)
        }
        Some(y) => {
            let ymean = dense_mean(y);
            let mut cov = x.transpose_dot(y);
            cov.zip_mut_with(&xmean, |c, &m| *c = *c / n - m * ymean);
            Pairwise::Target(cov)
        }
    };

    Ok(Computed::with_advisories(value, advisories))
}

/// Pearson correlation of the columns of `x`, with each other or with a target.
///
/// Columns with zero variance produce NaN entries; that is a valid result.
pub fn correlation<T, M>(
    x: &M,
    target: Option<ArrayView1<T>>,
    mask: Option<&M::Mask>,
) -> anyhow::Result<Computed<Pairwise<T>>>
where
    T: FloatOps,
    M: CompressedMatrix<T>,
{
    let cov = covariance(x, target, mask, 1)?;
    let mut advisories = cov.advisories;

    let value = match (cov.value, target) {
        (Pairwise::Auto(mut cv), _) => {
            let sd: Array1<T> = cv.diag().mapv(|v| Float::sqrt(v));
            for ((i, j), v) in cv.indexed_iter_mut() {
                *v = *v / sd[i] / sd[j];
            }
            Pairwise::Auto(cv)
        }
        (Pairwise::Target(mut cv), Some(y)) => {
            let xvar = variance(x, Axis::Column, mask, false)?;
            merge_advisories(&mut advisories, xvar.advisories);
            let xvar = xvar
                .value
                .into_lanes()
                .ok_or_else(|| anyhow!("Column variances must be one value per column"))?;
            let yvar = dense_variance(y);
            cv.zip_mut_with(&xvar, |c, &v| *c = *c / Float::sqrt(v * yvar));
            Pairwise::Target(cv)
        }
        (Pairwise::Target(_), None) => {
            return Err(anyhow!("Target covariance computed without a target"));
        }
    };

    Ok(Computed::with_advisories(value, advisories))
}
