//! # Validity masks
//!
//! A validity mask is a boolean compressed matrix with the same shape as the
//! data matrix. A stored `true` at (i, j) excludes that entry from every
//! statistic. Masks are usually derived from the NaN entries of the data with
//! [`make_nan_mask`], and [`complement_count`] gives the number of entries left
//! in each lane, the denominator of every masked mean.

use log::debug;
use ndarray::Array1;

use crate::error::StatsError;
use crate::sparse::CompressedMatrix;
use crate::statistics::Reduction;
use crate::{Axis, FloatOps};

/// Boolean compressed matrix usable as a validity mask.
pub trait MaskMatrix: Clone {
    fn shape(&self) -> (usize, usize);

    /// Number of stored `true` values in each column.
    fn true_col(&self) -> Vec<usize>;

    /// Number of stored `true` values in each row.
    fn true_row(&self) -> Vec<usize>;

    fn true_total(&self) -> usize;
}

/// Flags every stored NaN of `x`.
pub fn make_nan_mask<T, M>(x: &M) -> anyhow::Result<M::Mask>
where
    T: FloatOps,
    M: CompressedMatrix<T>,
{
    let mask = x.nan_mask()?;
    debug!(
        "NaN mask over {:?}: {} of {} stored entries flagged",
        x.shape(),
        mask.true_total(),
        x.stored()
    );
    Ok(mask)
}

/// Entries per lane that the mask leaves valid.
pub fn complement_count<K: MaskMatrix>(mask: &K, axis: Axis) -> Reduction<usize> {
    let shape = mask.shape();
    let total = axis.lane_len(shape);
    match axis {
        Axis::Column => Reduction::Lanes(Array1::from_iter(
            mask.true_col().into_iter().map(|masked| total - masked),
        )),
        Axis::Row => Reduction::Lanes(Array1::from_iter(
            mask.true_row().into_iter().map(|masked| total - masked),
        )),
        Axis::All => Reduction::Scalar(total - mask.true_total()),
    }
}

pub(crate) fn check_mask_shape<K: MaskMatrix>(
    matrix: (usize, usize),
    mask: &K,
) -> Result<(), StatsError> {
    if mask.shape() != matrix {
        return Err(StatsError::MaskShapeMismatch {
            matrix,
            mask: mask.shape(),
        });
    }
    Ok(())
}

/// Walks two compressed structures lane by lane and returns, for each stored
/// entry of the first, whether the mask stores `true` at the same position.
/// Minor indices are sorted within a lane, so each lane is a single merge.
pub(crate) fn flag_lanes(
    offsets: &[usize],
    indices: &[usize],
    mask_offsets: &[usize],
    mask_indices: &[usize],
    mask_values: &[bool],
) -> Vec<bool> {
    let mut flags = vec![false; indices.len()];
    for (lane, mask_lane) in offsets.windows(2).zip(mask_offsets.windows(2)) {
        let mut cursor = mask_lane[0];
        for k in lane[0]..lane[1] {
            let index = indices[k];
            while cursor < mask_lane[1] && mask_indices[cursor] < index {
                cursor += 1;
            }
            if cursor < mask_lane[1] && mask_indices[cursor] == index {
                flags[k] = mask_values[cursor];
            }
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::{CscMatrix, CsrMatrix};

    fn nan_matrix() -> CscMatrix<f64> {
        // [nan 0   1 ]
        // [2   0   nan]
        // [0   0   3 ]
        CscMatrix::try_from_csc_data(
            3,
            3,
            vec![0, 2, 2, 5],
            vec![0, 1, 0, 1, 2],
            vec![f64::NAN, 2.0, 1.0, f64::NAN, 3.0],
        )
        .unwrap()
    }

    #[test]
    fn test_make_nan_mask() {
        let x = nan_matrix();
        let mask = make_nan_mask(&x).unwrap();

        assert_eq!(mask.nrows(), 3);
        assert_eq!(mask.ncols(), 3);
        assert_eq!(mask.nnz(), 2);
        assert!(mask.values().iter().all(|&f| f));
        let positions: Vec<(usize, usize)> = mask.triplet_iter().map(|(i, j, _)| (i, j)).collect();
        assert_eq!(positions, vec![(0, 0), (1, 2)]);
    }

    #[test]
    fn test_make_nan_mask_is_deterministic() {
        let x = nan_matrix();
        let first = make_nan_mask(&x).unwrap();
        let second = make_nan_mask(&x).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_make_nan_mask_without_nans() {
        let x: CsrMatrix<f64> = CsrMatrix::identity(4);
        let mask = make_nan_mask(&x).unwrap();
        assert_eq!(mask.nnz(), 0);
        assert_eq!(MaskMatrix::shape(&mask), (4, 4));
    }

    #[test]
    fn test_complement_count() {
        let mask = make_nan_mask(&nan_matrix()).unwrap();

        let cols = complement_count(&mask, Axis::Column);
        assert_eq!(cols.into_lanes().unwrap().to_vec(), vec![2, 3, 2]);

        let rows = complement_count(&mask, Axis::Row);
        assert_eq!(rows.into_lanes().unwrap().to_vec(), vec![2, 2, 3]);

        let all = complement_count(&mask, Axis::All);
        assert_eq!(all.into_scalar(), Some(7));
    }

    #[test]
    fn test_complement_count_ignores_stored_false() {
        let mask = CscMatrix::try_from_csc_data(2, 2, vec![0, 2, 2], vec![0, 1], vec![true, false])
            .unwrap();
        assert_eq!(complement_count(&mask, Axis::All).into_scalar(), Some(3));
        assert_eq!(
            complement_count(&mask, Axis::Row).into_lanes().unwrap().to_vec(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_check_mask_shape() {
        let mask: CscMatrix<bool> = CscMatrix::zeros(2, 3);
        assert!(check_mask_shape((2, 3), &mask).is_ok());
        assert!(matches!(
            check_mask_shape((3, 2), &mask),
            Err(StatsError::MaskShapeMismatch { matrix: (3, 2), mask: (2, 3) })
        ));
    }

    #[test]
    fn test_flag_lanes() {
        // Data lane holds minor indices 0, 2, 5; mask lane flags 2 and 4.
        let flags = flag_lanes(&[0, 3], &[0, 2, 5], &[0, 2], &[2, 4], &[true, true]);
        assert_eq!(flags, vec![false, true, false]);
    }
}
