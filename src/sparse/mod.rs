use std::iter::Sum;
use std::ops::AddAssign;

use ndarray::{Array1, Array2, ArrayView1};
use num_traits::{Float, NumCast, PrimInt, Unsigned, Zero};

use crate::masking::MaskMatrix;
use crate::FloatOps;

pub mod csc;
pub mod csr;

pub trait MatrixNonZero {
    /// Number of stored entries in each column.
    fn nonzero_col<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: PrimInt + Unsigned + Zero + AddAssign;

    /// Number of stored entries in each row.
    fn nonzero_row<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: PrimInt + Unsigned + Zero + AddAssign;
}

pub trait MatrixSum {
    type Item: NumCast;

    fn sum_col<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: Float + NumCast + AddAssign + Sum;

    fn sum_row<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: Float + NumCast + AddAssign + Sum;

    fn sum_all<T>(&self) -> anyhow::Result<T>
    where
        T: Float + NumCast + AddAssign + Sum;

    /// Sum of absolute values for each column.
    fn abs_sum_col<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: Float + NumCast + AddAssign + Sum;

    /// Sum of absolute values for each row.
    fn abs_sum_row<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: Float + NumCast + AddAssign + Sum;
}

/// The compressed sparse matrix operations the statistics engine is written
/// against. Implemented for `CscMatrix<T>` and `CsrMatrix<T>`; each format pairs
/// with a boolean mask stored in the same format.
pub trait CompressedMatrix<T: FloatOps>: MatrixSum<Item = T> + MatrixNonZero + Clone {
    type Mask: MaskMatrix;

    fn shape(&self) -> (usize, usize);

    /// Number of explicitly stored entries, zeros included.
    fn stored(&self) -> usize;

    /// Element-wise square. Keeps the sparsity pattern.
    fn squared(&self) -> Self;

    /// Copy without explicitly stored zeros.
    fn compacted(&self) -> Self;

    /// Boolean matrix flagging every stored NaN. Implicit zeros are never
    /// inspected. The result holds no stored `false`.
    fn nan_mask(&self) -> anyhow::Result<Self::Mask>;

    /// One flag per stored value, in storage order: `true` where the mask marks
    /// that entry as invalid.
    fn flag_masked(&self, mask: &Self::Mask) -> Vec<bool>;

    /// Sets the flagged stored values to zero without touching the pattern.
    fn zero_flagged(&mut self, flags: &[bool]);

    /// Dense `xᵀx`, computed through the sparse-sparse product.
    fn gram(&self) -> Array2<T>;

    /// `xᵀy` for a dense vector `y` with one entry per row.
    fn transpose_dot(&self, y: ArrayView1<T>) -> Array1<T>;

    /// Copy in which every masked entry is zeroed and dropped.
    fn masked_zeroed(&self, mask: &Self::Mask) -> Self {
        let mut copy = self.clone();
        let flags = copy.flag_masked(mask);
        copy.zero_flagged(&flags);
        copy.compacted()
    }
}
