use std::iter::Sum;
use std::ops::AddAssign;

use anyhow::anyhow;
use nalgebra_sparse::CscMatrix;
use ndarray::{Array1, Array2, ArrayView1};
use num_traits::{Float, NumCast, PrimInt, Unsigned, Zero};

use crate::masking::{flag_lanes, MaskMatrix};
use crate::utils::cast;
use crate::{FloatOps, NumericOps};

use super::{CompressedMatrix, MatrixNonZero, MatrixSum};

impl<M: NumericOps> MatrixNonZero for CscMatrix<M> {
    fn nonzero_col<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: PrimInt + Unsigned + Zero + AddAssign,
    {
        self.col_offsets()
            .windows(2)
            .map(|window| {
                let diff = window[1]
                    .checked_sub(window[0])
                    .ok_or_else(|| anyhow!("Subtraction overflow"))?;
                T::from(diff).ok_or_else(|| anyhow!("Failed to convert to target type"))
            })
            .collect()
    }

    fn nonzero_row<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: PrimInt + Unsigned + Zero + AddAssign,
    {
        let mut result = vec![T::zero(); self.nrows()];
        for &row_index in self.row_indices() {
            result[row_index] += T::one();
        }
        Ok(result)
    }
}

impl<M: NumericOps> MatrixSum for CscMatrix<M> {
    type Item = M;

    fn sum_col<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: Float + NumCast + AddAssign + Sum,
    {
        let values = self.values();
        let mut result = Vec::with_capacity(self.ncols());
        for window in self.col_offsets().windows(2) {
            let mut total = T::zero();
            for &value in &values[window[0]..window[1]] {
                total += cast::<M, T>(value)?;
            }
            result.push(total);
        }
        Ok(result)
    }

    fn sum_row<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: Float + NumCast + AddAssign + Sum,
    {
        let mut result = vec![T::zero(); self.nrows()];
        for (&row, &value) in self.row_indices().iter().zip(self.values().iter()) {
            result[row] += cast::<M, T>(value)?;
        }
        Ok(result)
    }

    fn sum_all<T>(&self) -> anyhow::Result<T>
    where
        T: Float + NumCast + AddAssign + Sum,
    {
        let mut total = T::zero();
        for &value in self.values() {
            total += cast::<M, T>(value)?;
        }
        Ok(total)
    }

    fn abs_sum_col<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: Float + NumCast + AddAssign + Sum,
    {
        let values = self.values();
        let mut result = Vec::with_capacity(self.ncols());
        for window in self.col_offsets().windows(2) {
            let mut total = T::zero();
            for &value in &values[window[0]..window[1]] {
                total += cast::<M, T>(value)?.abs();
            }
            result.push(total);
        }
        Ok(result)
    }

    fn abs_sum_row<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: Float + NumCast + AddAssign + Sum,
    {
        let mut result = vec![T::zero(); self.nrows()];
        for (&row, &value) in self.row_indices().iter().zip(self.values().iter()) {
            result[row] += cast::<M, T>(value)?.abs();
        }
        Ok(result)
    }
}

impl<T: FloatOps> CompressedMatrix<T> for CscMatrix<T> {
    type Mask = CscMatrix<bool>;

    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    fn stored(&self) -> usize {
        self.nnz()
    }

    fn squared(&self) -> Self {
        let mut out = self.clone();
        for value in out.values_mut() {
            *value = *value * *value;
        }
        out
    }

    fn compacted(&self) -> Self {
        self.filter(|_, _, value| !value.is_zero())
    }

    fn nan_mask(&self) -> anyhow::Result<CscMatrix<bool>> {
        let flags: Vec<bool> = self.values().iter().map(|&v| Float::is_nan(v)).collect();
        let mask = CscMatrix::try_from_pattern_and_values(self.pattern().clone(), flags)
            .map_err(|e| anyhow!("Failed to build NaN mask: {}", e))?;
        Ok(mask.filter(|_, _, &flag| flag))
    }

    fn flag_masked(&self, mask: &CscMatrix<bool>) -> Vec<bool> {
        flag_lanes(
            self.col_offsets(),
            self.row_indices(),
            mask.col_offsets(),
            mask.row_indices(),
            mask.values(),
        )
    }

    fn zero_flagged(&mut self, flags: &[bool]) {
        for (value, &flag) in self.values_mut().iter_mut().zip(flags.iter()) {
            if flag {
                *value = T::zero();
            }
        }
    }

    fn gram(&self) -> Array2<T> {
        let transposed = self.transpose();
        let product = &transposed * self;
        let mut out = Array2::zeros((self.ncols(), self.ncols()));
        for (i, j, &value) in product.triplet_iter() {
            out[[i, j]] += value;
        }
        out
    }

    fn transpose_dot(&self, y: ArrayView1<T>) -> Array1<T> {
        let mut out = Array1::zeros(self.ncols());
        for (col, column) in self.col_iter().enumerate() {
            let mut total = T::zero();
            for (&row, &value) in column.row_indices().iter().zip(column.values().iter()) {
                total += value * y[row];
            }
            out[col] = total;
        }
        out
    }
}

impl MaskMatrix for CscMatrix<bool> {
    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    fn true_col(&self) -> Vec<usize> {
        let values = self.values();
        self.col_offsets()
            .windows(2)
            .map(|window| values[window[0]..window[1]].iter().filter(|&&f| f).count())
            .collect()
    }

    fn true_row(&self) -> Vec<usize> {
        let mut result = vec![0; self.nrows()];
        for (&row, &flag) in self.row_indices().iter().zip(self.values().iter()) {
            if flag {
                result[row] += 1;
            }
        }
        result
    }

    fn true_total(&self) -> usize {
        self.values().iter().filter(|&&f| f).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra_sparse::CscMatrix;

    fn create_test_matrix() -> CscMatrix<f64> {
        // 4x3 matrix:
        // [1 0 2]
        // [0 0 0]
        // [3 4 0]
        // [0 5 6]
        let values = vec![1.0, 3.0, 4.0, 5.0, 2.0, 6.0];
        let row_indices = vec![0, 2, 2, 3, 0, 3];
        let col_ptrs = vec![0, 2, 4, 6];

        CscMatrix::try_from_csc_data(4, 3, col_ptrs, row_indices, values).unwrap()
    }

    #[test]
    fn test_nonzero_counts() {
        let matrix = create_test_matrix();
        let cols: Vec<u32> = matrix.nonzero_col().unwrap();
        let rows: Vec<u32> = matrix.nonzero_row().unwrap();
        assert_eq!(cols, vec![2, 2, 2]);
        assert_eq!(rows, vec![2, 0, 2, 2]);
    }

    #[test]
    fn test_empty_and_zero_matrices() {
        let empty: CscMatrix<f64> = CscMatrix::zeros(0, 0);
        assert!(empty.nonzero_col::<u32>().unwrap().is_empty());
        assert!(empty.sum_row::<f64>().unwrap().is_empty());

        let zero: CscMatrix<f64> = CscMatrix::zeros(4, 3);
        assert_eq!(zero.nonzero_col::<u32>().unwrap(), vec![0, 0, 0]);
        assert_eq!(zero.sum_col::<f64>().unwrap(), vec![0.0, 0.0, 0.0]);
        assert_eq!(zero.sum_all::<f64>().unwrap(), 0.0);
    }

    #[test]
    fn test_sums() {
        let matrix = create_test_matrix();
        assert_eq!(matrix.sum_col::<f64>().unwrap(), vec![4.0, 9.0, 8.0]);
        assert_eq!(matrix.sum_row::<f64>().unwrap(), vec![3.0, 0.0, 7.0, 11.0]);
        assert_relative_eq!(matrix.sum_all::<f64>().unwrap(), 21.0);

        let sum_f32: Vec<f32> = matrix.sum_col().unwrap();
        assert_eq!(sum_f32, vec![4.0f32, 9.0, 8.0]);
    }

    #[test]
    fn test_abs_sums() {
        let values = vec![-1.0, 1.0, -4.0];
        let matrix =
            CscMatrix::try_from_csc_data(2, 2, vec![0, 2, 3], vec![0, 1, 1], values).unwrap();
        assert_eq!(matrix.sum_col::<f64>().unwrap(), vec![0.0, -4.0]);
        assert_eq!(matrix.abs_sum_col::<f64>().unwrap(), vec![2.0, 4.0]);
        assert_eq!(matrix.abs_sum_row::<f64>().unwrap(), vec![1.0, 5.0]);
    }

    #[test]
    fn test_squared_keeps_pattern() {
        let matrix = create_test_matrix();
        let squared = matrix.squared();
        assert_eq!(squared.row_indices(), matrix.row_indices());
        assert_eq!(squared.values(), &[1.0, 9.0, 16.0, 25.0, 4.0, 36.0]);
    }

    #[test]
    fn test_compacted_drops_explicit_zeros() {
        let matrix = CscMatrix::try_from_csc_data(
            3,
            2,
            vec![0, 2, 3],
            vec![0, 2, 1],
            vec![0.0, 2.0, 0.0],
        )
        .unwrap();
        assert_eq!(matrix.stored(), 3);

        let compact = matrix.compacted();
        assert_eq!(compact.stored(), 1);
        assert_eq!(compact.row_indices(), &[2]);
        assert_eq!(compact.values(), &[2.0]);
    }

    #[test]
    fn test_nan_mask() {
        let matrix = CscMatrix::try_from_csc_data(
            3,
            2,
            vec![0, 2, 3],
            vec![0, 2, 1],
            vec![f64::NAN, 2.0, f64::NAN],
        )
        .unwrap();
        let mask = matrix.nan_mask().unwrap();

        assert_eq!(MaskMatrix::shape(&mask), (3, 2));
        assert_eq!(mask.nnz(), 2);
        assert_eq!(mask.true_col(), vec![1, 1]);
        assert_eq!(mask.true_row(), vec![1, 1, 0]);
        assert_eq!(mask.true_total(), 2);
    }

    #[test]
    fn test_masked_zeroed() {
        let matrix = create_test_matrix();
        // Mask (2, 0) and (3, 2), plus (1, 1) which is not stored in the data.
        let mask = CscMatrix::try_from_csc_data(
            4,
            3,
            vec![0, 1, 2, 3],
            vec![2, 1, 3],
            vec![true, true, true],
        )
        .unwrap();

        assert_eq!(
            matrix.flag_masked(&mask),
            vec![false, true, false, false, false, true]
        );

        let cleaned = matrix.masked_zeroed(&mask);
        assert_eq!(cleaned.stored(), 4);
        assert_eq!(cleaned.sum_col::<f64>().unwrap(), vec![1.0, 9.0, 2.0]);
        // Source untouched.
        assert_eq!(matrix.stored(), 6);
    }

    #[test]
    fn test_gram_and_transpose_dot() {
        let matrix = create_test_matrix();
        let gram = matrix.gram();
        assert_eq!(gram.dim(), (3, 3));
        // Column dot products.
        assert_relative_eq!(gram[[0, 0]], 10.0);
        assert_relative_eq!(gram[[0, 1]], 12.0);
        assert_relative_eq!(gram[[0, 2]], 2.0);
        assert_relative_eq!(gram[[1, 1]], 41.0);
        assert_relative_eq!(gram[[1, 2]], 30.0);
        assert_relative_eq!(gram[[2, 2]], 40.0);
        assert_relative_eq!(gram[[2, 1]], gram[[1, 2]]);

        let y = ndarray::array![1.0, 1.0, 0.0, 2.0];
        let xty = matrix.transpose_dot(y.view());
        assert_eq!(xty.to_vec(), vec![1.0, 10.0, 14.0]);
    }

    #[test]
    fn test_large_sparse_matrix() {
        let n = 1000;
        let mut values = Vec::new();
        let mut row_indices = Vec::new();
        let mut col_ptrs = vec![0];
        let mut current_nnz = 0;

        // Tridiagonal
        for col in 0..n {
            if col > 0 {
                values.push(1.0);
                row_indices.push(col - 1);
                current_nnz += 1;
            }
            values.push(2.0);
            row_indices.push(col);
            current_nnz += 1;
            if col < n - 1 {
                values.push(1.0);
                row_indices.push(col + 1);
                current_nnz += 1;
            }
            col_ptrs.push(current_nnz);
        }

        let matrix = CscMatrix::try_from_csc_data(n, n, col_ptrs, row_indices, values).unwrap();

        let col_nnz: Vec<u32> = matrix.nonzero_col().unwrap();
        assert_eq!(col_nnz[0], 2);
        assert_eq!(col_nnz[n / 2], 3);
        assert_eq!(col_nnz[n - 1], 2);

        let sums: Vec<f64> = matrix.sum_col().unwrap();
        assert_relative_eq!(sums[n / 2], 4.0);
    }
}
