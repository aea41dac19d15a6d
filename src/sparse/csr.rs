use std::iter::Sum;
use std::ops::AddAssign;

use anyhow::anyhow;
use nalgebra_sparse::CsrMatrix;
use ndarray::{Array1, Array2, ArrayView1};
use num_traits::{Float, NumCast, PrimInt, Unsigned, Zero};

use crate::masking::{flag_lanes, MaskMatrix};
use crate::utils::cast;
use crate::{FloatOps, NumericOps};

use super::{CompressedMatrix, MatrixNonZero, MatrixSum};

impl<M: NumericOps> MatrixNonZero for CsrMatrix<M> {
    fn nonzero_col<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: PrimInt + Unsigned + Zero + AddAssign,
    {
        let mut result = vec![T::zero(); self.ncols()];
        for &col_index in self.col_indices() {
            result[col_index] += T::one();
        }
        Ok(result)
    }

    fn nonzero_row<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: PrimInt + Unsigned + Zero + AddAssign,
    {
        self.row_offsets()
            .windows(2)
            .map(|window| {
                let diff = window[1]
                    .checked_sub(window[0])
                    .ok_or_else(|| anyhow!("Subtraction overflow"))?;
                T::from(diff).ok_or_else(|| anyhow!("Failed to convert to target type"))
            })
            .collect()
    }
}

impl<M: NumericOps> MatrixSum for CsrMatrix<M> {
    type Item = M;

    fn sum_col<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: Float + NumCast + AddAssign + Sum,
    {
        let mut result = vec![T::zero(); self.ncols()];
        for (&col_index, &value) in self.col_indices().iter().zip(self.values().iter()) {
            result[col_index] += cast::<M, T>(value)?;
        }
        Ok(result)
    }

    fn sum_row<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: Float + NumCast + AddAssign + Sum,
    {
        let mut result = Vec::with_capacity(self.nrows());
        for row_vec in self.row_iter() {
            let mut total = T::zero();
            for &value in row_vec.values() {
                total += cast::<M, T>(value)?;
            }
            result.push(total);
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
        let mut result = vec![T::zero(); self.ncols()];
        for (&col_index, &value) in self.col_indices().iter().zip(self.values().iter()) {
            result[col_index] += cast::<M, T>(value)?.abs();
        }
        Ok(result)
    }

    fn abs_sum_row<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: Float + NumCast + AddAssign + Sum,
    {
        let mut result = Vec::with_capacity(self.nrows());
        for row_vec in self.row_iter() {
            let mut total = T::zero();
            for &value in row_vec.values() {
                total += cast::<M, T>(value)?.abs();
            }
            result.push(total);
        }
        Ok(result)
    }
}

impl<T: FloatOps> CompressedMatrix<T> for CsrMatrix<T> {
    type Mask = CsrMatrix<bool>;

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

    fn nan_mask(&self) -> anyhow::Result<CsrMatrix<bool>> {
        let flags: Vec<bool> = self.values().iter().map(|&v| Float::is_nan(v)).collect();
        let mask = CsrMatrix::try_from_pattern_and_values(self.pattern().clone(), flags)
            .map_err(|e| anyhow!("Failed to build NaN mask: {}", e))?;
        Ok(mask.filter(|_, _, &flag| flag))
    }

    fn flag_masked(&self, mask: &CsrMatrix<bool>) -> Vec<bool> {
        flag_lanes(
            self.row_offsets(),
            self.col_indices(),
            mask.row_offsets(),
            mask.col_indices(),
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
        for (row, row_vec) in self.row_iter().enumerate() {
            let weight = y[row];
            for (&col, &value) in row_vec.col_indices().iter().zip(row_vec.values().iter()) {
                out[col] += value * weight;
            }
        }
        out
    }
}

impl MaskMatrix for CsrMatrix<bool> {
    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    fn true_col(&self) -> Vec<usize> {
        let mut result = vec![0; self.ncols()];
        for (&col, &flag) in self.col_indices().iter().zip(self.values().iter()) {
            if flag {
                result[col] += 1;
            }
        }
        result
    }

    fn true_row(&self) -> Vec<usize> {
        let values = self.values();
        self.row_offsets()
            .windows(2)
            .map(|window| values[window[0]..window[1]].iter().filter(|&&f| f).count())
            .collect()
    }

    fn true_total(&self) -> usize {
        self.values().iter().filter(|&&f| f).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra_sparse::{CooMatrix, CsrMatrix};

    fn create_test_matrix() -> CsrMatrix<f64> {
        // 4x3 matrix:
        // [1 0 2]
        // [0 0 0]
        // [3 4 0]
        // [0 5 6]
        let mut coo = CooMatrix::new(4, 3);
        coo.push(0, 0, 1.0);
        coo.push(2, 0, 3.0);

        coo.push(2, 1, 4.0);
        coo.push(3, 1, 5.0);

        coo.push(0, 2, 2.0);
        coo.push(3, 2, 6.0);

        CsrMatrix::from(&coo)
    }

    #[test]
    fn test_nonzero_col() {
        let matrix = create_test_matrix();
        let result: Vec<u32> = matrix.nonzero_col().unwrap();
        assert_eq!(result, vec![2, 2, 2]);
    }

    #[test]
    fn test_nonzero_row() {
        let matrix = create_test_matrix();
        let result: Vec<u32> = matrix.nonzero_row().unwrap();
        assert_eq!(result, vec![2, 0, 2, 2]);
    }

    #[test]
    fn test_different_integer_types() {
        let matrix = create_test_matrix();

        let result_u8: Vec<u8> = matrix.nonzero_col().unwrap();
        assert_eq!(result_u8, vec![2, 2, 2]);

        let result_u64: Vec<u64> = matrix.nonzero_col().unwrap();
        assert_eq!(result_u64, vec![2, 2, 2]);
    }

    #[test]
    fn test_empty_matrix() {
        let matrix: CsrMatrix<f64> = CsrMatrix::zeros(0, 0);
        assert!(matrix.nonzero_col::<u32>().unwrap().is_empty());
        assert!(matrix.nonzero_row::<u32>().unwrap().is_empty());
        assert!(matrix.sum_col::<f64>().unwrap().is_empty());
        assert_eq!(matrix.sum_all::<f64>().unwrap(), 0.0);
    }

    #[test]
    fn test_sums() {
        let matrix = create_test_matrix();
        assert_eq!(matrix.sum_col::<f64>().unwrap(), vec![4.0, 9.0, 8.0]);
        assert_eq!(matrix.sum_row::<f64>().unwrap(), vec![3.0, 0.0, 7.0, 11.0]);
        assert_relative_eq!(matrix.sum_all::<f64>().unwrap(), 21.0);
    }

    #[test]
    fn test_abs_sums() {
        let coo = CooMatrix::try_from_triplets(
            2,
            2,
            vec![0, 1, 1],
            vec![0, 0, 1],
            vec![-1.0, 1.0, -4.0],
        )
        .unwrap();
        let matrix: CsrMatrix<f64> = (&coo).into();
        assert_eq!(matrix.abs_sum_col::<f64>().unwrap(), vec![2.0, 4.0]);
        assert_eq!(matrix.abs_sum_row::<f64>().unwrap(), vec![1.0, 5.0]);
    }

    #[test]
    fn test_nan_mask_and_flags() {
        let coo = CooMatrix::try_from_triplets(
            2,
            3,
            vec![0, 0, 1],
            vec![0, 2, 1],
            vec![f64::NAN, 1.0, f64::NAN],
        )
        .unwrap();
        let matrix: CsrMatrix<f64> = (&coo).into();
        let mask = matrix.nan_mask().unwrap();

        assert_eq!(mask.nnz(), 2);
        assert_eq!(mask.true_col(), vec![1, 1, 0]);
        assert_eq!(mask.true_row(), vec![1, 1]);
        assert_eq!(matrix.flag_masked(&mask), vec![true, false, true]);

        let cleaned = matrix.masked_zeroed(&mask);
        assert_eq!(cleaned.nnz(), 1);
        assert_eq!(cleaned.sum_all::<f64>().unwrap(), 1.0);
    }

    #[test]
    fn test_gram_matches_csc() {
        let matrix = create_test_matrix();
        let csc = nalgebra_sparse::CscMatrix::from(&matrix);
        assert_eq!(matrix.gram(), csc.gram());

        let y = ndarray::array![1.0, 1.0, 0.0, 2.0];
        assert_eq!(matrix.transpose_dot(y.view()).to_vec(), vec![1.0, 10.0, 14.0]);
    }

    #[test]
    fn test_large_sparse_matrix() {
        let mut coo = CooMatrix::new(1000, 1000);
        for i in 0..999 {
            coo.push(i, i, 1.0);
            coo.push(i + 1, i, 1.0);
        }

        let matrix = CsrMatrix::from(&coo);
        let result: Vec<u32> = matrix.nonzero_col().unwrap();
        assert_eq!(result.len(), 1000);
        assert_eq!(result[500], 2);
        assert_eq!(matrix.sum_row::<f64>().unwrap()[500], 2.0);
    }
}
