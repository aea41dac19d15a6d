//! Fixtures and dense reference computations shared by the unit tests.

use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};
use ndarray::{array, Array1, Array2, ArrayView1, Axis as NdAxis};

/// 7x4 matrix with an all-zero third column and an all-zero fifth row.
pub fn example_dense() -> Array2<f64> {
    array![
        [1.0, -2.0, 0.0, 50.0],
        [0.0, 0.0, 0.0, 100.0],
        [1.0, 0.0, 0.0, 80.0],
        [1.0, 4.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0],
        [0.0, 4.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, -50.0],
    ]
}

pub fn example_target() -> Array1<f64> {
    array![1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0]
}

fn coo_from_dense(dense: &Array2<f64>) -> CooMatrix<f64> {
    let mut coo = CooMatrix::new(dense.nrows(), dense.ncols());
    for ((i, j), &v) in dense.indexed_iter() {
        if v != 0.0 {
            coo.push(i, j, v);
        }
    }
    coo
}

pub fn csc_from_dense(dense: &Array2<f64>) -> CscMatrix<f64> {
    CscMatrix::from(&coo_from_dense(dense))
}

pub fn csr_from_dense(dense: &Array2<f64>) -> CsrMatrix<f64> {
    CsrMatrix::from(&coo_from_dense(dense))
}

/// Population covariance (ddof = 0) of the columns of `a` against the columns of `b`.
pub fn dense_cross_cov(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    let n = a.nrows() as f64;
    let ca = a - &a.mean_axis(NdAxis(0)).unwrap();
    let cb = b - &b.mean_axis(NdAxis(0)).unwrap();
    ca.t().dot(&cb) / n
}

pub fn dense_cov(a: &Array2<f64>) -> Array2<f64> {
    dense_cross_cov(a, a)
}

pub fn dense_corr(a: &Array2<f64>) -> Array2<f64> {
    let cov = dense_cov(a);
    let sd = cov.diag().mapv(f64::sqrt);
    let mut corr = cov.clone();
    for ((i, j), v) in corr.indexed_iter_mut() {
        *v /= sd[i] * sd[j];
    }
    corr
}

pub fn dense_corr_target(a: &Array2<f64>, y: ArrayView1<f64>) -> Array1<f64> {
    let y2 = y.to_owned().insert_axis(NdAxis(1));
    let cov = dense_cross_cov(a, &y2).column(0).to_owned();
    let var_x = a.var_axis(NdAxis(0), 0.0);
    let var_y = y.var(0.0);
    Array1::from_iter(
        cov.iter()
            .zip(var_x.iter())
            .map(|(&c, &vx)| c / (vx * var_y).sqrt()),
    )
}

/// Element-wise closeness where NaN matches NaN.
pub fn all_close_nan(a: &[f64], b: &[f64], tol: f64) -> bool {
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|(&x, &y)| {
            (x.is_nan() && y.is_nan()) || (x - y).abs() <= tol * (1.0 + y.abs())
        })
}
