//! # Feature matrix
//!
//! [`FeatureMatrix`] bundles a CSC data matrix with an optional validity mask,
//! one label per column, and a bounded cache of computed statistics. The
//! statistics delegate to the free functions in [`crate::statistics`], using the
//! stored mask unless the caller opts out. Replacing the mask or cleaning the
//! matrix clears the cache.

mod cache;
mod persistence;

pub use cache::{CachedStat, StatCache, StatKey, StatOp, DEFAULT_CACHE_CAPACITY};
pub use persistence::FEATURE_MATRIX_KIND;

use anyhow::anyhow;
use log::{debug, info};
use nalgebra_sparse::CscMatrix;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::indexing::Selection;
use crate::masking::{check_mask_shape, make_nan_mask};
use crate::sparse::CompressedMatrix;
use crate::statistics::{self, axis_sum, Computed, Pairwise, Reduction};
use crate::{Axis, FloatOps};

pub struct FeatureMatrixBuilder<T> {
    matrix: CscMatrix<T>,
    columns: Option<Vec<String>>,
    mask: Option<CscMatrix<bool>>,
    cache_capacity: usize,
}

impl<T: FloatOps> FeatureMatrixBuilder<T> {
    pub fn new(matrix: CscMatrix<T>) -> Self {
        Self {
            matrix,
            columns: None,
            mask: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Column labels, one per column. Defaults to `f0, f1, …`.
    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn mask(mut self, mask: CscMatrix<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn build(self) -> anyhow::Result<FeatureMatrix<T>> {
        let ncols = self.matrix.ncols();
        let columns = match self.columns {
            Some(columns) if columns.len() != ncols => {
                return Err(StatsError::ColumnCountMismatch {
                    expected: ncols,
                    found: columns.len(),
                }
                .into());
            }
            Some(columns) => columns,
            None => (0..ncols).map(|i| format!("f{}", i)).collect(),
        };
        if let Some(mask) = &self.mask {
            check_mask_shape((self.matrix.nrows(), ncols), mask)?;
        }

        Ok(FeatureMatrix {
            matrix: self.matrix,
            mask: self.mask,
            columns,
            cache: StatCache::new(self.cache_capacity),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: FloatOps + Serialize",
    deserialize = "T: FloatOps + Deserialize<'de>"
))]
pub struct FeatureMatrix<T> {
    matrix: CscMatrix<T>,
    mask: Option<CscMatrix<bool>>,
    columns: Vec<String>,
    cache: StatCache<T>,
}

impl<T: FloatOps> FeatureMatrix<T> {
    pub fn new(matrix: CscMatrix<T>) -> Self {
        let columns = (0..matrix.ncols()).map(|i| format!("f{}", i)).collect();
        Self {
            matrix,
            mask: None,
            columns,
            cache: StatCache::default(),
        }
    }

    pub fn builder(matrix: CscMatrix<T>) -> FeatureMatrixBuilder<T> {
        FeatureMatrixBuilder::new(matrix)
    }

    pub fn matrix(&self) -> &CscMatrix<T> {
        &self.matrix
    }

    pub fn into_matrix(self) -> CscMatrix<T> {
        self.matrix
    }

    pub fn mask(&self) -> Option<&CscMatrix<bool>> {
        self.mask.as_ref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn cache(&self) -> &StatCache<T> {
        &self.cache
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.matrix.nrows(), self.matrix.ncols())
    }

    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// Fraction of entries explicitly stored.
    pub fn density(&self) -> f64 {
        statistics::density(&self.matrix)
    }

    pub fn sum(&self, axis: Axis) -> anyhow::Result<Reduction<T>> {
        axis_sum(&self.matrix, axis)
    }

    /// Labels of the selected columns.
    pub fn names_of(&self, selection: &Selection) -> Vec<&str> {
        match selection {
            Selection::Flags(flags) => self
                .columns
                .iter()
                .zip(flags.iter())
                .filter(|(_, &selected)| selected)
                .map(|(name, _)| name.as_str())
                .collect(),
            Selection::Positions(positions) => positions
                .iter()
                .filter_map(|&i| self.columns.get(i).map(String::as_str))
                .collect(),
        }
    }

    /// Replaces the mask wholesale. `None` removes it.
    pub fn set_mask(&mut self, mask: Option<CscMatrix<bool>>) -> anyhow::Result<()> {
        if let Some(mask) = &mask {
            check_mask_shape(self.shape(), mask)?;
        }
        self.mask = mask;
        self.cache.clear();
        info!(
            "Mask {} on {:?} feature matrix",
            if self.mask.is_some() { "set" } else { "removed" },
            self.shape()
        );
        Ok(())
    }

    /// Installs a mask flagging every stored NaN.
    pub fn make_nan_mask(&mut self) -> anyhow::Result<()> {
        let mask = make_nan_mask(&self.matrix)?;
        self.set_mask(Some(mask))
    }

    /// Zeroes every masked entry of the stored matrix in place and drops the
    /// zeros. Destructive. Returns `false` when there is no mask.
    pub fn eliminate_nans(&mut self) -> bool {
        let Some(mask) = &self.mask else {
            info!("No mask found, nothing to eliminate");
            return false;
        };
        let before = self.matrix.nnz();
        let flags = self.matrix.flag_masked(mask);
        self.matrix.zero_flagged(&flags);
        self.matrix = self.matrix.compacted();
        self.cache.clear();
        info!(
            "Eliminated {} masked entries",
            before - self.matrix.nnz()
        );
        true
    }

    /// Drops one cached statistic, or all of them with `None`.
    pub fn clear_cache(&mut self, key: Option<&StatKey>) {
        match key {
            Some(key) => {
                self.cache.remove(key);
            }
            None => self.cache.clear(),
        }
    }

    /// Column subsets would need the labels and mask re-indexed alongside the
    /// matrix, which is not supported.
    pub fn slice_columns(&self, _columns: &[usize]) -> anyhow::Result<Self> {
        Err(StatsError::NotImplemented("Column slicing of a FeatureMatrix").into())
    }

    fn active_mask(&self, use_mask: bool) -> Option<&CscMatrix<bool>> {
        if use_mask {
            self.mask.as_ref()
        } else {
            None
        }
    }

    fn memoized<F>(&mut self, key: StatKey, compute: F) -> anyhow::Result<Computed<CachedStat<T>>>
    where
        F: FnOnce(&CscMatrix<T>, Option<&CscMatrix<bool>>) -> anyhow::Result<Computed<CachedStat<T>>>,
    {
        if let Some(hit) = self.cache.get(&key) {
            debug!("Cache hit for {:?}", key);
            return Ok(hit.clone());
        }
        let computed = compute(&self.matrix, self.active_mask(key.masked))?;
        self.cache.insert(key, computed.clone());
        Ok(computed)
    }

    fn memoized_reduction<F>(
        &mut self,
        key: StatKey,
        compute: F,
    ) -> anyhow::Result<Computed<Reduction<T>>>
    where
        F: FnOnce(&CscMatrix<T>, Option<&CscMatrix<bool>>) -> anyhow::Result<Computed<Reduction<T>>>,
    {
        let computed = self.memoized(key, |x, mask| Ok(compute(x, mask)?.map(CachedStat::Reduction)))?;
        let value = computed
            .value
            .into_reduction()
            .ok_or_else(|| anyhow!("Cached entry for {:?} is not a reduction", key))?;
        Ok(Computed::with_advisories(value, computed.advisories))
    }

    fn memoized_matrix<F>(&mut self, key: StatKey, compute: F) -> anyhow::Result<Computed<Array2<T>>>
    where
        F: FnOnce(&CscMatrix<T>, Option<&CscMatrix<bool>>) -> anyhow::Result<Computed<Pairwise<T>>>,
    {
        let computed = self.memoized(key, |x, mask| Ok(compute(x, mask)?.map(CachedStat::Pairwise)))?;
        let value = computed
            .value
            .into_matrix()
            .ok_or_else(|| anyhow!("Cached entry for {:?} is not a matrix", key))?;
        Ok(Computed::with_advisories(value, computed.advisories))
    }

    pub fn mean(
        &mut self,
        axis: Axis,
        use_mask: bool,
        safe: bool,
    ) -> anyhow::Result<Computed<Reduction<T>>> {
        let key = StatKey::mean(axis, use_mask && self.mask.is_some(), safe);
        self.memoized_reduction(key, |x, mask| statistics::mean(x, axis, mask, safe))
    }

    pub fn variance(
        &mut self,
        axis: Axis,
        use_mask: bool,
        safe: bool,
    ) -> anyhow::Result<Computed<Reduction<T>>> {
        let key = StatKey::variance(axis, use_mask && self.mask.is_some(), safe);
        self.memoized_reduction(key, |x, mask| statistics::variance(x, axis, mask, safe))
    }

    pub fn covariance(&mut self, use_mask: bool) -> anyhow::Result<Computed<Array2<T>>> {
        let key = StatKey::covariance(use_mask && self.mask.is_some());
        self.memoized_matrix(key, |x, mask| statistics::covariance(x, None, mask, 1))
    }

    pub fn correlation(&mut self, use_mask: bool) -> anyhow::Result<Computed<Array2<T>>> {
        let key = StatKey::correlation(use_mask && self.mask.is_some());
        self.memoized_matrix(key, |x, mask| statistics::correlation(x, None, mask))
    }

    /// Correlation of every column with `target`. Not cached.
    pub fn correlation_with(
        &self,
        target: ArrayView1<T>,
        use_mask: bool,
    ) -> anyhow::Result<Computed<Array1<T>>> {
        let computed =
            statistics::correlation(&self.matrix, Some(target), self.active_mask(use_mask))?;
        let value = computed
            .value
            .into_vector()
            .ok_or_else(|| anyhow!("Target correlation must be one value per column"))?;
        Ok(Computed::with_advisories(value, computed.advisories))
    }
}
