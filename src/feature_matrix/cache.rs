use std::collections::{HashMap, VecDeque};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::statistics::{Computed, Pairwise, Reduction};
use crate::Axis;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatOp {
    Mean,
    Variance,
    Covariance,
    Correlation,
}

/// Identifies a cached statistic by operation and arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatKey {
    pub op: StatOp,
    /// `None` for pairwise statistics, which are always column-by-column.
    pub axis: Option<Axis>,
    pub masked: bool,
    pub safe: bool,
}

impl StatKey {
    pub fn mean(axis: Axis, masked: bool, safe: bool) -> Self {
        Self {
            op: StatOp::Mean,
            axis: Some(axis),
            masked,
            safe,
        }
    }

    pub fn variance(axis: Axis, masked: bool, safe: bool) -> Self {
        Self {
            op: StatOp::Variance,
            axis: Some(axis),
            masked,
            safe,
        }
    }

    pub fn covariance(masked: bool) -> Self {
        Self {
            op: StatOp::Covariance,
            axis: None,
            masked,
            safe: false,
        }
    }

    pub fn correlation(masked: bool) -> Self {
        Self {
            op: StatOp::Correlation,
            axis: None,
            masked,
            safe: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CachedStat<T> {
    Reduction(Reduction<T>),
    Pairwise(Pairwise<T>),
}

impl<T> CachedStat<T> {
    pub fn into_reduction(self) -> Option<Reduction<T>> {
        match self {
            CachedStat::Reduction(r) => Some(r),
            CachedStat::Pairwise(_) => None,
        }
    }

    pub fn into_matrix(self) -> Option<Array2<T>> {
        match self {
            CachedStat::Pairwise(p) => p.into_matrix(),
            CachedStat::Reduction(_) => None,
        }
    }

    pub fn into_vector(self) -> Option<Array1<T>> {
        match self {
            CachedStat::Pairwise(p) => p.into_vector(),
            CachedStat::Reduction(_) => None,
        }
    }
}

/// Bounded map from [`StatKey`] to a computed statistic. When full, the oldest
/// entry is evicted. A capacity of zero disables caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatCache<T> {
    capacity: usize,
    order: VecDeque<StatKey>,
    entries: HashMap<StatKey, Computed<CachedStat<T>>>,
}

impl<T> Default for StatCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl<T> StatCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &StatKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &StatKey) -> Option<&Computed<CachedStat<T>>> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: StatKey, value: Computed<CachedStat<T>>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key, value).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn remove(&mut self, key: &StatKey) -> Option<Computed<CachedStat<T>>> {
        self.order.retain(|k| k != key);
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &StatKey> {
        self.order.iter()
    }
}
