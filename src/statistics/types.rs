use anyhow::anyhow;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Result of reducing a matrix along an [`Axis`](crate::Axis).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reduction<T> {
    /// Whole-matrix reduction.
    Scalar(T),
    /// One value per column or per row.
    Lanes(Array1<T>),
}

impl<T: Copy> Reduction<T> {
    pub fn into_scalar(self) -> Option<T> {
        match self {
            Reduction::Scalar(v) => Some(v),
            Reduction::Lanes(_) => None,
        }
    }

    pub fn into_lanes(self) -> Option<Array1<T>> {
        match self {
            Reduction::Scalar(_) => None,
            Reduction::Lanes(values) => Some(values),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Reduction::Scalar(_) => 1,
            Reduction::Lanes(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values in lane order; a scalar becomes a single element.
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            Reduction::Scalar(v) => vec![*v],
            Reduction::Lanes(values) => values.to_vec(),
        }
    }

    pub fn map<U, F>(&self, f: F) -> Reduction<U>
    where
        F: Fn(T) -> U,
    {
        match self {
            Reduction::Scalar(v) => Reduction::Scalar(f(*v)),
            Reduction::Lanes(values) => Reduction::Lanes(values.mapv(f)),
        }
    }

    /// Combines two reductions taken along the same axis.
    pub fn zip_with<U, V, F>(&self, other: &Reduction<U>, f: F) -> anyhow::Result<Reduction<V>>
    where
        U: Copy,
        F: Fn(T, U) -> V,
    {
        match (self, other) {
            (Reduction::Scalar(a), Reduction::Scalar(b)) => Ok(Reduction::Scalar(f(*a, *b))),
            (Reduction::Lanes(a), Reduction::Lanes(b)) if a.len() == b.len() => Ok(
                Reduction::Lanes(a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect()),
            ),
            _ => Err(anyhow!(
                "Cannot combine reductions of length {} and {}",
                self.len(),
                other.len()
            )),
        }
    }
}

/// Covariance or correlation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pairwise<T> {
    /// Square column-by-column matrix of `x` with itself.
    Auto(Array2<T>),
    /// One value per column of `x` against a target vector.
    Target(Array1<T>),
}

impl<T> Pairwise<T> {
    pub fn into_matrix(self) -> Option<Array2<T>> {
        match self {
            Pairwise::Auto(m) => Some(m),
            Pairwise::Target(_) => None,
        }
    }

    pub fn into_vector(self) -> Option<Array1<T>> {
        match self {
            Pairwise::Auto(_) => None,
            Pairwise::Target(v) => Some(v),
        }
    }
}

/// Non-fatal diagnostics attached to a computed statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advisory {
    /// `count` values of the result are NaN, usually from an empty lane or a
    /// NaN stored in the data. A validity mask is the usual remedy.
    NanInResult { count: usize },
    /// Masked entries were zeroed on a private copy of the matrix.
    SafeMaskingCopy,
}

/// A statistic together with the advisories raised while computing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Computed<V> {
    pub value: V,
    pub advisories: Vec<Advisory>,
}

impl<V> Computed<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            advisories: Vec::new(),
        }
    }

    pub fn with_advisories(value: V, advisories: Vec<Advisory>) -> Self {
        Self { value, advisories }
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn has_nan_advisory(&self) -> bool {
        self.advisories
            .iter()
            .any(|a| matches!(a, Advisory::NanInResult { .. }))
    }

    pub fn map<U, F: FnOnce(V) -> U>(self, f: F) -> Computed<U> {
        Computed {
            value: f(self.value),
            advisories: self.advisories,
        }
    }
}
