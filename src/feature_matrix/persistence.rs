//! Binary persistence for [`FeatureMatrix`].
//!
//! A blob is a postcard-encoded [`BlobHeader`] followed by the postcard-encoded
//! matrix, mask, column labels and statistics cache.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::FeatureMatrix;
use crate::error::StatsError;
use crate::masking::check_mask_shape;
use crate::FloatOps;

pub const FEATURE_MATRIX_KIND: &str = "spartans.FeatureMatrix";
const FORMAT_VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct BlobHeader {
    kind: String,
    version: u16,
}

impl<T> FeatureMatrix<T>
where
    T: FloatOps + Serialize + for<'de> Deserialize<'de>,
{
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let header = BlobHeader {
            kind: FEATURE_MATRIX_KIND.to_string(),
            version: FORMAT_VERSION,
        };
        let mut bytes = postcard::to_allocvec(&header).context("Failed to encode header")?;
        bytes.extend(postcard::to_allocvec(self).context("Failed to encode feature matrix")?);
        Ok(bytes)
    }

    /// Decodes a blob written by [`FeatureMatrix::to_bytes`]. With `validate`,
    /// a blob tagged as anything but a feature matrix is rejected before its
    /// payload is read.
    pub fn from_bytes(bytes: &[u8], validate: bool) -> anyhow::Result<Self> {
        let (header, payload): (BlobHeader, &[u8]) =
            postcard::take_from_bytes(bytes).context("Failed to decode header")?;
        debug!("Decoding {} v{} ({} bytes)", header.kind, header.version, payload.len());

        if validate && header.kind != FEATURE_MATRIX_KIND {
            return Err(StatsError::NotAFeatureMatrix { found: header.kind }.into());
        }
        if header.version > FORMAT_VERSION {
            return Err(anyhow!(
                "Unsupported format version {} (newest known is {})",
                header.version,
                FORMAT_VERSION
            ));
        }

        let fm: Self = postcard::from_bytes(payload).context("Failed to decode feature matrix")?;
        if validate && fm.columns.len() != fm.matrix.ncols() {
            return Err(StatsError::ColumnCountMismatch {
                expected: fm.matrix.ncols(),
                found: fm.columns.len(),
            }
            .into());
        }
        if validate {
            if let Some(mask) = &fm.mask {
                check_mask_shape((fm.matrix.nrows(), fm.matrix.ncols()), mask)?;
            }
        }
        Ok(fm)
    }

    pub fn dump<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        fs::write(path, &bytes)
            .with_context(|| format!("Failed to write feature matrix to {}", path.display()))?;
        info!("Saved {:?} feature matrix to {}", self.shape(), path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P, validate: bool) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read feature matrix from {}", path.display()))?;
        Self::from_bytes(&bytes, validate)
    }
}
