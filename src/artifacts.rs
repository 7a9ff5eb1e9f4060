//! Artifacts produced by the offline training pipeline: the fitted feature
//! scaler and the categorical encoders. Small JSON files, loaded once at
//! startup; any load or shape problem there is fatal.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::features::FEATURE_WIDTH;

/// Per-column standardization fitted offline: `(x - mean) / scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl StandardScaler {
    /// Load and validate against the engine's feature width. Zero or
    /// non-finite scale entries would poison every batch, so they are
    /// rejected here.
    pub fn load(path: &Path) -> Result<Self> {
        let scaler: Self = read_json(path)?;
        if scaler.mean.len() != FEATURE_WIDTH || scaler.scale.len() != FEATURE_WIDTH {
            return Err(Error::artifact(
                path,
                format!(
                    "expected {FEATURE_WIDTH} columns, got mean={} scale={}",
                    scaler.mean.len(),
                    scaler.scale.len()
                ),
            ));
        }
        if scaler.mean.iter().any(|m| !m.is_finite()) {
            return Err(Error::artifact(path, "mean entries must be finite"));
        }
        if scaler.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err(Error::artifact(path, "scale entries must be finite and non-zero"));
        }
        info!(path = %path.display(), "scaler loaded");
        Ok(scaler)
    }

    /// Standardize a batch matrix in place, row by row.
    pub fn transform_batch(&self, batch: &mut Array2<f32>) {
        debug_assert_eq!(batch.ncols(), self.mean.len());
        for mut row in batch.rows_mut() {
            for (value, (mean, scale)) in row.iter_mut().zip(self.mean.iter().zip(&self.scale)) {
                *value = (*value - mean) / scale;
            }
        }
    }
}

/// Closed-set categorical encoder: the trained class list, code = index.
/// Mirrors a fitted sklearn `LabelEncoder` exported as its sorted
/// `classes_` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn load(path: &Path) -> Result<Self> {
        let encoder: Self = read_json(path)?;
        if encoder.classes.is_empty() {
            return Err(Error::artifact(path, "empty class list"));
        }
        info!(path = %path.display(), classes = encoder.classes.len(), "encoder loaded");
        Ok(encoder)
    }

    /// Code for a token, if it is in the trained vocabulary.
    pub fn code_of(&self, token: &str) -> Option<u32> {
        self.classes.iter().position(|c| c == token).map(|i| i as u32)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path).map_err(|e| Error::artifact(path, e.to_string()))?;
    serde_json::from_str(&data).map_err(|e| Error::artifact(path, e.to_string()))
}
