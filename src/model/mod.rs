//! Model adapter: one predict contract over three backend shapes.

mod onnx;

pub use onnx::{ModelOutput, OnnxModel};

use chrono::{DateTime, Utc};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::artifacts::StandardScaler;
use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::features::{BatchItem, DerivedFeature, Metadata, FEATURE_WIDTH};

/// Backend shape selected by configuration. Artifacts are trained per
/// backend and are not interchangeable across shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Standardize, then run a probabilistic classifier.
    #[default]
    Tabular,
    /// Standardize, run an embedding model, flatten, then classify.
    Hybrid,
    /// Reshape raw rows to length-4 sequences for a sequence model.
    Sequence,
}

/// Scored output for one batch item. Only the adapter mints these; the sink
/// writes them out verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    /// 1 for attack, 0 for normal.
    #[serde(rename = "prediction")]
    pub label: u8,
    pub probability: f32,
    pub features: DerivedFeature,
    pub metadata: Metadata,
}

impl PredictionRecord {
    /// Stamp a fresh record with its identifier and scoring time.
    pub fn new(label: u8, probability: f32, features: DerivedFeature, metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            ts: Utc::now(),
            label,
            probability,
            features,
            metadata,
        }
    }
}

/// The engine's seam to a scoring backend: one synchronous call per batch.
/// Records come back in input order; items the backend cannot shape are
/// dropped (and logged), never substituted.
pub trait FlowClassifier {
    fn predict(&mut self, batch: Vec<BatchItem>) -> Result<Vec<PredictionRecord>>;
}

enum BackendPipeline {
    Tabular { model: OnnxModel },
    Hybrid { embedding: OnnxModel, classifier: OnnxModel },
    Sequence { model: OnnxModel },
}

/// Owns the loaded sessions and the scaler, applies per-backend batch
/// preprocessing, and turns probabilities into records.
pub struct ModelAdapter {
    pipeline: BackendPipeline,
    scaler: StandardScaler,
    threshold: f32,
}

impl ModelAdapter {
    /// Load every artifact the configured backend needs. Any failure is a
    /// startup error.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let scaler = StandardScaler::load(&config.scaler_path)?;
        let pipeline = match config.backend {
            Backend::Tabular => BackendPipeline::Tabular {
                model: OnnxModel::load(&config.model_path, "classifier", config.onnx_threads)?,
            },
            Backend::Hybrid => {
                let embedding_path = config.embedding_path.as_deref().ok_or_else(|| {
                    Error::Config("hybrid backend requires model.embedding_path".into())
                })?;
                BackendPipeline::Hybrid {
                    embedding: OnnxModel::load(embedding_path, "embedding", config.onnx_threads)?,
                    classifier: OnnxModel::load(&config.model_path, "classifier", config.onnx_threads)?,
                }
            }
            Backend::Sequence => BackendPipeline::Sequence {
                model: OnnxModel::load(&config.model_path, "sequence", config.onnx_threads)?,
            },
        };
        if !matches!(config.backend, Backend::Hybrid) {
            if let Some(path) = config.embedding_path.as_deref() {
                warn!(path = %path.display(), "embedding_path is ignored by this backend");
            }
        }
        info!(
            backend = ?config.backend,
            threshold = config.threshold,
            "model adapter ready"
        );
        Ok(Self {
            pipeline,
            scaler,
            threshold: config.threshold,
        })
    }
}

impl FlowClassifier for ModelAdapter {
    fn predict(&mut self, batch: Vec<BatchItem>) -> Result<Vec<PredictionRecord>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let n = batch.len();
        let mut flat = Vec::with_capacity(n * FEATURE_WIDTH);
        for item in &batch {
            flat.extend_from_slice(&item.features.to_vector());
        }
        let mut matrix = Array2::from_shape_vec((n, FEATURE_WIDTH), flat)
            .map_err(|e| Error::Inference(format!("batch matrix: {e}")))?;

        // The sequence backend consumes raw feature values; the other two
        // standardize first.
        if matches!(
            self.pipeline,
            BackendPipeline::Tabular { .. } | BackendPipeline::Hybrid { .. }
        ) {
            self.scaler.transform_batch(&mut matrix);
        }

        // Per-item drop: rows the backend cannot take lose their item, the
        // rest of the batch proceeds.
        let keep: Vec<usize> = matrix
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|v| v.is_finite()))
            .map(|(index, _)| index)
            .collect();
        if keep.len() < n {
            for (index, item) in batch.iter().enumerate() {
                if !keep.contains(&index) {
                    warn!(
                        src_ip = %item.metadata.src_ip,
                        service = %item.metadata.service,
                        "dropping item with non-finite preprocessed features"
                    );
                }
            }
        }
        if keep.is_empty() {
            return Ok(Vec::new());
        }
        let rows = keep.len();
        let data = if rows == n {
            matrix.into_raw_vec()
        } else {
            matrix.select(Axis(0), &keep).into_raw_vec()
        };

        let probabilities = match &mut self.pipeline {
            BackendPipeline::Tabular { model } => {
                let output = model.run(vec![rows as i64, FEATURE_WIDTH as i64], data)?;
                output.probabilities(rows)?
            }
            BackendPipeline::Hybrid { embedding, classifier } => {
                let embedded = embedding.run(vec![rows as i64, FEATURE_WIDTH as i64, 1], data)?;
                if embedded.data.is_empty() || embedded.data.len() % rows != 0 {
                    return Err(Error::Inference(format!(
                        "embedding output of {} values does not divide into {rows} rows",
                        embedded.data.len()
                    )));
                }
                let width = embedded.data.len() / rows;
                let output = classifier.run(vec![rows as i64, width as i64], embedded.data)?;
                output.probabilities(rows)?
            }
            BackendPipeline::Sequence { model } => {
                let output = model.run(vec![rows as i64, FEATURE_WIDTH as i64, 1], data)?;
                output.probabilities(rows)?
            }
        };

        let mut keep_iter = keep.iter().copied().peekable();
        let mut slot = 0;
        let mut records = Vec::with_capacity(rows);
        for (index, item) in batch.into_iter().enumerate() {
            if keep_iter.peek() == Some(&index) {
                keep_iter.next();
                let probability = probabilities[slot];
                let label = u8::from(probability >= self.threshold);
                records.push(PredictionRecord::new(
                    label,
                    probability,
                    item.features,
                    item.metadata,
                ));
                slot += 1;
            }
        }
        Ok(records)
    }
}
