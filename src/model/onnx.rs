//! ONNX Runtime plumbing: one loaded session per model artifact, dense f32
//! batch in, raw tensor out.

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

use crate::error::{Error, Result};

static ORT_INIT: OnceLock<()> = OnceLock::new();

fn ensure_runtime() -> Result<()> {
    if ORT_INIT.get().is_none() {
        ort::init().commit()?;
        let _ = ORT_INIT.set(());
    }
    Ok(())
}

/// One loaded ONNX session. Input is a dense f32 tensor whose leading
/// dimension is the batch.
pub struct OnnxModel {
    session: Session,
    input_name: String,
    name: String,
}

impl OnnxModel {
    /// Load a session from disk. A missing or unreadable artifact is fatal.
    pub fn load(path: &Path, name: &str, intra_threads: usize) -> Result<Self> {
        ensure_runtime()?;
        if !path.exists() {
            return Err(Error::artifact(path, "model file not found"));
        }
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads.max(1))?
            .commit_from_file(path)
            .map_err(|e| Error::artifact(path, e.to_string()))?;
        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());
        info!(
            model = name,
            path = %path.display(),
            input = %input_name,
            "onnx session loaded"
        );
        Ok(Self {
            session,
            input_name,
            name: name.to_string(),
        })
    }

    /// Run the session over row-major f32 data. `shape` must multiply out to
    /// `data.len()`. The first f32 tensor output is returned; integer label
    /// outputs from sklearn-style exports are skipped. Graphs exporting
    /// probabilities as a sequence of maps (zipmap) have no f32 tensor output
    /// and are rejected.
    pub fn run(&mut self, shape: Vec<i64>, data: Vec<f32>) -> Result<ModelOutput> {
        let input = Tensor::from_array((shape, data))
            .map_err(|e| Error::Inference(format!("{}: building input tensor: {e}", self.name)))?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| Error::Inference(format!("{}: {e}", self.name)))?;

        for (output_name, value) in outputs.iter() {
            if output_name.contains("label") {
                continue;
            }
            if let Ok((tensor_shape, tensor_data)) = value.try_extract_tensor::<f32>() {
                return Ok(ModelOutput {
                    shape: tensor_shape.iter().copied().collect(),
                    data: tensor_data.to_vec(),
                });
            }
        }
        Err(Error::Inference(format!(
            "{}: no f32 tensor output (re-export the model with zipmap disabled)",
            self.name
        )))
    }
}

/// Raw tensor read back from a session run.
#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub shape: Vec<i64>,
    pub data: Vec<f32>,
}

impl ModelOutput {
    /// Interpret this output as one probability per input row, clamped to
    /// `[0, 1]`. Accepts `[n]`, `[n, 1]` and `[n, 2]`; for the two-column
    /// binary shape the class-1 column is taken.
    pub fn probabilities(&self, rows: usize) -> Result<Vec<f32>> {
        let n = rows as i64;
        let values: Vec<f32> = match self.shape.as_slice() {
            [len] if *len == n => self.data.clone(),
            [len, 1] if *len == n => self.data.clone(),
            [len, 2] if *len == n => self.data.iter().skip(1).step_by(2).copied().collect(),
            other => {
                return Err(Error::Inference(format!(
                    "unexpected output shape {other:?} for {rows} rows"
                )))
            }
        };
        Ok(values.into_iter().map(|p| p.clamp(0.0, 1.0)).collect())
    }
}
