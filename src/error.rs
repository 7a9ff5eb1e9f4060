//! Engine error taxonomy. Startup failures abort the process; ingestion and
//! inference failures are routed to skip/drop policies by the engine loop.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("artifact {}: {reason}", .path.display())]
    Artifact { path: PathBuf, reason: String },

    #[error("onnx runtime: {0}")]
    Onnx(#[from] ort::Error),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl Error {
    /// Artifact-load failure tied to the file that caused it.
    pub fn artifact(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Artifact {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
