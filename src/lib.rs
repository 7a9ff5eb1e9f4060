//! flowwatch — real-time network flow classification over a Suricata EVE log.
//!
//! Modular structure:
//! - [`tailer`] — EVE record types and the end-seeking log tailer
//! - [`categories`] — port-to-service and TCP flag decision tables
//! - [`features`] — per-event feature derivation and source aggregates
//! - [`batch`] — bounded accumulation between inference dispatches
//! - [`artifacts`] — trained scaler and categorical encoder artifacts
//! - [`model`] — the three-backend model adapter over ONNX sessions
//! - [`sink`] — append-only prediction record log
//! - [`engine`] — the pipeline loop tying the stages together

pub mod artifacts;
pub mod batch;
pub mod categories;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod sink;
pub mod tailer;

pub use batch::BatchAccumulator;
pub use config::EngineConfig;
pub use engine::{Engine, PipelineStats};
pub use error::{Error, Result};
pub use features::{BatchItem, DerivedFeature, FeatureDeriver, Metadata};
pub use logging::StructuredLogger;
pub use model::{FlowClassifier, ModelAdapter, PredictionRecord};
pub use sink::PredictionSink;
pub use tailer::{EveTailer, FlowEvent};
