//! Engine configuration. JSON file, one struct per concern; omitted
//! sections take their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::categories::FlagTable;
use crate::error::{Error, Result};
use crate::features::{EventFilter, FourthSlot};
use crate::model::Backend;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// EVE log to tail.
    pub eve_path: PathBuf,
    /// Prediction output log, appended as JSON lines.
    pub output_path: PathBuf,
    /// Items per inference batch.
    pub batch_size: usize,
    /// Model backend and artifact paths.
    pub model: ModelConfig,
    /// Feature derivation switches.
    pub features: FeatureConfig,
    /// Idle polling bounds.
    pub tailer: TailerConfig,
    /// Logging.
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub backend: Backend,
    /// Classifier (or sequence model) artifact.
    pub model_path: PathBuf,
    /// Embedding model artifact; required by the hybrid backend only.
    pub embedding_path: Option<PathBuf>,
    pub scaler_path: PathBuf,
    pub service_encoder_path: PathBuf,
    pub flag_encoder_path: PathBuf,
    /// Probability at or above which an item is labeled attack.
    pub threshold: f32,
    /// Intra-op threads per ONNX session.
    pub onnx_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub event_filter: EventFilter,
    pub flag_table: FlagTable,
    pub fourth_slot: FourthSlot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TailerConfig {
    /// Wait after an empty poll starts here and doubles while idle.
    pub poll_min_ms: u64,
    /// Idle wait ceiling.
    pub poll_max_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
    /// Counter snapshot cadence, in processed lines.
    pub stats_every_lines: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            eve_path: PathBuf::from("/var/log/suricata/eve.json"),
            output_path: PathBuf::from("predictions.log"),
            batch_size: 64,
            model: ModelConfig::default(),
            features: FeatureConfig::default(),
            tailer: TailerConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            model_path: PathBuf::from("models/model.onnx"),
            embedding_path: None,
            scaler_path: PathBuf::from("models/scaler.json"),
            service_encoder_path: PathBuf::from("models/service_encoder.json"),
            flag_encoder_path: PathBuf::from("models/flag_encoder.json"),
            threshold: 0.5,
            onnx_threads: 1,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            event_filter: EventFilter::default(),
            flag_table: FlagTable::default(),
            fourth_slot: FourthSlot::default(),
        }
    }
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            poll_min_ms: 50,
            poll_max_ms: 1000,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
            stats_every_lines: 10_000,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. A missing file yields defaults; an unreadable
    /// or invalid file is a startup error. Running on a half-understood
    /// config would score traffic with the wrong artifacts.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.model.threshold) {
            return Err(Error::Config("model.threshold must be within [0, 1]".into()));
        }
        if self.tailer.poll_min_ms == 0 || self.tailer.poll_max_ms < self.tailer.poll_min_ms {
            return Err(Error::Config(
                "tailer polling must satisfy 0 < poll_min_ms <= poll_max_ms".into(),
            ));
        }
        if matches!(self.model.backend, Backend::Hybrid) && self.model.embedding_path.is_none() {
            return Err(Error::Config(
                "hybrid backend requires model.embedding_path".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.model.threshold, 0.5);
        assert_eq!(config.features.flag_table, FlagTable::FlowAware);
        assert_eq!(config.features.fourth_slot, FourthSlot::DestBytes);
        assert_eq!(config.features.event_filter, EventFilter::FlowOnly);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let json = r#"{"batch_size": 16, "features": {"flag_table": "flags_only"}}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.features.flag_table, FlagTable::FlagsOnly);
        assert_eq!(config.features.fourth_slot, FourthSlot::DestBytes);
        assert_eq!(config.tailer.poll_min_ms, 50);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = EngineConfig {
            batch_size: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut config = EngineConfig::default();
        config.model.threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_poll_bounds_are_rejected() {
        let mut config = EngineConfig::default();
        config.tailer.poll_min_ms = 500;
        config.tailer.poll_max_ms = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn hybrid_backend_requires_embedding_path() {
        let mut config = EngineConfig::default();
        config.model.backend = Backend::Hybrid;
        assert!(config.validate().is_err());
        config.model.embedding_path = Some(PathBuf::from("models/embedding.onnx"));
        assert!(config.validate().is_ok());
    }
}
