//! flowwatch entrypoint: load config and artifacts, then tail the sensor log
//! until interrupted, draining the final partial batch on the way out.

use anyhow::Context;
use flowwatch::{
    artifacts::LabelEncoder,
    config::EngineConfig,
    engine::Engine,
    features::FeatureDeriver,
    logging::StructuredLogger,
    model::ModelAdapter,
    sink::PredictionSink,
    tailer::EveTailer,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("FLOWWATCH_CONFIG_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let config = EngineConfig::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    StructuredLogger::init(&config.log);

    info!(
        config = %config_path.display(),
        backend = ?config.model.backend,
        batch_size = config.batch_size,
        "flowwatch starting"
    );
    if !config_path.exists() {
        warn!(path = %config_path.display(), "config file not found, using defaults");
    }

    let service_encoder =
        LabelEncoder::load(&config.model.service_encoder_path).context("loading service encoder")?;
    let flag_encoder =
        LabelEncoder::load(&config.model.flag_encoder_path).context("loading flag encoder")?;
    let adapter = ModelAdapter::load(&config.model).context("loading model artifacts")?;
    let deriver = FeatureDeriver::new(config.features.clone(), service_encoder, flag_encoder)
        .context("building feature deriver")?;
    let sink = PredictionSink::open(&config.output_path)
        .with_context(|| format!("opening output log {}", config.output_path.display()))?;
    let mut tailer = EveTailer::open(&config.eve_path)
        .with_context(|| format!("opening event source {}", config.eve_path.display()))?;

    static STOP: AtomicBool = AtomicBool::new(false);
    ctrlc::set_handler(|| STOP.store(true, Ordering::Relaxed))
        .context("installing shutdown handler")?;

    let mut engine = Engine::new(
        deriver,
        config.batch_size,
        adapter,
        sink,
        config.log.stats_every_lines,
    );
    engine.run(&mut tailer, &STOP, &config.tailer)?;

    info!("flowwatch stopped");
    Ok(())
}
