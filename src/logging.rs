//! Structured logging to stdout: JSON lines for ingestion, plain text for a
//! terminal. Prediction records never go through here; the sink owns those.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

pub struct StructuredLogger;

impl StructuredLogger {
    /// Install the global subscriber. Level comes from `RUST_LOG` when set,
    /// otherwise from the config.
    pub fn init(config: &LogConfig) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
        if config.json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stdout),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
                .init();
        }
    }
}
