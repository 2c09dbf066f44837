//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber once per process
//! - Take the filter from `RUST_LOG` when present, else from config

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed.
pub fn init(config: &ObservabilityConfig) -> bool {
    tracing_subscriber::registry()
        .with(filter(config))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

fn filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
