//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! API client, session manager, orchestrator produce:
//!     → logging.rs (structured log events, one span per orchestration)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stderr via tracing-subscriber fmt layer
//!     → whatever `metrics` recorder the host installs
//! ```
//!
//! # Design Decisions
//! - Keys, API secrets and full envelopes are never logged
//! - The library installs no metrics exporter; the host decides

pub mod logging;
pub mod metrics;

use crate::config::ObservabilityConfig;

/// Initialize logging and metrics switches from config.
pub fn init(config: &ObservabilityConfig) {
    metrics::set_enabled(config.metrics_enabled);
    if !logging::init(config) {
        tracing::debug!("Tracing subscriber already installed");
    }
}
