//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, ESCROW_API_KEY override)
//!     → validation.rs (semantic checks)
//!     → OrchestratorConfig (validated, immutable)
//!     → handed to the API client, session manager and orchestrator
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The API key never appears in Debug output or logs

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ApiConfig;
pub use schema::NetworkConfig;
pub use schema::ObservabilityConfig;
pub use schema::OrchestratorConfig;
pub use schema::WalletConfig;
