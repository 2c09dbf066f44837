//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::OrchestratorConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `api.api_key`.
pub const API_KEY_ENV_VAR: &str = "ESCROW_API_KEY";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<OrchestratorConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text, applying env overrides.
pub fn parse_config(content: &str) -> Result<OrchestratorConfig, ConfigError> {
    let mut config: OrchestratorConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    apply_env_overrides(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides to a configuration.
///
/// The API key is read from `ESCROW_API_KEY` when set and non-empty.
pub fn apply_env_overrides(config: &mut OrchestratorConfig) {
    if let Ok(key) = std::env::var(API_KEY_ENV_VAR) {
        if !key.is_empty() {
            config.api.api_key = key;
        }
    }
}
