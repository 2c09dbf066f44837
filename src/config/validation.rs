//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, URLs parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: OrchestratorConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::OrchestratorConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration.
pub fn validate_config(config: &OrchestratorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.api.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "api.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("api.base_url", e.to_string())),
    }

    if config.api.request_timeout_secs == 0 {
        errors.push(ValidationError::new("api.request_timeout_secs", "must be greater than 0"));
    }

    if config.network.passphrase.trim().is_empty() {
        errors.push(ValidationError::new("network.passphrase", "must not be empty"));
    }

    if config.wallet.storage_key.trim().is_empty() {
        errors.push(ValidationError::new("wallet.storage_key", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
