//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! orchestrator. All types derive Serde traits for deserialization from
//! config files, and every section has defaults so minimal files work.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::blockchain::NetworkPassphrase;
use crate::wallet::BackendKind;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Escrow API endpoint and credentials.
    pub api: ApiConfig,

    /// Target network.
    pub network: NetworkConfig,

    /// Wallet session settings.
    pub wallet: WalletConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Escrow API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the escrow service.
    pub base_url: String,

    /// Static API key. Overridden by `ESCROW_API_KEY`.
    pub api_key: String,

    /// Total time allowed per request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dev.api.trustlesswork.com".to_string(),
            api_key: String::new(),
            request_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Network selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Network passphrase envelopes and signatures must target.
    pub passphrase: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            passphrase: NetworkPassphrase::testnet().as_str().to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn passphrase(&self) -> NetworkPassphrase {
        NetworkPassphrase::new(self.passphrase.clone())
    }
}

/// Wallet session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Backend assumed for a restored session when storage does not
    /// record one.
    pub default_backend: BackendKind,

    /// Maximum wait for a wallet connection, in seconds (0 = unbounded).
    pub connect_timeout_secs: u64,

    /// Maximum wait for a signature, in seconds (0 = unbounded).
    pub sign_timeout_secs: u64,

    /// Session storage key holding the connected address.
    pub storage_key: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            default_backend: BackendKind::WalletKit,
            connect_timeout_secs: 120,
            sign_timeout_secs: 300,
            storage_key: "walletAddress".to_string(),
        }
    }
}

impl WalletConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.connect_timeout_secs)
    }

    pub fn sign_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.sign_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    pub log_filter: String,

    /// Record orchestration metrics.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "escrow_orchestrator=info".to_string(),
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.network.passphrase(), NetworkPassphrase::testnet());
        assert_eq!(config.wallet.default_backend, BackendKind::WalletKit);
        assert_eq!(config.wallet.connect_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.wallet.storage_key, "walletAddress");
    }

    #[test]
    fn test_zero_timeout_is_unbounded() {
        let wallet = WalletConfig {
            sign_timeout_secs: 0,
            ..WalletConfig::default()
        };
        assert_eq!(wallet.sign_timeout(), None);
    }

    #[test]
    fn test_partial_toml() {
        let config: OrchestratorConfig = toml::from_str(
            r#"
            [wallet]
            default_backend = "remote-pairing"
            "#,
        )
        .unwrap();
        assert_eq!(config.wallet.default_backend, BackendKind::RemotePairing);
        assert_eq!(config.wallet.sign_timeout_secs, 300);
        assert_eq!(config.api.base_url, "https://dev.api.trustlesswork.com");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let api = ApiConfig {
            api_key: "super-secret".to_string(),
            ..ApiConfig::default()
        };
        let printed = format!("{:?}", api);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
