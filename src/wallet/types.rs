//! Wallet session types and error definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which adapter supplied a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Browser-extension signer injected into the page.
    Extension,
    /// Multi-wallet selector kit (extensions and hardware wallets).
    WalletKit,
    /// Remote wallet paired over a relay (QR code + async approval).
    RemotePairing,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Extension => "extension",
            BackendKind::WalletKit => "wallet-kit",
            BackendKind::RemotePairing => "remote-pairing",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extension" => Ok(BackendKind::Extension),
            "wallet-kit" => Ok(BackendKind::WalletKit),
            "remote-pairing" => Ok(BackendKind::RemotePairing),
            other => Err(format!("unknown wallet backend '{}'", other)),
        }
    }
}

/// The connected account and the backend that supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub address: String,
    pub backend: BackendKind,
}

/// Errors reported by wallet backends and the session manager.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// No backend was chosen when one was needed.
    #[error("No wallet backend selected")]
    NoBackendSelected,

    /// The chosen backend is not registered with the manager.
    #[error("Wallet backend {0} is not available")]
    BackendUnavailable(BackendKind),

    /// The user dismissed the prompt.
    #[error("Wallet request cancelled by user")]
    Cancelled,

    /// The wallet refused the request.
    #[error("Wallet rejected the request: {0}")]
    Rejected(String),

    /// The bounded wait elapsed.
    #[error("Wallet did not respond within {0} seconds")]
    Timeout(u64),

    /// An operation needed a live session and there was none.
    #[error("No wallet connected")]
    NotConnected,

    /// The session was replaced or cleared while a request was in flight.
    #[error("Wallet session changed while the request was pending")]
    SessionChanged,

    /// The wallet signed with an account other than the session's.
    #[error("Wallet signed with {actual}, expected {expected}")]
    SignerMismatch { expected: String, actual: String },

    /// The backend cannot target the requested network.
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// Any other backend failure.
    #[error("Wallet error: {0}")]
    Backend(String),
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;
