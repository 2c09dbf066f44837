//! Network-specific types and error definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Passphrase of the public test network.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Passphrase of the public main network.
pub const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

/// Human-readable passphrase selecting the network an envelope and its
/// signature must target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkPassphrase(String);

impl NetworkPassphrase {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self(passphrase.into())
    }

    pub fn testnet() -> Self {
        Self(TESTNET_PASSPHRASE.to_string())
    }

    pub fn public() -> Self {
        Self(PUBLIC_PASSPHRASE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chain identifier used by remote pairing sessions for this network.
    pub fn chain_id(&self) -> BlockchainResult<ChainId> {
        match self.0.as_str() {
            TESTNET_PASSPHRASE => Ok(ChainId("stellar:testnet".to_string())),
            PUBLIC_PASSPHRASE => Ok(ChainId("stellar:pubnet".to_string())),
            other => Err(BlockchainError::UnknownNetwork(other.to_string())),
        }
    }
}

impl Default for NetworkPassphrase {
    fn default() -> Self {
        Self::testnet()
    }
}

impl fmt::Display for NetworkPassphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chain identifier (`<namespace>:<reference>`) for strong typing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the account from a CAIP-10 account id on this chain.
    ///
    /// Returns `None` when the account belongs to another chain.
    pub fn account_from(&self, caip10: &str) -> Option<String> {
        let rest = caip10.strip_prefix(self.0.as_str())?;
        let account = rest.strip_prefix(':')?;
        if account.is_empty() {
            return None;
        }
        Some(account.to_string())
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors about network selection and envelopes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// The passphrase does not map to a known chain.
    #[error("Unknown network passphrase: {0}")]
    UnknownNetwork(String),

    /// Envelope string was empty.
    #[error("Empty transaction envelope")]
    EmptyEnvelope,
}

/// Result type for network operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;
