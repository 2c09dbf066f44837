//! Transaction envelopes passed between the escrow API and the wallet.
//!
//! # Responsibilities
//! - Carry the opaque envelope string without parsing or mutating it
//! - Bind each envelope to the network it was built for
//! - Enforce single use: neither type is `Clone`, so an unsigned envelope
//!   moves into one signing attempt and a signed one into one submission

use serde_json::Value;

use crate::blockchain::types::{BlockchainError, BlockchainResult, NetworkPassphrase};

/// Unsigned envelope returned by the escrow API.
#[derive(Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    xdr: String,
    network: NetworkPassphrase,
}

impl UnsignedTransaction {
    pub fn new(xdr: impl Into<String>, network: NetworkPassphrase) -> BlockchainResult<Self> {
        let xdr = xdr.into();
        if xdr.trim().is_empty() {
            return Err(BlockchainError::EmptyEnvelope);
        }
        Ok(Self { xdr, network })
    }

    /// Pull the envelope out of an API response body.
    ///
    /// Looks at `unsignedTransaction`, then `data.unsignedTransaction`. A
    /// `networkPassphrase` in the response overrides `default_network`.
    /// Returns `None` when no usable envelope is present.
    pub fn from_response(body: &Value, default_network: &NetworkPassphrase) -> Option<Self> {
        let xdr = body
            .get("unsignedTransaction")
            .or_else(|| body.get("data").and_then(|d| d.get("unsignedTransaction")))
            .and_then(Value::as_str)?;

        let network = body
            .get("networkPassphrase")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .map(NetworkPassphrase::new)
            .unwrap_or_else(|| default_network.clone());

        Self::new(xdr, network).ok()
    }

    pub fn xdr(&self) -> &str {
        &self.xdr
    }

    pub fn network(&self) -> &NetworkPassphrase {
        &self.network
    }
}

/// Signed envelope ready for submission.
///
/// Only the wallet session manager builds these, from the live session.
#[derive(Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    xdr: String,
    signer: String,
    network: NetworkPassphrase,
}

impl SignedTransaction {
    pub(crate) fn new(xdr: String, signer: String, network: NetworkPassphrase) -> Self {
        Self { xdr, signer, network }
    }

    pub fn xdr(&self) -> &str {
        &self.xdr
    }

    /// Address of the session that produced the signature.
    pub fn signer(&self) -> &str {
        &self.signer
    }

    pub fn network(&self) -> &NetworkPassphrase {
        &self.network
    }

    /// Consume the envelope, yielding the signed XDR.
    pub fn into_xdr(self) -> String {
        self.xdr
    }
}
