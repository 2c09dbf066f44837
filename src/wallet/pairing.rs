//! Remote wallet pairing (WalletConnect-style).
//!
//! # Flow
//! ```text
//! connect(network)
//!     → chain id derived from the network passphrase
//!     → PairingClient::connect → pairing URI + approval channel
//!     → PairingDisplay::show(uri)   (QR code for the mobile wallet)
//!     → await approval              (may take tens of seconds)
//!     → PairingDisplay::close()     (also on drop, e.g. timeout)
//!     → account picked from the approved CAIP-10 list for that chain
//!
//! sign_transaction
//!     → PairingClient::request(topic, chain id, "stellar_signXDR", {xdr})
//!     → response.signedXDR
//! ```
//!
//! The network is bound at pairing time: signing for a different network
//! than the one paired is refused. Relay sessions are not persisted, so a
//! restored address always needs a fresh pairing.

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::blockchain::{ChainId, NetworkPassphrase};
use crate::wallet::backend::WalletBackend;
use crate::wallet::types::{BackendKind, WalletError, WalletResult};

/// Relay method used to request a signature.
pub const SIGN_METHOD: &str = "stellar_signXDR";

/// A session approved by the remote wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedSession {
    pub topic: String,
    /// CAIP-10 account ids, e.g. `stellar:testnet:G...`.
    pub accounts: Vec<String>,
}

/// A pending pairing: the URI to display and the eventual approval.
#[derive(Debug)]
pub struct PairingProposal {
    pub uri: String,
    pub approval: oneshot::Receiver<WalletResult<PairedSession>>,
}

/// Port for the pairing relay client.
#[async_trait]
pub trait PairingClient: Send + Sync {
    /// Propose a session for `chain_id` allowing `methods`.
    async fn connect(&self, chain_id: &ChainId, methods: &[&str]) -> WalletResult<PairingProposal>;

    /// Deliver a method call over an established session.
    async fn request(
        &self,
        topic: &str,
        chain_id: &ChainId,
        method: &str,
        params: Value,
    ) -> WalletResult<Value>;

    async fn disconnect(&self, topic: &str) -> WalletResult<()>;
}

/// Port for the pairing UI (QR modal). A side channel: the backend only
/// tells it what to show and when to close.
pub trait PairingDisplay: Send + Sync {
    fn show(&self, uri: &str);
    fn close(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActivePairing {
    topic: String,
    chain_id: ChainId,
    address: String,
}

/// Closes the display however the approval wait ends.
struct CloseOnDrop<'a>(&'a dyn PairingDisplay);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// [`WalletBackend`] over a [`PairingClient`] and a [`PairingDisplay`].
pub struct RemotePairingBackend<C, D> {
    client: C,
    display: D,
    active: ArcSwapOption<ActivePairing>,
}

impl<C: PairingClient, D: PairingDisplay> RemotePairingBackend<C, D> {
    pub fn new(client: C, display: D) -> Self {
        Self {
            client,
            display,
            active: ArcSwapOption::empty(),
        }
    }

    /// Relay topic of the current session, if paired.
    pub fn topic(&self) -> Option<String> {
        self.active.load_full().map(|a| a.topic.clone())
    }

    async fn pair(&self, chain_id: &ChainId) -> WalletResult<PairedSession> {
        let proposal = self.client.connect(chain_id, &[SIGN_METHOD]).await?;

        self.display.show(&proposal.uri);
        let _close = CloseOnDrop(&self.display);

        match proposal.approval.await {
            Ok(result) => result,
            Err(_) => Err(WalletError::Cancelled),
        }
    }
}

fn unsupported(err: impl std::fmt::Display) -> WalletError {
    WalletError::UnsupportedNetwork(err.to_string())
}

#[async_trait]
impl<C: PairingClient, D: PairingDisplay> WalletBackend for RemotePairingBackend<C, D> {
    fn kind(&self) -> BackendKind {
        BackendKind::RemotePairing
    }

    async fn connect(&self, network: &NetworkPassphrase) -> WalletResult<()> {
        let chain_id = network.chain_id().map_err(unsupported)?;
        let session = self.pair(&chain_id).await?;

        let address = session
            .accounts
            .iter()
            .find_map(|account| chain_id.account_from(account))
            .ok_or_else(|| WalletError::Rejected(format!("no account approved for {}", chain_id)))?;

        tracing::info!(chain_id = %chain_id, topic = %session.topic, "Remote wallet paired");
        self.active.store(Some(Arc::new(ActivePairing {
            topic: session.topic,
            chain_id,
            address,
        })));
        Ok(())
    }

    async fn get_address(&self) -> WalletResult<String> {
        self.active
            .load_full()
            .map(|a| a.address.clone())
            .ok_or(WalletError::NotConnected)
    }

    async fn sign_transaction(
        &self,
        xdr: &str,
        network: &NetworkPassphrase,
        address: &str,
    ) -> WalletResult<String> {
        let active = self.active.load_full().ok_or(WalletError::NotConnected)?;

        let chain_id = network.chain_id().map_err(unsupported)?;
        if chain_id != active.chain_id {
            return Err(WalletError::UnsupportedNetwork(format!(
                "paired on {}, envelope targets {}",
                active.chain_id, chain_id
            )));
        }
        if address != active.address {
            return Err(WalletError::SignerMismatch {
                expected: address.to_string(),
                actual: active.address.clone(),
            });
        }

        let response = self
            .client
            .request(&active.topic, &chain_id, SIGN_METHOD, json!({ "xdr": xdr }))
            .await?;

        response
            .get("signedXDR")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| WalletError::Backend("remote wallet response missing signedXDR".to_string()))
    }

    async fn disconnect(&self) -> WalletResult<()> {
        match self.active.swap(None) {
            Some(active) => self.client.disconnect(&active.topic).await,
            None => Ok(()),
        }
    }
}
