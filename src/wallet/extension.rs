//! Direct browser-extension signer.
//!
//! The extension is injected by the host and exposes an access prompt and
//! `signTransaction(envelope, {networkPassphrase})`. It has no disconnect
//! call of its own, so disconnecting only forgets the cached address.

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::blockchain::NetworkPassphrase;
use crate::wallet::backend::WalletBackend;
use crate::wallet::types::{BackendKind, WalletError, WalletResult};

/// Options passed with a signing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOptions {
    pub network_passphrase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// What the extension hands back from a signing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTxResponse {
    pub signed_tx_xdr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_address: Option<String>,
}

/// Port for the signer the extension injects.
#[async_trait]
pub trait InjectedSigner: Send + Sync {
    /// Whether the extension is installed and reachable.
    async fn is_available(&self) -> bool;

    /// Prompt for account access; returns the granted address.
    async fn request_access(&self) -> WalletResult<String>;

    async fn sign_transaction(&self, xdr: &str, options: &SignOptions) -> WalletResult<SignedTxResponse>;
}

/// [`WalletBackend`] over an [`InjectedSigner`].
pub struct ExtensionBackend<S> {
    signer: S,
    address: ArcSwapOption<String>,
}

impl<S: InjectedSigner> ExtensionBackend<S> {
    pub fn new(signer: S) -> Self {
        Self {
            signer,
            address: ArcSwapOption::empty(),
        }
    }
}

#[async_trait]
impl<S: InjectedSigner> WalletBackend for ExtensionBackend<S> {
    fn kind(&self) -> BackendKind {
        BackendKind::Extension
    }

    async fn connect(&self, _network: &NetworkPassphrase) -> WalletResult<()> {
        if !self.signer.is_available().await {
            return Err(WalletError::Backend("wallet extension not installed".to_string()));
        }

        let address = self.signer.request_access().await?;
        if address.trim().is_empty() {
            return Err(WalletError::Rejected("extension granted no account".to_string()));
        }

        self.address.store(Some(Arc::new(address)));
        Ok(())
    }

    async fn get_address(&self) -> WalletResult<String> {
        self.address
            .load_full()
            .map(|a| a.as_ref().clone())
            .ok_or(WalletError::NotConnected)
    }

    async fn sign_transaction(
        &self,
        xdr: &str,
        network: &NetworkPassphrase,
        address: &str,
    ) -> WalletResult<String> {
        let options = SignOptions {
            network_passphrase: network.as_str().to_string(),
            address: Some(address.to_string()),
        };
        let response = self.signer.sign_transaction(xdr, &options).await?;

        if let Some(actual) = response.signer_address.filter(|a| a != address) {
            return Err(WalletError::SignerMismatch {
                expected: address.to_string(),
                actual,
            });
        }
        Ok(response.signed_tx_xdr)
    }

    async fn disconnect(&self) -> WalletResult<()> {
        self.address.store(None);
        Ok(())
    }

    /// Access granted to the page outlives a reload, so the extension only
    /// has to still be there.
    async fn resume(&self, address: &str, _handle: Option<&str>) -> WalletResult<()> {
        if !self.signer.is_available().await {
            return Err(WalletError::NotConnected);
        }
        self.address.store(Some(Arc::new(address.to_string())));
        Ok(())
    }
}
