//! Multi-wallet selector kit.
//!
//! The kit fronts several extension and hardware wallets behind one modal:
//! `open_modal` lets the user pick a wallet, `set_wallet` activates it, and
//! signing and disconnect go to whichever wallet is active.

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use std::sync::Arc;

use crate::blockchain::NetworkPassphrase;
use crate::wallet::backend::WalletBackend;
use crate::wallet::types::{BackendKind, WalletError, WalletResult};

/// Port for the kit's own API.
#[async_trait]
pub trait WalletKit: Send + Sync {
    /// Show the wallet list. `Ok(None)` means the modal was closed.
    async fn open_modal(&self) -> WalletResult<Option<String>>;

    async fn set_wallet(&self, wallet_id: &str) -> WalletResult<()>;

    async fn get_address(&self) -> WalletResult<String>;

    async fn sign_transaction(
        &self,
        xdr: &str,
        network_passphrase: &str,
        address: &str,
    ) -> WalletResult<String>;

    async fn disconnect(&self) -> WalletResult<()>;
}

/// [`WalletBackend`] over a [`WalletKit`].
pub struct WalletKitBackend<K> {
    kit: K,
    wallet_id: ArcSwapOption<String>,
    address: ArcSwapOption<String>,
}

impl<K: WalletKit> WalletKitBackend<K> {
    pub fn new(kit: K) -> Self {
        Self {
            kit,
            wallet_id: ArcSwapOption::empty(),
            address: ArcSwapOption::empty(),
        }
    }

    /// Wallet chosen in the modal, if connected.
    pub fn wallet_id(&self) -> Option<String> {
        self.wallet_id.load_full().map(|id| id.as_ref().clone())
    }
}

#[async_trait]
impl<K: WalletKit> WalletBackend for WalletKitBackend<K> {
    fn kind(&self) -> BackendKind {
        BackendKind::WalletKit
    }

    async fn connect(&self, _network: &NetworkPassphrase) -> WalletResult<()> {
        let wallet_id = self.kit.open_modal().await?.ok_or(WalletError::Cancelled)?;
        self.kit.set_wallet(&wallet_id).await?;

        let address = self.kit.get_address().await?;
        if address.trim().is_empty() {
            return Err(WalletError::Rejected(format!("{} returned no address", wallet_id)));
        }

        tracing::debug!(wallet = %wallet_id, "Wallet kit selection active");
        self.wallet_id.store(Some(Arc::new(wallet_id)));
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
        if self.wallet_id.load().is_none() {
            return Err(WalletError::NotConnected);
        }
        self.kit.sign_transaction(xdr, network.as_str(), address).await
    }

    async fn disconnect(&self) -> WalletResult<()> {
        self.wallet_id.store(None);
        self.address.store(None);
        self.kit.disconnect().await
    }

    fn session_handle(&self) -> Option<String> {
        self.wallet_id()
    }

    /// Re-activates the persisted wallet id without opening the modal.
    async fn resume(&self, address: &str, handle: Option<&str>) -> WalletResult<()> {
        let wallet_id = handle.ok_or(WalletError::NotConnected)?;
        self.kit.set_wallet(wallet_id).await?;

        let current = self.kit.get_address().await?;
        if current != address {
            return Err(WalletError::SignerMismatch {
                expected: address.to_string(),
                actual: current,
            });
        }

        tracing::debug!(wallet = %wallet_id, "Wallet kit selection resumed");
        self.wallet_id.store(Some(Arc::new(wallet_id.to_string())));
        self.address.store(Some(Arc::new(current)));
        Ok(())
    }
}
