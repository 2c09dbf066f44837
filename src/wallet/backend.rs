//! The capability set every wallet backend provides.

use async_trait::async_trait;

use crate::blockchain::NetworkPassphrase;
use crate::wallet::types::{BackendKind, WalletError, WalletResult};

/// Uniform `{connect, get_address, sign_transaction, disconnect}` contract.
///
/// Backends differ in latency (remote pairing can take tens of seconds and
/// needs a pairing display) and in whether the network is bound at connect
/// time; the session manager hides both differences.
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// Which adapter this is.
    fn kind(&self) -> BackendKind;

    /// Establish the backend's own connection for `network`.
    async fn connect(&self, network: &NetworkPassphrase) -> WalletResult<()>;

    /// Address of the account the backend is connected to.
    async fn get_address(&self) -> WalletResult<String>;

    /// Sign an opaque envelope as `address` on `network`, returning the
    /// signed envelope.
    async fn sign_transaction(
        &self,
        xdr: &str,
        network: &NetworkPassphrase,
        address: &str,
    ) -> WalletResult<String>;

    /// Tear down backend state.
    async fn disconnect(&self) -> WalletResult<()>;

    /// Backend-specific state to persist next to the address so a reload
    /// can [`resume`](Self::resume) without prompting.
    fn session_handle(&self) -> Option<String> {
        None
    }

    /// Re-attach to `address` after a reload, using the handle persisted
    /// from [`session_handle`](Self::session_handle).
    ///
    /// Backends that cannot come back without the user refuse with
    /// `WalletError::NotConnected`.
    async fn resume(&self, _address: &str, _handle: Option<&str>) -> WalletResult<()> {
        Err(WalletError::NotConnected)
    }
}

/// Port standing in for the "choose a wallet" modal.
#[async_trait]
pub trait BackendPicker: Send + Sync {
    /// Choose one of `available`, or `None` if the user dismissed the choice.
    async fn choose(&self, available: &[BackendKind]) -> Option<BackendKind>;
}

/// Picker that always answers with the same choice.
#[derive(Debug, Clone, Copy)]
pub struct FixedPicker(pub Option<BackendKind>);

#[async_trait]
impl BackendPicker for FixedPicker {
    async fn choose(&self, available: &[BackendKind]) -> Option<BackendKind> {
        self.0.filter(|kind| available.contains(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_picker_respects_availability() {
        let picker = FixedPicker(Some(BackendKind::RemotePairing));
        assert_eq!(
            picker.choose(&[BackendKind::Extension, BackendKind::RemotePairing]).await,
            Some(BackendKind::RemotePairing)
        );
        assert_eq!(picker.choose(&[BackendKind::Extension]).await, None);
        assert_eq!(FixedPicker(None).choose(&[BackendKind::Extension]).await, None);
    }
}
