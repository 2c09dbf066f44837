//! Wallet Session Manager.
//!
//! Owns the single "which account is connected" slot and gives callers one
//! connect / sign / disconnect contract whichever backend is active.
//!
//! # Invariants
//! - At most one live session; writes are last-writer-wins
//! - A signed envelope is only built for the session that was live both
//!   before and after the backend signed it
//! - Nothing here panics or lets a backend error escape unrecorded: every
//!   failure lands in the error slot as well as in the returned `Result`
//! - A connect that is dropped (timeout, cancellation) never touches the
//!   slot, because the slot is written synchronously after the last await
//! - A restored session is only handed to signing once its backend has
//!   resumed; a backend that cannot resume loses the restored session

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::blockchain::{NetworkPassphrase, SignedTransaction, UnsignedTransaction};
use crate::config::WalletConfig;
use crate::observability::metrics;
use crate::resilience::{or_cancel, with_deadline, DeadlineElapsed};
use crate::wallet::backend::{BackendPicker, FixedPicker, WalletBackend};
use crate::wallet::storage::{MemorySessionStorage, SessionStorage};
use crate::wallet::types::{BackendKind, WalletError, WalletResult, WalletSession};

/// Builder for [`WalletSessionManager`].
pub struct SessionManagerBuilder {
    network: NetworkPassphrase,
    config: WalletConfig,
    backends: Vec<Arc<dyn WalletBackend>>,
    picker: Arc<dyn BackendPicker>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionManagerBuilder {
    /// Register a backend. A later backend of the same kind replaces an
    /// earlier one.
    pub fn backend(mut self, backend: Arc<dyn WalletBackend>) -> Self {
        self.backends.retain(|b| b.kind() != backend.kind());
        self.backends.push(backend);
        self
    }

    pub fn picker(mut self, picker: Arc<dyn BackendPicker>) -> Self {
        self.picker = picker;
        self
    }

    pub fn storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn config(mut self, config: WalletConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the manager, restoring a persisted session if one exists.
    pub fn build(self) -> WalletSessionManager {
        let manager = WalletSessionManager {
            network: self.network,
            backends: self.backends,
            picker: self.picker,
            storage: self.storage,
            storage_key: self.config.storage_key.clone(),
            default_backend: self.config.default_backend,
            connect_timeout: self.config.connect_timeout(),
            sign_timeout: self.config.sign_timeout(),
            session: ArcSwapOption::empty(),
            selected: ArcSwapOption::empty(),
            last_error: ArcSwapOption::empty(),
            pending: ArcSwapOption::empty(),
            resuming: Mutex::new(()),
        };
        manager.restore();
        manager
    }
}

/// Single source of truth for the connected wallet.
pub struct WalletSessionManager {
    network: NetworkPassphrase,
    backends: Vec<Arc<dyn WalletBackend>>,
    picker: Arc<dyn BackendPicker>,
    storage: Arc<dyn SessionStorage>,
    storage_key: String,
    default_backend: BackendKind,
    connect_timeout: Option<Duration>,
    sign_timeout: Option<Duration>,
    session: ArcSwapOption<WalletSession>,
    selected: ArcSwapOption<BackendKind>,
    last_error: ArcSwapOption<WalletError>,
    /// Restored session whose backend has not been re-attached yet.
    pending: ArcSwapOption<PendingResume>,
    resuming: Mutex<()>,
}

#[derive(Debug)]
struct PendingResume {
    session: WalletSession,
    handle: Option<String>,
}

impl WalletSessionManager {
    /// Start building a manager for `network`.
    ///
    /// Defaults: no backends, a picker that never chooses, in-memory
    /// storage, default wallet config.
    pub fn builder(network: NetworkPassphrase) -> SessionManagerBuilder {
        SessionManagerBuilder {
            network,
            config: WalletConfig::default(),
            backends: Vec::new(),
            picker: Arc::new(FixedPicker(None)),
            storage: Arc::new(MemorySessionStorage::new()),
        }
    }

    /// Network sessions are connected for.
    pub fn network(&self) -> &NetworkPassphrase {
        &self.network
    }

    /// Current session, if any.
    pub fn session(&self) -> Option<WalletSession> {
        self.session.load_full().map(|s| s.as_ref().clone())
    }

    pub fn is_connected(&self) -> bool {
        self.session.load().is_some()
    }

    /// Last connect or sign failure. Cleared by the next success.
    pub fn last_error(&self) -> Option<WalletError> {
        self.last_error.load_full().map(|e| e.as_ref().clone())
    }

    /// Backend the next connect will use without asking.
    pub fn selected_backend(&self) -> Option<BackendKind> {
        self.selected.load_full().map(|k| *k)
    }

    pub fn available_backends(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    /// Pre-select a backend so connect skips the picker.
    pub fn select_backend(&self, kind: BackendKind) -> WalletResult<()> {
        self.backend(kind)?;
        self.selected.store(Some(Arc::new(kind)));
        Ok(())
    }

    /// Rebuild the session from tab-scoped storage.
    ///
    /// The backend is the one persisted with the address, or the configured
    /// default when none was recorded. The backend itself is re-attached
    /// lazily by [`resume_restored`](Self::resume_restored).
    pub fn restore(&self) -> Option<WalletSession> {
        let address = self
            .storage
            .get(&self.storage_key)
            .filter(|a| !a.trim().is_empty())?;

        let backend = self
            .storage
            .get(&self.backend_key())
            .and_then(|kind| kind.parse::<BackendKind>().ok())
            .filter(|kind| self.backend(*kind).is_ok())
            .unwrap_or(self.default_backend);

        let session = WalletSession { address, backend };
        tracing::info!(
            address = %session.address,
            backend = %session.backend,
            "Wallet session restored from storage"
        );
        self.session.store(Some(Arc::new(session.clone())));
        self.pending.store(Some(Arc::new(PendingResume {
            session: session.clone(),
            handle: self.storage.get(&self.handle_key()),
        })));
        Some(session)
    }

    /// Re-attach the backend behind a restored session.
    ///
    /// Returns whether a usable session is live afterwards. When the backend
    /// cannot resume, the restored session and its persisted state are
    /// dropped so the caller connects from scratch.
    pub async fn resume_restored(&self) -> bool {
        let _gate = self.resuming.lock().await;
        let Some(pending) = self.pending.swap(None) else {
            return self.is_connected();
        };
        let restored = &pending.session;

        let resumed = match self.backend(restored.backend) {
            Ok(backend) => {
                let resuming = backend.resume(&restored.address, pending.handle.as_deref());
                match with_deadline(self.connect_timeout, resuming).await {
                    Ok(result) => result,
                    Err(elapsed) => Err(timeout_error(elapsed)),
                }
            }
            Err(e) => Err(e),
        };

        match resumed {
            Ok(()) => {
                metrics::record_wallet_event(restored.backend.as_str(), "resumed");
                tracing::info!(
                    address = %restored.address,
                    backend = %restored.backend,
                    "Restored wallet session resumed"
                );
            }
            Err(e) => {
                metrics::record_wallet_event(restored.backend.as_str(), "resume_failed");
                tracing::warn!(
                    address = %restored.address,
                    backend = %restored.backend,
                    error = %e,
                    "Restored wallet session could not be resumed"
                );
                self.drop_stale(restored);
            }
        }
        self.is_connected()
    }

    /// Clear `stale` from the slot and storage unless a newer session has
    /// replaced it.
    fn drop_stale(&self, stale: &WalletSession) {
        let current = self.session.load_full();
        if current.as_deref() == Some(stale) {
            let _ = self.session.compare_and_swap(&current, None::<Arc<WalletSession>>);
            self.forget_persisted();
        }
    }

    /// Connect a wallet, asking the picker first if no backend is selected.
    pub async fn connect(&self) -> WalletResult<WalletSession> {
        self.connect_with(|_| {}).await
    }

    /// Like [`connect`](Self::connect), invoking `on_connected` once the
    /// session is stored.
    pub async fn connect_with<F>(&self, on_connected: F) -> WalletResult<WalletSession>
    where
        F: FnOnce(&WalletSession) + Send,
    {
        self.connect_on(&self.network, on_connected).await
    }

    /// Connect for `network` rather than the manager's own, e.g. when the
    /// envelope about to be signed targets another network.
    pub async fn connect_on<F>(&self, network: &NetworkPassphrase, on_connected: F) -> WalletResult<WalletSession>
    where
        F: FnOnce(&WalletSession) + Send,
    {
        let result = match with_deadline(self.connect_timeout, self.establish(network)).await {
            Ok(result) => result,
            Err(elapsed) => Err(timeout_error(elapsed)),
        };

        match result {
            Ok(session) => {
                self.commit(&session);
                on_connected(&session);
                Ok(session)
            }
            Err(e) => {
                let backend = self.selected_backend().map(|k| k.as_str()).unwrap_or("none");
                metrics::record_wallet_event(backend, "connect_failed");
                tracing::warn!(backend, error = %e, "Wallet connection failed");
                self.last_error.store(Some(Arc::new(e.clone())));
                Err(e)
            }
        }
    }

    /// Connect for `network` unless `cancel` fires first.
    ///
    /// Returns `None` when cancelled; the session slot is then left as it
    /// was, even if the backend completes its approval later.
    pub async fn connect_until(
        &self,
        cancel: &CancellationToken,
        network: &NetworkPassphrase,
    ) -> Option<WalletResult<WalletSession>> {
        let result = or_cancel(cancel, self.connect_on(network, |_| {})).await;
        if result.is_none() {
            tracing::info!("Wallet connection abandoned");
        }
        result
    }

    async fn establish(&self, network: &NetworkPassphrase) -> WalletResult<WalletSession> {
        let kind = match self.selected_backend() {
            Some(kind) => kind,
            None => self
                .picker
                .choose(&self.available_backends())
                .await
                .ok_or(WalletError::NoBackendSelected)?,
        };
        let backend = self.backend(kind)?;

        backend.connect(network).await?;
        let address = backend.get_address().await?;
        if address.trim().is_empty() {
            return Err(WalletError::Rejected("wallet returned no address".to_string()));
        }

        Ok(WalletSession { address, backend: kind })
    }

    fn commit(&self, session: &WalletSession) {
        self.pending.store(None);
        self.selected.store(Some(Arc::new(session.backend)));
        self.session.store(Some(Arc::new(session.clone())));
        self.persist(session);
        self.last_error.store(None);

        metrics::record_wallet_event(session.backend.as_str(), "connected");
        tracing::info!(
            address = %session.address,
            backend = %session.backend,
            "Wallet connected"
        );
    }

    fn persist(&self, session: &WalletSession) {
        self.storage.set(&self.storage_key, &session.address);
        self.storage.set(&self.backend_key(), session.backend.as_str());
        match self.backend(session.backend).ok().and_then(|b| b.session_handle()) {
            Some(handle) => self.storage.set(&self.handle_key(), &handle),
            None => self.storage.remove(&self.handle_key()),
        }
    }

    fn forget_persisted(&self) {
        self.storage.remove(&self.storage_key);
        self.storage.remove(&self.backend_key());
        self.storage.remove(&self.handle_key());
    }

    fn backend_key(&self) -> String {
        format!("{}.backend", self.storage_key)
    }

    fn handle_key(&self) -> String {
        format!("{}.handle", self.storage_key)
    }

    /// Tear down the active backend (best-effort) and forget the session.
    pub async fn disconnect(&self) {
        self.pending.store(None);
        let session = self.session.swap(None);
        let selected = self.selected.swap(None);
        self.forget_persisted();

        let kind = session.map(|s| s.backend).or_else(|| selected.map(|k| *k));
        if let Some(kind) = kind {
            if let Ok(backend) = self.backend(kind) {
                if let Err(e) = backend.disconnect().await {
                    tracing::warn!(backend = %kind, error = %e, "Ignoring wallet disconnect error");
                }
            }
            metrics::record_wallet_event(kind.as_str(), "disconnected");
        }
        tracing::info!("Wallet disconnected");
    }

    /// Sign an envelope with the live session.
    ///
    /// The envelope is consumed whatever the outcome. The network comes
    /// from the envelope itself. `WalletError::NotConnected` means there
    /// was no usable session (the slot is empty afterwards); any other
    /// error means the backend refused or failed.
    pub async fn sign(&self, unsigned: UnsignedTransaction) -> WalletResult<SignedTransaction> {
        let result = self.sign_with_session(unsigned).await;
        match &result {
            Ok(signed) => {
                self.last_error.store(None);
                tracing::debug!(signer = %signed.signer(), "Envelope signed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Signing failed");
                self.last_error.store(Some(Arc::new(e.clone())));
            }
        }
        result
    }

    async fn sign_with_session(&self, unsigned: UnsignedTransaction) -> WalletResult<SignedTransaction> {
        if !self.resume_restored().await {
            return Err(WalletError::NotConnected);
        }
        let session = self.session.load_full().ok_or(WalletError::NotConnected)?;
        let backend = self.backend(session.backend)?;

        let signing = backend.sign_transaction(unsigned.xdr(), unsigned.network(), &session.address);
        let signed_xdr = match with_deadline(self.sign_timeout, signing).await {
            Ok(result) => result,
            Err(elapsed) => Err(timeout_error(elapsed)),
        }
        .inspect_err(|e| {
            metrics::record_wallet_event(session.backend.as_str(), "sign_failed");
            if *e == WalletError::NotConnected {
                self.drop_stale(&session);
            }
        })?;

        if signed_xdr.trim().is_empty() {
            return Err(WalletError::Backend("wallet returned an empty envelope".to_string()));
        }

        match self.session.load_full() {
            Some(current) if *current == *session => {}
            _ => return Err(WalletError::SessionChanged),
        }

        metrics::record_wallet_event(session.backend.as_str(), "signed");
        Ok(SignedTransaction::new(
            signed_xdr,
            session.address.clone(),
            unsigned.network().clone(),
        ))
    }

    fn backend(&self, kind: BackendKind) -> WalletResult<&Arc<dyn WalletBackend>> {
        self.backends
            .iter()
            .find(|b| b.kind() == kind)
            .ok_or(WalletError::BackendUnavailable(kind))
    }
}

fn timeout_error(elapsed: DeadlineElapsed) -> WalletError {
    WalletError::Timeout(elapsed.limit.as_secs())
}

impl std::fmt::Debug for WalletSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSessionManager")
            .field("network", &self.network)
            .field("backends", &self.available_backends())
            .field("session", &self.session())
            .finish()
    }
}
