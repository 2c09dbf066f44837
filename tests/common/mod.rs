//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use escrow_orchestrator::blockchain::{ChainId, NetworkPassphrase};
use escrow_orchestrator::config::{ApiConfig, WalletConfig};
use escrow_orchestrator::escrow::{
    AgreementDraft, AgreementPayload, EscrowApiClient, Milestone, MilestoneStatus, Roles,
    ServiceType,
};
use escrow_orchestrator::orchestrator::Orchestrator;
use escrow_orchestrator::wallet::{
    BackendKind, FixedPicker, MemorySessionStorage, PairedSession, PairingClient, PairingDisplay,
    PairingProposal, SessionStorage, WalletBackend, WalletError, WalletKit, WalletResult,
    WalletSessionManager,
};

pub const API_KEY: &str = "integration-key";

/// Start a mock escrow service.
pub async fn escrow_service() -> MockServer {
    MockServer::start().await
}

/// Expect one authenticated POST to `route`, answering `status` with `body`.
pub async fn mount_post(server: &MockServer, route: &str, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path(route))
        .and(header("x-api-key", API_KEY))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

/// Fail the test if `route` is ever hit.
pub async fn forbid_post(server: &MockServer, route: &str) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

/// JSON bodies the service received on `route`, in order.
pub async fn bodies_sent_to(server: &MockServer, route: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .map(|r| r.body_json::<Value>().unwrap())
        .collect()
}

pub fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: server.uri(),
        api_key: API_KEY.to_string(),
        request_timeout_secs: 5,
    }
}

/// Wallet backend whose answers are fixed up front.
pub struct ScriptedWallet {
    pub kind: BackendKind,
    pub address: String,
    pub connect_result: WalletResult<()>,
    pub signature: WalletResult<String>,
    pub sign_delay: Option<Duration>,
    pub connects: AtomicU32,
    pub sign_requests: Mutex<Vec<SignRequest>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignRequest {
    pub xdr: String,
    pub network: NetworkPassphrase,
    pub address: String,
}

impl ScriptedWallet {
    pub fn signing(address: &str, signature: &str) -> Self {
        Self {
            kind: BackendKind::Extension,
            address: address.to_string(),
            connect_result: Ok(()),
            signature: Ok(signature.to_string()),
            sign_delay: None,
            connects: AtomicU32::new(0),
            sign_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn cancelling_connect(address: &str) -> Self {
        Self {
            connect_result: Err(WalletError::Cancelled),
            ..Self::signing(address, "UNUSED")
        }
    }

    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn sign_count(&self) -> usize {
        self.sign_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl WalletBackend for ScriptedWallet {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn connect(&self, _network: &NetworkPassphrase) -> WalletResult<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.connect_result.clone()
    }

    async fn get_address(&self) -> WalletResult<String> {
        Ok(self.address.clone())
    }

    async fn sign_transaction(
        &self,
        xdr: &str,
        network: &NetworkPassphrase,
        address: &str,
    ) -> WalletResult<String> {
        if let Some(delay) = self.sign_delay {
            tokio::time::sleep(delay).await;
        }
        self.sign_requests.lock().unwrap().push(SignRequest {
            xdr: xdr.to_string(),
            network: network.clone(),
            address: address.to_string(),
        });
        self.signature.clone()
    }

    async fn disconnect(&self) -> WalletResult<()> {
        Ok(())
    }

    async fn resume(&self, _address: &str, _handle: Option<&str>) -> WalletResult<()> {
        Ok(())
    }
}

/// Relay that approves with a fixed account list, or never answers.
/// Clones share their recordings.
#[derive(Clone)]
pub struct Relay {
    pub accounts: Option<Vec<String>>,
    pub parked: Arc<Mutex<Vec<oneshot::Sender<WalletResult<PairedSession>>>>>,
    pub chains: Arc<Mutex<Vec<String>>>,
}

impl Relay {
    pub fn approving(accounts: &[&str]) -> Self {
        Self {
            accounts: Some(accounts.iter().map(|a| a.to_string()).collect()),
            parked: Arc::default(),
            chains: Arc::default(),
        }
    }

    pub fn silent() -> Self {
        Self {
            accounts: None,
            parked: Arc::default(),
            chains: Arc::default(),
        }
    }
}

#[async_trait]
impl PairingClient for Relay {
    async fn connect(&self, chain_id: &ChainId, _methods: &[&str]) -> WalletResult<PairingProposal> {
        self.chains.lock().unwrap().push(chain_id.to_string());
        let (tx, rx) = oneshot::channel();
        match &self.accounts {
            Some(accounts) => {
                let _ = tx.send(Ok(PairedSession {
                    topic: "t-1".into(),
                    accounts: accounts.clone(),
                }));
            }
            None => self.parked.lock().unwrap().push(tx),
        }
        Ok(PairingProposal {
            uri: "wc:pairing".into(),
            approval: rx,
        })
    }

    async fn request(&self, _topic: &str, _chain_id: &ChainId, _method: &str, params: Value) -> WalletResult<Value> {
        Ok(json!({"signedXDR": format!("remote({})", params["xdr"].as_str().unwrap_or_default())}))
    }

    async fn disconnect(&self, _topic: &str) -> WalletResult<()> {
        Ok(())
    }
}

/// QR display that only remembers whether it is open.
#[derive(Clone, Default)]
pub struct Qr {
    pub open: Arc<Mutex<bool>>,
}

impl PairingDisplay for Qr {
    fn show(&self, _uri: &str) {
        *self.open.lock().unwrap() = true;
    }

    fn close(&self) {
        *self.open.lock().unwrap() = false;
    }
}

/// Wallet kit whose modal always picks "albedo" for `GKIT`.
/// Clones share the modal counter.
#[derive(Clone, Default)]
pub struct Kit {
    pub modal_opens: Arc<AtomicU32>,
    pub active: Arc<Mutex<Option<String>>>,
}

#[async_trait]
impl WalletKit for Kit {
    async fn open_modal(&self) -> WalletResult<Option<String>> {
        self.modal_opens.fetch_add(1, Ordering::SeqCst);
        Ok(Some("albedo".into()))
    }

    async fn set_wallet(&self, wallet_id: &str) -> WalletResult<()> {
        *self.active.lock().unwrap() = Some(wallet_id.to_string());
        Ok(())
    }

    async fn get_address(&self) -> WalletResult<String> {
        match self.active.lock().unwrap().as_deref() {
            Some("albedo") => Ok("GKIT".into()),
            _ => Err(WalletError::NotConnected),
        }
    }

    async fn sign_transaction(&self, xdr: &str, _network_passphrase: &str, _address: &str) -> WalletResult<String> {
        Ok(format!("kit({})", xdr))
    }

    async fn disconnect(&self) -> WalletResult<()> {
        *self.active.lock().unwrap() = None;
        Ok(())
    }
}

/// Session manager over `wallet`, optionally with `restored` already in
/// session storage.
pub fn session_manager(wallet: Arc<ScriptedWallet>, restored: Option<&str>) -> WalletSessionManager {
    let storage = MemorySessionStorage::new();
    if let Some(address) = restored {
        storage.set("walletAddress", address);
    }
    let kind = wallet.kind;
    WalletSessionManager::builder(NetworkPassphrase::testnet())
        .backend(wallet)
        .picker(Arc::new(FixedPicker(Some(kind))))
        .storage(Arc::new(storage))
        .config(WalletConfig {
            default_backend: kind,
            ..WalletConfig::default()
        })
        .build()
}

/// Orchestrator talking to `server` with `wallet` as the only backend.
pub fn orchestrator(
    server: &MockServer,
    wallet: Arc<ScriptedWallet>,
    restored: Option<&str>,
) -> Orchestrator {
    orchestrator_with(server, session_manager(wallet, restored))
}

/// Orchestrator talking to `server` through an existing session manager.
pub fn orchestrator_with(server: &MockServer, manager: WalletSessionManager) -> Orchestrator {
    let client = EscrowApiClient::new(&api_config(server)).unwrap();
    Orchestrator::new(Arc::new(client), Arc::new(manager))
}

pub fn roles() -> Roles {
    Roles {
        approver: "GAPPROVER".into(),
        service_provider: "GPROVIDER".into(),
        release_signer: "GRELEASE".into(),
        receiver: "GRECEIVER".into(),
        platform_address: None,
        dispute_resolver: None,
    }
}

pub fn single_release_payload(amount: u64) -> AgreementPayload {
    AgreementPayload::new(AgreementDraft {
        service_type: ServiceType::SingleRelease,
        engagement_id: Some("ENG-42".into()),
        title: "Logo design".into(),
        description: "Three concepts and one revision".into(),
        amount,
        platform_fee: 2,
        roles: roles(),
        milestones: vec![
            Milestone {
                description: "Concepts".into(),
                amount: None,
                status: MilestoneStatus::Pending,
            },
            Milestone {
                description: "Final files".into(),
                amount: None,
                status: MilestoneStatus::Pending,
            },
        ],
        notification_emails: Vec::new(),
    })
    .unwrap()
}
