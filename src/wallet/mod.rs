//! Wallet connection and signing.
//!
//! # Data Flow
//! ```text
//! connect():
//!     selected backend? ──no──▶ BackendPicker (modal)
//!     → backend.connect(network) → backend.get_address()
//!     → session slot + storage["walletAddress"], ".backend", ".handle"
//!
//! restore() on build:
//!     storage ──▶ session slot, backend resume deferred
//! resume_restored():
//!     backend.resume(address, handle) ──err──▶ slot and storage cleared
//!
//! sign(UnsignedTransaction):
//!     resume_restored, then session slot ──none──▶ NotConnected
//!     → backend.sign_transaction(envelope, network, address)
//!     → session still the same? ──no──▶ SessionChanged
//!     → SignedTransaction
//! ```
//!
//! # Backends
//! - `extension.rs`: injected signer, no disconnect of its own
//! - `kit.rs`: multi-wallet modal fronting several wallets
//! - `pairing.rs`: remote wallet approved over a relay; network bound at
//!   pairing time
//! - `terminal.rs`: extension port driven from a terminal
//!
//! # Design Decisions
//! - One manager owns the session; backends never write it
//! - The session slot is an `ArcSwapOption`, so readers never block and the
//!   last successful connect wins
//! - Address, backend kind and the backend's own handle (the kit's wallet
//!   id) are persisted; a restored session is handed out only after its
//!   backend resumes

pub mod backend;
pub mod extension;
pub mod kit;
pub mod pairing;
pub mod session;
pub mod storage;
pub mod terminal;
pub mod types;

pub use backend::{BackendPicker, FixedPicker, WalletBackend};
pub use extension::{ExtensionBackend, InjectedSigner, SignOptions, SignedTxResponse};
pub use kit::{WalletKit, WalletKitBackend};
pub use pairing::{PairedSession, PairingClient, PairingDisplay, PairingProposal, RemotePairingBackend};
pub use session::{SessionManagerBuilder, WalletSessionManager};
pub use storage::{MemorySessionStorage, SessionStorage};
pub use terminal::TerminalSigner;
pub use types::{BackendKind, WalletError, WalletResult, WalletSession};
