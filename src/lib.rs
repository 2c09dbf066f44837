//! Escrow agreement transaction orchestrator.
//!
//! Turns an escrow intent (create an agreement, fund it, move a milestone)
//! into a submitted on-chain transaction: the escrow API builds an unsigned
//! envelope, a wallet signs it, and the API broadcasts it.

// Domain
pub mod blockchain;
pub mod escrow;
pub mod orchestrator;
pub mod wallet;

// Cross-cutting concerns
pub mod config;
pub mod observability;
pub mod resilience;

pub use config::OrchestratorConfig;
pub use escrow::{EscrowApi, EscrowApiClient};
pub use orchestrator::{FailureStage, OperationResult, Orchestrator, TransactionIntent};
pub use wallet::WalletSessionManager;
