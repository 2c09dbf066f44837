//! Transaction orchestration.
//!
//! # Data Flow
//! ```text
//! TransactionIntent (create / fund / milestone status)
//!     → Requesting: EscrowApi call → UnsignedTransaction
//!     → AwaitingWallet: only if no session; WalletSessionManager::connect
//!     → Signing: WalletSessionManager::sign → SignedTransaction
//!     → Submitting: EscrowApi::submit_transaction
//!     → OperationResult (Succeeded | Failed(stage, message))
//! ```
//!
//! # Design Decisions
//! - The state machine is a pure function (`state.rs`); the engine only runs
//!   the step for the current state and feeds back its event
//! - Failures are values, never `Err` or panics; the stage tag tells the
//!   caller which remedy to offer
//! - Nothing is retried: a retry is a new orchestration with a fresh
//!   envelope
//! - The caller serializes orchestrations that share a wallet session; the
//!   session slot itself is last-writer-wins

pub mod engine;
pub mod result;
pub mod state;

pub use engine::{Orchestrator, TransactionIntent};
pub use result::{FailureStage, Operation, OperationFailure, OperationResult, Remedy};
pub use state::{transition, Event, State, WaitStep};
