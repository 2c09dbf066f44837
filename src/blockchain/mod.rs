//! Network and envelope primitives.
//!
//! # Data Flow
//! ```text
//! Escrow API response
//!     → transaction.rs (UnsignedTransaction bound to a NetworkPassphrase)
//!     → wallet signs, producing SignedTransaction
//!     → escrow API submission
//!
//! NetworkPassphrase → types.rs (ChainId for remote pairing)
//! ```
//!
//! # Security Constraints
//! - Envelopes are opaque: never parsed, never mutated
//! - Envelope contents are never logged in full

pub mod transaction;
pub mod types;

pub use transaction::{SignedTransaction, UnsignedTransaction};
pub use types::{BlockchainError, ChainId, NetworkPassphrase};
