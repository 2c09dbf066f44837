//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Wallet connect / sign:
//!     → timeouts.rs (bounded wait, distinct timeout error)
//!     → orchestrator maps an elapsed deadline to Failed(timeout)
//!
//! Any orchestration step:
//!     → cancellation.rs (race against the caller's token)
//!     → orchestrator maps a fired token to Failed(cancelled)
//! ```
//!
//! # Design Decisions
//! - No retries: envelopes and signatures are single-use, so a retry
//!   must restart the whole flow with a fresh envelope
//! - A zero timeout in config means "wait indefinitely"
//! - A future that loses a race is dropped, never detached, so its
//!   completion cannot be observed later

pub mod cancellation;
pub mod timeouts;

pub use cancellation::or_cancel;
pub use timeouts::{with_deadline, DeadlineElapsed};
