//! Escrow domain model and remote API.
//!
//! # Data Flow
//! ```text
//! AgreementDraft ──validate──▶ AgreementPayload (immutable)
//!     → requests.rs (wire body, shape chosen by ServiceType)
//!     → client.rs (POST with x-api-key)
//!     → JSON response carrying the unsigned envelope
//! ```
//!
//! # Design Decisions
//! - Validation returns every problem, not just the first
//! - The client is stateless; each call is one POST with no retry
//! - `EscrowApi` is a trait so the orchestrator can run against a fake

pub mod client;
pub mod requests;
pub mod types;

pub use client::{ApiError, ApiResult, EscrowApi, EscrowApiClient};
pub use types::{
    Agreement, AgreementDraft, AgreementPayload, FundRequest, Milestone, MilestoneStatus,
    MilestoneStatusChange, PayloadError, Roles, ServiceType,
};
