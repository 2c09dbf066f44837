//! Escrow agreement data model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Escrow flavour; selects endpoint paths and request shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    /// One release of the whole amount once every milestone is approved.
    SingleRelease,
    /// Each milestone carries and releases its own amount.
    MultiRelease,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::SingleRelease => "single-release",
            ServiceType::MultiRelease => "multi-release",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single-release" => Ok(ServiceType::SingleRelease),
            "multi-release" => Ok(ServiceType::MultiRelease),
            other => Err(format!("unknown service type '{}'", other)),
        }
    }
}

/// Milestone lifecycle. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneStatus {
    #[default]
    Pending,
    Approved,
    Released,
}

impl MilestoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::Pending => "pending",
            MilestoneStatus::Approved => "approved",
            MilestoneStatus::Released => "released",
        }
    }

    /// Whether `next` is the single step after `self`.
    pub fn can_advance_to(&self, next: MilestoneStatus) -> bool {
        matches!(
            (self, next),
            (MilestoneStatus::Pending, MilestoneStatus::Approved)
                | (MilestoneStatus::Approved, MilestoneStatus::Released)
        )
    }
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MilestoneStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MilestoneStatus::Pending),
            "approved" => Ok(MilestoneStatus::Approved),
            "released" => Ok(MilestoneStatus::Released),
            other => Err(format!("unknown milestone status '{}'", other)),
        }
    }
}

/// A sub-unit of an agreement with its own amount and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub description: String,
    /// Required for multi-release agreements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default)]
    pub status: MilestoneStatus,
}

impl Milestone {
    /// Apply a status confirmed on-chain. Regressions and skipped steps are
    /// refused; re-applying the current status is a no-op.
    pub fn apply_confirmed(&mut self, status: MilestoneStatus) -> Result<(), MilestoneError> {
        if self.status == status {
            return Ok(());
        }
        if !self.status.can_advance_to(status) {
            return Err(MilestoneError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        Ok(())
    }
}

/// Role assignment of an agreement. Values are account addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roles {
    pub approver: String,
    pub service_provider: String,
    pub release_signer: String,
    pub receiver: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispute_resolver: Option<String>,
}

/// Unvalidated agreement as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementDraft {
    pub service_type: ServiceType,
    #[serde(default)]
    pub engagement_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub amount: u64,
    /// Platform fee in percent.
    #[serde(default)]
    pub platform_fee: u32,
    pub roles: Roles,
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub notification_emails: Vec<String>,
}

/// Problems found while validating an [`AgreementDraft`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("platform fee {0}% exceeds 100%")]
    PlatformFeeOutOfRange(u32),

    #[error("agreement needs at least one milestone")]
    NoMilestones,

    #[error("milestone {0} has an empty description")]
    EmptyMilestoneDescription(usize),

    #[error("milestone {0} needs an amount in a multi-release agreement")]
    MissingMilestoneAmount(usize),
}

/// Errors applying a confirmed status to an agreement.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MilestoneError {
    #[error("milestone index {index} out of range ({len} milestones)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("milestone cannot move from {from} to {to}")]
    InvalidTransition {
        from: MilestoneStatus,
        to: MilestoneStatus,
    },
}

/// A validated, immutable agreement proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreementPayload {
    draft: AgreementDraft,
}

impl AgreementPayload {
    /// Validate a draft, returning every problem found.
    ///
    /// Only the shape the deploy endpoints need is checked. Whether the
    /// milestones make commercial sense is left to the escrow service.
    pub fn new(draft: AgreementDraft) -> Result<Self, Vec<PayloadError>> {
        let mut errors = Vec::new();

        if draft.title.trim().is_empty() {
            errors.push(PayloadError::EmptyField("title"));
        }
        if draft.amount == 0 {
            errors.push(PayloadError::ZeroAmount);
        }
        if draft.platform_fee > 100 {
            errors.push(PayloadError::PlatformFeeOutOfRange(draft.platform_fee));
        }

        let roles = [
            ("roles.approver", &draft.roles.approver),
            ("roles.serviceProvider", &draft.roles.service_provider),
            ("roles.releaseSigner", &draft.roles.release_signer),
            ("roles.receiver", &draft.roles.receiver),
        ];
        for (name, value) in roles {
            if value.trim().is_empty() {
                errors.push(PayloadError::EmptyField(name));
            }
        }

        if draft.milestones.is_empty() {
            errors.push(PayloadError::NoMilestones);
        }
        for (i, m) in draft.milestones.iter().enumerate() {
            if m.description.trim().is_empty() {
                errors.push(PayloadError::EmptyMilestoneDescription(i));
            }
            // Multi-release deploys carry a per-milestone amount.
            if draft.service_type == ServiceType::MultiRelease && m.amount.is_none() {
                errors.push(PayloadError::MissingMilestoneAmount(i));
            }
        }

        if errors.is_empty() {
            Ok(Self { draft })
        } else {
            Err(errors)
        }
    }

    pub fn service_type(&self) -> ServiceType {
        self.draft.service_type
    }

    pub fn engagement_id(&self) -> Option<&str> {
        self.draft.engagement_id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.draft.title
    }

    pub fn description(&self) -> &str {
        &self.draft.description
    }

    pub fn amount(&self) -> u64 {
        self.draft.amount
    }

    pub fn platform_fee(&self) -> u32 {
        self.draft.platform_fee
    }

    pub fn roles(&self) -> &Roles {
        &self.draft.roles
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.draft.milestones
    }

    pub fn notification_emails(&self) -> &[String] {
        &self.draft.notification_emails
    }
}

/// Request to fund a deployed escrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundRequest {
    pub contract_id: String,
    /// Account paying into the escrow; becomes the transaction source.
    pub funder: String,
    pub amount: u64,
    pub service_type: ServiceType,
}

/// Request to move a milestone to a new status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneStatusChange {
    pub contract_id: String,
    pub milestone_index: usize,
    pub evidence: String,
    pub new_status: MilestoneStatus,
    pub service_provider: String,
    pub service_type: ServiceType,
}

/// Locally tracked view of a deployed agreement.
///
/// Milestone statuses change only through [`Agreement::apply_confirmed_status`],
/// fed with results the escrow API has confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agreement {
    pub contract_id: String,
    pub service_type: ServiceType,
    pub milestones: Vec<Milestone>,
}

impl Agreement {
    pub fn new(contract_id: impl Into<String>, payload: &AgreementPayload) -> Self {
        Self {
            contract_id: contract_id.into(),
            service_type: payload.service_type(),
            milestones: payload.milestones().to_vec(),
        }
    }

    pub fn apply_confirmed_status(
        &mut self,
        index: usize,
        status: MilestoneStatus,
    ) -> Result<(), MilestoneError> {
        let len = self.milestones.len();
        let milestone = self
            .milestones
            .get_mut(index)
            .ok_or(MilestoneError::IndexOutOfRange { index, len })?;
        milestone.apply_confirmed(status)
    }
}
