//! Orchestration outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which orchestration ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    CreateAgreement,
    FundEscrow,
    ChangeMilestoneStatus,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateAgreement => "create-agreement",
            Operation::FundEscrow => "fund-escrow",
            Operation::ChangeMilestoneStatus => "change-milestone-status",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a failed orchestration stopped.
///
/// Each stage implies a different remedy, so callers must keep the tag
/// even when they rewrite the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureStage {
    /// The escrow service was unreachable, refused, or returned no envelope.
    Api,
    /// No wallet could be connected.
    WalletConnect,
    /// The wallet declined or failed to sign.
    Signing,
    /// The signed envelope was not accepted.
    Submission,
    /// A wallet wait exceeded its configured bound.
    Timeout,
    /// The caller abandoned the flow.
    Cancelled,
    /// The orchestration itself misbehaved.
    Internal,
}

/// What the user can do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Remedy {
    RetryLater,
    ReconnectWallet,
    ReapproveInWallet,
    RestartFlow,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Api => "api",
            FailureStage::WalletConnect => "wallet-connect",
            FailureStage::Signing => "signing",
            FailureStage::Submission => "submission",
            FailureStage::Timeout => "timeout",
            FailureStage::Cancelled => "cancelled",
            FailureStage::Internal => "internal",
        }
    }

    pub fn remedy(&self) -> Remedy {
        match self {
            FailureStage::Api => Remedy::RetryLater,
            FailureStage::WalletConnect => Remedy::ReconnectWallet,
            FailureStage::Signing | FailureStage::Timeout => Remedy::ReapproveInWallet,
            FailureStage::Submission | FailureStage::Cancelled | FailureStage::Internal => {
                Remedy::RestartFlow
            }
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed orchestration: the stage tag plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationFailure {
    pub operation: Operation,
    pub stage: FailureStage,
    pub message: String,
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed at {}: {}", self.operation, self.stage, self.message)
    }
}

impl std::error::Error for OperationFailure {}

/// Terminal result of one orchestration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum OperationResult {
    /// The signed envelope was accepted; `response` is the submission reply.
    Succeeded { operation: Operation, response: Value },
    Failed(OperationFailure),
}

impl OperationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Succeeded { .. })
    }

    pub fn operation(&self) -> Operation {
        match self {
            OperationResult::Succeeded { operation, .. } => *operation,
            OperationResult::Failed(failure) => failure.operation,
        }
    }

    /// Stage tag, if the orchestration failed.
    pub fn stage(&self) -> Option<FailureStage> {
        match self {
            OperationResult::Succeeded { .. } => None,
            OperationResult::Failed(failure) => Some(failure.stage),
        }
    }

    pub fn into_result(self) -> Result<Value, OperationFailure> {
        match self {
            OperationResult::Succeeded { response, .. } => Ok(response),
            OperationResult::Failed(failure) => Err(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remedies_differ_by_stage() {
        assert_eq!(FailureStage::Api.remedy(), Remedy::RetryLater);
        assert_eq!(FailureStage::WalletConnect.remedy(), Remedy::ReconnectWallet);
        assert_eq!(FailureStage::Signing.remedy(), Remedy::ReapproveInWallet);
        assert_eq!(FailureStage::Submission.remedy(), Remedy::RestartFlow);
    }

    #[test]
    fn test_result_serializes_with_stage_tag() {
        let failed = OperationResult::Failed(OperationFailure {
            operation: Operation::FundEscrow,
            stage: FailureStage::WalletConnect,
            message: "Wallet request cancelled by user".into(),
        });
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({
                "status": "failed",
                "operation": "fund-escrow",
                "stage": "wallet-connect",
                "message": "Wallet request cancelled by user",
            })
        );

        let ok = OperationResult::Succeeded {
            operation: Operation::CreateAgreement,
            response: json!({"status": "SUCCESS"}),
        };
        assert_eq!(serde_json::to_value(&ok).unwrap()["status"], "succeeded");
        assert_eq!(ok.stage(), None);
    }

    #[test]
    fn test_failure_display() {
        let failure = OperationFailure {
            operation: Operation::CreateAgreement,
            stage: FailureStage::Api,
            message: "HTTP 500".into(),
        };
        assert_eq!(failure.to_string(), "create-agreement failed at api: HTTP 500");
    }
}
