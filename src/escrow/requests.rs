//! Wire bodies for the escrow API.
//!
//! Service type changes the request shape but not the response contract:
//! single-release agreements carry one flat amount, multi-release ones carry
//! per-milestone amounts and address milestones through an array.

use serde::Serialize;

use crate::escrow::types::{
    AgreementPayload, FundRequest, MilestoneStatus, MilestoneStatusChange, Roles, ServiceType,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_id: Option<&'a str>,
    pub title: &'a str,
    pub description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    pub platform_fee: u32,
    pub roles: &'a Roles,
    pub milestones: Vec<DeployMilestone<'a>>,
    #[serde(skip_serializing_if = "no_emails")]
    pub notification_emails: &'a [String],
}

fn no_emails(emails: &&[String]) -> bool {
    emails.is_empty()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployMilestone<'a> {
    pub description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
}

impl<'a> DeployBody<'a> {
    pub fn from_payload(payload: &'a AgreementPayload) -> Self {
        let multi = payload.service_type() == ServiceType::MultiRelease;
        Self {
            engagement_id: payload.engagement_id(),
            title: payload.title(),
            description: payload.description(),
            amount: (!multi).then_some(payload.amount()),
            platform_fee: payload.platform_fee(),
            roles: payload.roles(),
            milestones: payload
                .milestones()
                .iter()
                .map(|m| DeployMilestone {
                    description: &m.description,
                    amount: if multi { m.amount } else { None },
                })
                .collect(),
            notification_emails: payload.notification_emails(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundBody<'a> {
    pub contract_id: &'a str,
    pub signer: &'a str,
    pub amount: u64,
}

impl<'a> FundBody<'a> {
    pub fn from_request(request: &'a FundRequest) -> Self {
        Self {
            contract_id: &request.contract_id,
            signer: &request.funder,
            amount: request.amount,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MilestoneStatusBody<'a> {
    #[serde(rename_all = "camelCase")]
    Single {
        contract_id: &'a str,
        milestone_index: String,
        new_evidence: &'a str,
        new_status: MilestoneStatus,
        service_provider: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Multi {
        contract_id: &'a str,
        service_provider: &'a str,
        milestones: Vec<MilestoneUpdate<'a>>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneUpdate<'a> {
    pub milestone_index: String,
    pub new_evidence: &'a str,
    pub new_status: MilestoneStatus,
}

impl<'a> MilestoneStatusBody<'a> {
    pub fn from_change(change: &'a MilestoneStatusChange) -> Self {
        let milestone_index = change.milestone_index.to_string();
        match change.service_type {
            ServiceType::SingleRelease => MilestoneStatusBody::Single {
                contract_id: &change.contract_id,
                milestone_index,
                new_evidence: &change.evidence,
                new_status: change.new_status,
                service_provider: &change.service_provider,
            },
            ServiceType::MultiRelease => MilestoneStatusBody::Multi {
                contract_id: &change.contract_id,
                service_provider: &change.service_provider,
                milestones: vec![MilestoneUpdate {
                    milestone_index,
                    new_evidence: &change.evidence,
                    new_status: change.new_status,
                }],
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionBody<'a> {
    pub signed_xdr: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escrow::types::{AgreementDraft, Milestone};
    use serde_json::json;

    fn payload(service_type: ServiceType) -> AgreementPayload {
        AgreementPayload::new(AgreementDraft {
            service_type,
            engagement_id: None,
            title: "Audit".into(),
            description: "Contract audit".into(),
            amount: 1000,
            platform_fee: 2,
            roles: Roles {
                approver: "GA".into(),
                service_provider: "GS".into(),
                release_signer: "GR".into(),
                receiver: "GV".into(),
                platform_address: None,
                dispute_resolver: None,
            },
            milestones: vec![
                Milestone { description: "Report".into(), amount: Some(700), status: MilestoneStatus::Pending },
                Milestone { description: "Fixes".into(), amount: Some(300), status: MilestoneStatus::Pending },
            ],
            notification_emails: vec![],
        })
        .unwrap()
    }

    #[test]
    fn test_single_release_deploy_uses_flat_amount() {
        let p = payload(ServiceType::SingleRelease);
        let body = serde_json::to_value(DeployBody::from_payload(&p)).unwrap();
        assert_eq!(body["amount"], json!(1000));
        assert_eq!(body["milestones"], json!([{ "description": "Report" }, { "description": "Fixes" }]));
        assert_eq!(body["roles"]["serviceProvider"], json!("GS"));
        assert!(body.get("notificationEmails").is_none());
        assert!(body.get("engagementId").is_none());
    }

    #[test]
    fn test_multi_release_deploy_uses_milestone_amounts() {
        let p = payload(ServiceType::MultiRelease);
        let body = serde_json::to_value(DeployBody::from_payload(&p)).unwrap();
        assert!(body.get("amount").is_none());
        assert_eq!(body["milestones"][0]["amount"], json!(700));
        assert_eq!(body["milestones"][1]["amount"], json!(300));
    }

    #[test]
    fn test_milestone_status_shapes() {
        let mut change = MilestoneStatusChange {
            contract_id: "CID".into(),
            milestone_index: 2,
            evidence: "ipfs://proof".into(),
            new_status: MilestoneStatus::Approved,
            service_provider: "GS".into(),
            service_type: ServiceType::SingleRelease,
        };

        let single = serde_json::to_value(MilestoneStatusBody::from_change(&change)).unwrap();
        assert_eq!(
            single,
            json!({
                "contractId": "CID",
                "milestoneIndex": "2",
                "newEvidence": "ipfs://proof",
                "newStatus": "approved",
                "serviceProvider": "GS",
            })
        );

        change.service_type = ServiceType::MultiRelease;
        let multi = serde_json::to_value(MilestoneStatusBody::from_change(&change)).unwrap();
        assert_eq!(
            multi,
            json!({
                "contractId": "CID",
                "serviceProvider": "GS",
                "milestones": [{
                    "milestoneIndex": "2",
                    "newEvidence": "ipfs://proof",
                    "newStatus": "approved",
                }],
            })
        );
    }

    #[test]
    fn test_fund_body() {
        let request = FundRequest {
            contract_id: "CID".into(),
            funder: "GFUNDER".into(),
            amount: 250,
            service_type: ServiceType::MultiRelease,
        };
        let body = serde_json::to_value(FundBody::from_request(&request)).unwrap();
        assert_eq!(body, json!({ "contractId": "CID", "signer": "GFUNDER", "amount": 250 }));
    }
}
