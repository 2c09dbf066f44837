//! Escrow API client against a mock service.

use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use escrow_orchestrator::config::ApiConfig;
use escrow_orchestrator::escrow::{
    AgreementDraft, AgreementPayload, ApiError, EscrowApi, EscrowApiClient, FundRequest,
    Milestone, MilestoneStatus, ServiceType,
};

mod common;

fn multi_release_payload() -> AgreementPayload {
    AgreementPayload::new(AgreementDraft {
        service_type: ServiceType::MultiRelease,
        engagement_id: None,
        title: "Mobile app".into(),
        description: "Two phases".into(),
        amount: 900,
        platform_fee: 1,
        roles: common::roles(),
        milestones: vec![
            Milestone {
                description: "Prototype".into(),
                amount: Some(300),
                status: MilestoneStatus::Pending,
            },
            Milestone {
                description: "Release".into(),
                amount: Some(600),
                status: MilestoneStatus::Pending,
            },
        ],
        notification_emails: vec!["pm@example.com".into()],
    })
    .unwrap()
}

#[tokio::test]
async fn test_multi_release_deploy_shape() {
    let server = common::escrow_service().await;
    common::mount_post(
        &server,
        "/deployer/multi-release",
        200,
        json!({"status": "SUCCESS", "unsignedTransaction": "AAAA"}),
    )
    .await;

    let client = EscrowApiClient::new(&common::api_config(&server)).unwrap();
    let response = client.create_agreement(&multi_release_payload()).await.unwrap();
    assert_eq!(response["unsignedTransaction"], "AAAA");

    let body = &common::bodies_sent_to(&server, "/deployer/multi-release").await[0];
    assert!(body.get("amount").is_none());
    assert_eq!(body["milestones"][0], json!({"description": "Prototype", "amount": 300}));
    assert_eq!(body["milestones"][1]["amount"], 600);
    assert_eq!(body["roles"]["serviceProvider"], "GPROVIDER");
    assert_eq!(body["notificationEmails"], json!(["pm@example.com"]));
}

#[tokio::test]
async fn test_fund_body_and_api_key() {
    let server = common::escrow_service().await;
    Mock::given(method("POST"))
        .and(path("/escrow/multi-release/fund-escrow"))
        .and(header("x-api-key", common::API_KEY))
        .and(body_json(json!({"contractId": "CFUND", "signer": "GFUNDER", "amount": 900})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unsignedTransaction": "XF"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = EscrowApiClient::new(&common::api_config(&server)).unwrap();
    let response = client
        .fund_escrow(&FundRequest {
            contract_id: "CFUND".into(),
            funder: "GFUNDER".into(),
            amount: 900,
            service_type: ServiceType::MultiRelease,
        })
        .await
        .unwrap();
    assert_eq!(response["unsignedTransaction"], "XF");
}

#[tokio::test]
async fn test_non_json_error_reports_status_code() {
    let server = common::escrow_service().await;
    Mock::given(method("POST"))
        .and(path("/deployer/multi-release"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let client = EscrowApiClient::new(&common::api_config(&server)).unwrap();
    let err = client.create_agreement(&multi_release_payload()).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Status {
            status: 502,
            message: "HTTP 502".into(),
        }
    );
}

#[tokio::test]
async fn test_undecodable_success_body() {
    let server = common::escrow_service().await;
    Mock::given(method("POST"))
        .and(path("/deployer/multi-release"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = EscrowApiClient::new(&common::api_config(&server)).unwrap();
    let err = client.create_agreement(&multi_release_payload()).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)), "{:?}", err);
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let server = common::escrow_service().await;
    Mock::given(method("POST"))
        .and(path("/deployer/multi-release"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = EscrowApiClient::new(&common::api_config(&server)).unwrap();
    let response = client.create_agreement(&multi_release_payload()).await.unwrap();
    assert_eq!(response, Value::Null);
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    // Nothing listens on port 1.
    let client = EscrowApiClient::new(&ApiConfig {
        base_url: "http://127.0.0.1:1".into(),
        api_key: common::API_KEY.into(),
        request_timeout_secs: 2,
    })
    .unwrap();

    let err = client.create_agreement(&multi_release_payload()).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)), "{:?}", err);
}
