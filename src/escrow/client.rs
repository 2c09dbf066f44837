//! Escrow API client.
//!
//! # Responsibilities
//! - Build request bodies for the four escrow operations
//! - Authenticate with the static API key header
//! - Normalize every failure (transport, non-2xx, `success: false`,
//!   undecodable body) into an [`ApiError`] value
//!
//! Calls are never retried here; a retry is a caller decision that starts
//! over with a fresh unsigned envelope.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::blockchain::SignedTransaction;
use crate::config::ApiConfig;
use crate::escrow::requests::{DeployBody, FundBody, MilestoneStatusBody, SendTransactionBody};
use crate::escrow::types::{AgreementPayload, FundRequest, MilestoneStatusChange, ServiceType};
use crate::observability::metrics;

/// Header carrying the static API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Path of the submission endpoint.
pub const SEND_TRANSACTION_PATH: &str = "helper/send-transaction";

/// Errors returned by the escrow API client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Client could not be built from configuration.
    #[error("invalid API configuration: {0}")]
    Config(String),

    /// Request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// Service answered with an error; `message` is what it reported.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Response body was not JSON.
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Result type for escrow API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// The remote escrow service as seen by the orchestrator.
#[async_trait]
pub trait EscrowApi: Send + Sync {
    /// Request an unsigned deployment envelope for a new agreement.
    async fn create_agreement(&self, payload: &AgreementPayload) -> ApiResult<Value>;

    /// Request an unsigned funding envelope.
    async fn fund_escrow(&self, request: &FundRequest) -> ApiResult<Value>;

    /// Request an unsigned envelope moving a milestone to a new status.
    async fn change_milestone_status(&self, change: &MilestoneStatusChange) -> ApiResult<Value>;

    /// Broadcast a signed envelope. Consumes it.
    async fn submit_transaction(&self, signed: SignedTransaction) -> ApiResult<Value>;
}

/// HTTP implementation of [`EscrowApi`].
#[derive(Clone)]
pub struct EscrowApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl EscrowApiClient {
    /// Create a client from configuration.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let parsed = url::Url::parse(&config.base_url)
            .map_err(|e| ApiError::Config(format!("invalid base URL '{}': {}", config.base_url, e)))?;

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| ApiError::Config("API key is not a valid header value".to_string()))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        tracing::info!(base_url = %parsed, "Escrow API client initialized");

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        let started = Instant::now();
        let result = self.send(path, body).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::record_api_request(path, outcome, started.elapsed());

        match &result {
            Ok(_) => tracing::debug!(endpoint = path, "Escrow API request succeeded"),
            Err(e) => tracing::warn!(endpoint = path, error = %e, "Escrow API request failed"),
        }
        result
    }

    async fn send<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        let response = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let parsed: Option<Value> = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&text).ok()
        };

        if !status.is_success() {
            let message = parsed
                .as_ref()
                .and_then(reported_error)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = match parsed {
            Some(body) => body,
            None if text.trim().is_empty() => Value::Null,
            None => return Err(ApiError::Decode(format!("expected JSON, got {} bytes", text.len()))),
        };

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let message = reported_error(&body).unwrap_or_else(|| "request rejected".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

/// Error text reported by the service, if any.
fn reported_error(body: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .filter_map(|field| body.get(*field))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(o) => o.get("message").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
}

fn deploy_path(service_type: ServiceType) -> String {
    format!("deployer/{}", service_type.as_str())
}

fn escrow_path(service_type: ServiceType, action: &str) -> String {
    format!("escrow/{}/{}", service_type.as_str(), action)
}

#[async_trait]
impl EscrowApi for EscrowApiClient {
    async fn create_agreement(&self, payload: &AgreementPayload) -> ApiResult<Value> {
        let body = DeployBody::from_payload(payload);
        self.post(&deploy_path(payload.service_type()), &body).await
    }

    async fn fund_escrow(&self, request: &FundRequest) -> ApiResult<Value> {
        let body = FundBody::from_request(request);
        self.post(&escrow_path(request.service_type, "fund-escrow"), &body)
            .await
    }

    async fn change_milestone_status(&self, change: &MilestoneStatusChange) -> ApiResult<Value> {
        let body = MilestoneStatusBody::from_change(change);
        self.post(
            &escrow_path(change.service_type, "change-milestone-status"),
            &body,
        )
        .await
    }

    async fn submit_transaction(&self, signed: SignedTransaction) -> ApiResult<Value> {
        let xdr = signed.into_xdr();
        let body = SendTransactionBody { signed_xdr: &xdr };
        self.post(SEND_TRANSACTION_PATH, &body).await
    }
}

impl std::fmt::Debug for EscrowApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
