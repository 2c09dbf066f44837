//! Orchestration engine.
//!
//! Drives one intent through the state machine: each non-terminal state
//! runs exactly one async step, the step's outcome becomes an [`Event`], and
//! [`transition`] picks the next state. Envelopes live in single-use slots
//! that each step takes from, so nothing can be signed or submitted twice.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::{SignedTransaction, UnsignedTransaction};
use crate::escrow::{
    AgreementPayload, EscrowApi, FundRequest, MilestoneStatus, MilestoneStatusChange, ServiceType,
};
use crate::observability::metrics;
use crate::orchestrator::result::{FailureStage, Operation, OperationFailure, OperationResult};
use crate::orchestrator::state::{transition, Event, State, WaitStep};
use crate::resilience::or_cancel;
use crate::wallet::{WalletError, WalletSessionManager};

/// What to ask the escrow service for.
#[derive(Debug, Clone)]
pub enum TransactionIntent {
    CreateAgreement(AgreementPayload),
    FundEscrow(FundRequest),
    ChangeMilestoneStatus(MilestoneStatusChange),
}

impl TransactionIntent {
    pub fn operation(&self) -> Operation {
        match self {
            TransactionIntent::CreateAgreement(_) => Operation::CreateAgreement,
            TransactionIntent::FundEscrow(_) => Operation::FundEscrow,
            TransactionIntent::ChangeMilestoneStatus(_) => Operation::ChangeMilestoneStatus,
        }
    }
}

/// Runs escrow operations end to end: request, connect, sign, submit.
///
/// Cheap to clone; clones share the API client and the wallet session.
#[derive(Clone)]
pub struct Orchestrator {
    api: Arc<dyn EscrowApi>,
    wallet: Arc<WalletSessionManager>,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn EscrowApi>, wallet: Arc<WalletSessionManager>) -> Self {
        Self { api, wallet }
    }

    pub fn wallet(&self) -> &Arc<WalletSessionManager> {
        &self.wallet
    }

    /// Deploy a new agreement.
    pub async fn create_agreement(&self, payload: AgreementPayload) -> OperationResult {
        self.execute(TransactionIntent::CreateAgreement(payload), CancellationToken::new())
            .await
    }

    /// Fund a deployed escrow.
    pub async fn fund_escrow(&self, request: FundRequest) -> OperationResult {
        self.execute(TransactionIntent::FundEscrow(request), CancellationToken::new())
            .await
    }

    /// Move a milestone to a new status.
    pub async fn change_milestone_status(&self, change: MilestoneStatusChange) -> OperationResult {
        self.execute(TransactionIntent::ChangeMilestoneStatus(change), CancellationToken::new())
            .await
    }

    /// Mark a milestone approved.
    pub async fn approve_milestone(
        &self,
        contract_id: &str,
        milestone_index: usize,
        evidence: &str,
        service_provider: &str,
        service_type: ServiceType,
    ) -> OperationResult {
        self.change_milestone_status(MilestoneStatusChange {
            contract_id: contract_id.to_string(),
            milestone_index,
            evidence: evidence.to_string(),
            new_status: MilestoneStatus::Approved,
            service_provider: service_provider.to_string(),
            service_type,
        })
        .await
    }

    /// Mark an approved milestone released.
    pub async fn release_milestone(
        &self,
        contract_id: &str,
        milestone_index: usize,
        evidence: &str,
        service_provider: &str,
        service_type: ServiceType,
    ) -> OperationResult {
        self.change_milestone_status(MilestoneStatusChange {
            contract_id: contract_id.to_string(),
            milestone_index,
            evidence: evidence.to_string(),
            new_status: MilestoneStatus::Released,
            service_provider: service_provider.to_string(),
            service_type,
        })
        .await
    }

    /// Run `intent` to a terminal result, abandoning it if `cancel` fires.
    ///
    /// The flow runs on its own task, so a panic inside a collaborator is
    /// reported as `Failed(internal)` instead of unwinding into the caller.
    /// Dropping the returned future cancels the flow.
    pub async fn execute(&self, intent: TransactionIntent, cancel: CancellationToken) -> OperationResult {
        let operation = intent.operation();
        let guard = cancel.clone().drop_guard();
        let this = self.clone();

        let joined = tokio::spawn(async move { this.run(intent, &cancel).await }).await;
        guard.disarm();

        match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(operation = %operation, error = %e, "Orchestration task aborted");
                metrics::record_orchestration(operation.as_str(), FailureStage::Internal.as_str(), Default::default());
                OperationResult::Failed(OperationFailure {
                    operation,
                    stage: FailureStage::Internal,
                    message: "orchestration aborted unexpectedly".to_string(),
                })
            }
        }
    }

    async fn run(&self, intent: TransactionIntent, cancel: &CancellationToken) -> OperationResult {
        let operation = intent.operation();
        let span = tracing::info_span!(
            "orchestration",
            operation = %operation,
            orchestration_id = %Uuid::new_v4(),
        );

        async move {
            let started = Instant::now();
            let mut flow = Flow {
                api: self.api.as_ref(),
                wallet: self.wallet.as_ref(),
                cancel,
                unsigned: None,
                signed: None,
                response: None,
                message: None,
            };

            let mut state = State::Idle;
            let mut event = Event::Start;
            loop {
                let next = transition(state, &event);
                tracing::debug!(from = %state, to = %next, ?event, "Orchestration transition");
                state = next;

                event = match state {
                    State::Requesting => flow.request(&intent).await,
                    State::AwaitingWallet => flow.connect().await,
                    State::Signing => flow.sign().await,
                    State::Submitting => flow.submit().await,
                    // `Start` always leaves `Idle`, so reaching it here is a bug.
                    State::Idle => Event::Internal,
                    State::Succeeded | State::Failed(_) => break,
                };
            }

            let elapsed = started.elapsed();
            match state {
                State::Failed(stage) => {
                    let message = flow.message.take().unwrap_or_else(|| default_message(stage));
                    metrics::record_orchestration(operation.as_str(), stage.as_str(), elapsed);
                    tracing::warn!(stage = %stage, error = %message, "Orchestration failed");
                    OperationResult::Failed(OperationFailure {
                        operation,
                        stage,
                        message,
                    })
                }
                _ => {
                    metrics::record_orchestration(operation.as_str(), "succeeded", elapsed);
                    tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "Orchestration succeeded");
                    OperationResult::Succeeded {
                        operation,
                        response: flow.response.take().unwrap_or(Value::Null),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator").field("wallet", &self.wallet).finish()
    }
}

fn default_message(stage: FailureStage) -> String {
    match stage {
        FailureStage::Cancelled => "cancelled by caller".to_string(),
        FailureStage::Internal => "unexpected orchestration state".to_string(),
        other => format!("{} step failed", other),
    }
}

/// Per-run slots. Each envelope is taken exactly once.
struct Flow<'a> {
    api: &'a dyn EscrowApi,
    wallet: &'a WalletSessionManager,
    cancel: &'a CancellationToken,
    unsigned: Option<UnsignedTransaction>,
    signed: Option<SignedTransaction>,
    response: Option<Value>,
    message: Option<String>,
}

impl Flow<'_> {
    fn fail(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    async fn request(&mut self, intent: &TransactionIntent) -> Event {
        let api = self.api;
        let call = async move {
            match intent {
                TransactionIntent::CreateAgreement(payload) => api.create_agreement(payload).await,
                TransactionIntent::FundEscrow(request) => api.fund_escrow(request).await,
                TransactionIntent::ChangeMilestoneStatus(change) => {
                    api.change_milestone_status(change).await
                }
            }
        };

        match or_cancel(self.cancel, call).await {
            None => Event::Cancelled,
            Some(Err(e)) => {
                self.fail(e.to_string());
                Event::ApiFailed
            }
            Some(Ok(body)) => {
                self.unsigned = UnsignedTransaction::from_response(&body, self.wallet.network());
                if self.unsigned.is_none() {
                    self.fail("no transaction returned");
                    return Event::ApiResponded {
                        envelope: false,
                        wallet_connected: self.wallet.is_connected(),
                    };
                }
                // A restored session that cannot be resumed is dropped here,
                // which routes the flow through the connect step.
                match or_cancel(self.cancel, self.wallet.resume_restored()).await {
                    None => Event::Cancelled,
                    Some(wallet_connected) => Event::ApiResponded {
                        envelope: true,
                        wallet_connected,
                    },
                }
            }
        }
    }

    /// Connects for the envelope's network, which the response may have
    /// overridden.
    async fn connect(&mut self) -> Event {
        let network = match &self.unsigned {
            Some(unsigned) => unsigned.network().clone(),
            None => self.wallet.network().clone(),
        };
        match self.wallet.connect_until(self.cancel, &network).await {
            None => Event::Cancelled,
            Some(Ok(_)) => Event::WalletConnected,
            Some(Err(e @ WalletError::Timeout(_))) => {
                self.fail(e.to_string());
                Event::TimedOut(WaitStep::Connect)
            }
            Some(Err(e)) => {
                self.fail(e.to_string());
                Event::WalletConnectFailed
            }
        }
    }

    async fn sign(&mut self) -> Event {
        let Some(unsigned) = self.unsigned.take() else {
            self.fail("no envelope to sign");
            return Event::Internal;
        };

        match or_cancel(self.cancel, self.wallet.sign(unsigned)).await {
            None => Event::Cancelled,
            Some(Ok(signed)) => {
                self.signed = Some(signed);
                Event::Signed
            }
            Some(Err(e @ WalletError::Timeout(_))) => {
                self.fail(e.to_string());
                Event::TimedOut(WaitStep::Sign)
            }
            Some(Err(e)) => {
                self.fail(e.to_string());
                Event::SigningFailed
            }
        }
    }

    /// Not raced against cancellation: once the envelope has left, only the
    /// service's reply says whether it landed.
    async fn submit(&mut self) -> Event {
        let Some(signed) = self.signed.take() else {
            self.fail("no signed envelope to submit");
            return Event::Internal;
        };

        match self.api.submit_transaction(signed).await {
            Ok(response) => {
                self.response = Some(response);
                Event::Submitted
            }
            Err(e) => {
                self.fail(e.to_string());
                Event::SubmissionFailed
            }
        }
    }
}
