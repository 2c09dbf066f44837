//! Orchestration state machine.
//!
//! # State Transitions
//! ```text
//! Idle ──Start──▶ Requesting
//! Requesting ──ApiResponded(envelope, connected)──▶ Signing
//! Requesting ──ApiResponded(envelope, not connected)──▶ AwaitingWallet
//! Requesting ──ApiResponded(no envelope) | ApiFailed──▶ Failed(api)
//! AwaitingWallet ──WalletConnected──▶ Signing
//! AwaitingWallet ──WalletConnectFailed──▶ Failed(wallet-connect)
//! AwaitingWallet ──TimedOut(Connect)──▶ Failed(timeout)
//! Signing ──Signed──▶ Submitting
//! Signing ──SigningFailed──▶ Failed(signing)
//! Signing ──TimedOut(Sign)──▶ Failed(timeout)
//! Submitting ──Submitted──▶ Succeeded
//! Submitting ──SubmissionFailed──▶ Failed(submission)
//! any non-terminal ──Cancelled──▶ Failed(cancelled)
//! any non-terminal ──anything else──▶ Failed(internal)
//! ```
//!
//! Terminal states absorb every event. The function is pure; the engine
//! owns the envelopes and messages that go with each event.

use std::fmt;

use crate::orchestrator::result::FailureStage;

/// Where an orchestration is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    /// API call in flight.
    Requesting,
    /// Envelope in hand, no session yet.
    AwaitingWallet,
    /// Sign request in flight.
    Signing,
    /// Submission in flight.
    Submitting,
    Succeeded,
    Failed(FailureStage),
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Succeeded | State::Failed(_))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Idle => f.write_str("idle"),
            State::Requesting => f.write_str("requesting"),
            State::AwaitingWallet => f.write_str("awaiting-wallet"),
            State::Signing => f.write_str("signing"),
            State::Submitting => f.write_str("submitting"),
            State::Succeeded => f.write_str("succeeded"),
            State::Failed(stage) => write!(f, "failed({})", stage),
        }
    }
}

/// A bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStep {
    Connect,
    Sign,
}

/// Outcome of the step run in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start,
    /// The API call succeeded. `envelope` is false when the response
    /// carried no usable unsigned transaction.
    ApiResponded { envelope: bool, wallet_connected: bool },
    ApiFailed,
    WalletConnected,
    WalletConnectFailed,
    Signed,
    SigningFailed,
    Submitted,
    SubmissionFailed,
    TimedOut(WaitStep),
    Cancelled,
    Internal,
}

/// Next state for `event` in `state`.
pub fn transition(state: State, event: &Event) -> State {
    use Event::*;
    use State::*;

    if state.is_terminal() {
        return state;
    }

    match (state, event) {
        (_, Cancelled) => Failed(FailureStage::Cancelled),

        (Idle, Start) => Requesting,

        (Requesting, ApiResponded { envelope: false, .. }) => Failed(FailureStage::Api),
        (Requesting, ApiResponded { wallet_connected: true, .. }) => Signing,
        (Requesting, ApiResponded { wallet_connected: false, .. }) => AwaitingWallet,
        (Requesting, ApiFailed) => Failed(FailureStage::Api),

        (AwaitingWallet, WalletConnected) => Signing,
        (AwaitingWallet, WalletConnectFailed) => Failed(FailureStage::WalletConnect),
        (AwaitingWallet, TimedOut(WaitStep::Connect)) => Failed(FailureStage::Timeout),

        (Signing, Signed) => Submitting,
        (Signing, SigningFailed) => Failed(FailureStage::Signing),
        (Signing, TimedOut(WaitStep::Sign)) => Failed(FailureStage::Timeout),

        (Submitting, Submitted) => Succeeded,
        (Submitting, SubmissionFailed) => Failed(FailureStage::Submission),

        _ => Failed(FailureStage::Internal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(events: &[Event]) -> State {
        events.iter().fold(State::Idle, |state, event| transition(state, event))
    }

    const ENVELOPE_CONNECTED: Event = Event::ApiResponded {
        envelope: true,
        wallet_connected: true,
    };
    const ENVELOPE_DISCONNECTED: Event = Event::ApiResponded {
        envelope: true,
        wallet_connected: false,
    };

    #[test]
    fn test_happy_path_with_session() {
        let state = run(&[Event::Start, ENVELOPE_CONNECTED, Event::Signed, Event::Submitted]);
        assert_eq!(state, State::Succeeded);
    }

    #[test]
    fn test_happy_path_through_connect() {
        assert_eq!(run(&[Event::Start, ENVELOPE_DISCONNECTED]), State::AwaitingWallet);
        let state = run(&[
            Event::Start,
            ENVELOPE_DISCONNECTED,
            Event::WalletConnected,
            Event::Signed,
            Event::Submitted,
        ]);
        assert_eq!(state, State::Succeeded);
    }

    #[test]
    fn test_missing_envelope_is_api_failure() {
        for wallet_connected in [true, false] {
            let state = run(&[
                Event::Start,
                Event::ApiResponded {
                    envelope: false,
                    wallet_connected,
                },
            ]);
            assert_eq!(state, State::Failed(FailureStage::Api));
        }
    }

    #[test]
    fn test_each_failure_stage() {
        assert_eq!(run(&[Event::Start, Event::ApiFailed]), State::Failed(FailureStage::Api));
        assert_eq!(
            run(&[Event::Start, ENVELOPE_DISCONNECTED, Event::WalletConnectFailed]),
            State::Failed(FailureStage::WalletConnect)
        );
        assert_eq!(
            run(&[Event::Start, ENVELOPE_CONNECTED, Event::SigningFailed]),
            State::Failed(FailureStage::Signing)
        );
        assert_eq!(
            run(&[Event::Start, ENVELOPE_CONNECTED, Event::Signed, Event::SubmissionFailed]),
            State::Failed(FailureStage::Submission)
        );
    }

    #[test]
    fn test_internal_event_in_idle_fails() {
        assert_eq!(run(&[Event::Internal]), State::Failed(FailureStage::Internal));
    }

    #[test]
    fn test_timeouts_only_on_wallet_waits() {
        assert_eq!(
            run(&[Event::Start, ENVELOPE_DISCONNECTED, Event::TimedOut(WaitStep::Connect)]),
            State::Failed(FailureStage::Timeout)
        );
        assert_eq!(
            run(&[Event::Start, ENVELOPE_CONNECTED, Event::TimedOut(WaitStep::Sign)]),
            State::Failed(FailureStage::Timeout)
        );
        assert_eq!(
            run(&[Event::Start, Event::TimedOut(WaitStep::Connect)]),
            State::Failed(FailureStage::Internal)
        );
        assert_eq!(
            run(&[Event::Start, ENVELOPE_CONNECTED, Event::TimedOut(WaitStep::Connect)]),
            State::Failed(FailureStage::Internal)
        );
    }

    #[test]
    fn test_cancel_from_any_live_state() {
        for prefix in [
            &[][..],
            &[Event::Start][..],
            &[Event::Start, ENVELOPE_DISCONNECTED][..],
            &[Event::Start, ENVELOPE_CONNECTED][..],
            &[Event::Start, ENVELOPE_CONNECTED, Event::Signed][..],
        ] {
            let mut events = prefix.to_vec();
            events.push(Event::Cancelled);
            assert_eq!(run(&events), State::Failed(FailureStage::Cancelled));
        }
    }

    #[test]
    fn test_terminal_states_absorb() {
        let done = run(&[Event::Start, ENVELOPE_CONNECTED, Event::Signed, Event::Submitted]);
        assert_eq!(transition(done, &Event::Cancelled), State::Succeeded);
        assert_eq!(transition(done, &Event::SubmissionFailed), State::Succeeded);

        let failed = State::Failed(FailureStage::Signing);
        assert_eq!(transition(failed, &Event::Start), failed);
    }

    #[test]
    fn test_out_of_order_events_are_internal() {
        assert_eq!(run(&[Event::Signed]), State::Failed(FailureStage::Internal));
        assert_eq!(
            run(&[Event::Start, ENVELOPE_CONNECTED, Event::Submitted]),
            State::Failed(FailureStage::Internal)
        );
        assert_eq!(run(&[Event::Start, Event::Internal]), State::Failed(FailureStage::Internal));
    }

    #[test]
    fn test_display() {
        assert_eq!(State::AwaitingWallet.to_string(), "awaiting-wallet");
        assert_eq!(State::Failed(FailureStage::WalletConnect).to_string(), "failed(wallet-connect)");
    }
}
