//! Round-trip state machine
//!
//! Pure transitions: given a state and an event, produce the next state and
//! the effects the controller must carry out. No I/O happens here.

use crate::error::ChatError;
use thiserror::Error;

/// Where a round-trip stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RoundTripState {
    /// No round-trip has run yet
    #[default]
    Idle,
    /// User turn appended, waiting for the first delta
    Sending,
    /// At least one delta folded into the pending reply
    Streaming { deltas: usize },
    /// Reply committed
    Completed,
    /// Transcript restored to its pre-round-trip contents
    RolledBack,
}

impl RoundTripState {
    /// Whether a round-trip is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Sending | Self::Streaming { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Sending => "sending",
            Self::Streaming { .. } => "streaming",
            Self::Completed => "completed",
            Self::RolledBack => "rolled_back",
        }
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundTripEvent {
    /// Caller submitted trimmed, non-empty text
    Submit { text: String },
    /// Decoder produced a text fragment
    Delta(String),
    /// `[DONE]` or the stream closed on its own
    Finished,
    /// Transport, relay or stream failure, or cancellation
    Failed(ChatError),
}

/// Work for the controller after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Record the rollback point, then append the user turn
    AppendUserTurn(String),
    /// Create the pending assistant reply
    OpenReply,
    AppendReply(String),
    /// Move the pending reply into the transcript
    CommitReply,
    /// Truncate to the rollback point and drop the pending reply
    Rollback,
    NotifyDelta(String),
    NotifyDone,
    NotifyError(ChatError),
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: RoundTripState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: RoundTripState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A reply is still streaming, wait for it to finish")]
    Busy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl From<TransitionError> for ChatError {
    fn from(err: TransitionError) -> Self {
        ChatError::invalid_state(err.to_string())
    }
}

/// Pure transition function
pub fn transition(
    state: &RoundTripState,
    event: RoundTripEvent,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Optimistic append, then the relay call
        (
            RoundTripState::Idle | RoundTripState::Completed | RoundTripState::RolledBack,
            RoundTripEvent::Submit { text },
        ) => Ok(TransitionResult::new(RoundTripState::Sending)
            .with_effect(Effect::AppendUserTurn(text))),

        (RoundTripState::Sending | RoundTripState::Streaming { .. }, RoundTripEvent::Submit { .. }) => {
            Err(TransitionError::Busy)
        }

        (RoundTripState::Sending, RoundTripEvent::Delta(text)) => {
            Ok(TransitionResult::new(RoundTripState::Streaming { deltas: 1 })
                .with_effect(Effect::OpenReply)
                .with_effect(Effect::AppendReply(text.clone()))
                .with_effect(Effect::NotifyDelta(text)))
        }

        (RoundTripState::Streaming { deltas }, RoundTripEvent::Delta(text)) => {
            Ok(TransitionResult::new(RoundTripState::Streaming {
                deltas: deltas + 1,
            })
            .with_effect(Effect::AppendReply(text.clone()))
            .with_effect(Effect::NotifyDelta(text)))
        }

        // Finished before any delta: the user turn stays, there is no reply to commit
        (RoundTripState::Sending, RoundTripEvent::Finished) => {
            Ok(TransitionResult::new(RoundTripState::Completed).with_effect(Effect::NotifyDone))
        }

        (RoundTripState::Streaming { .. }, RoundTripEvent::Finished) => {
            Ok(TransitionResult::new(RoundTripState::Completed)
                .with_effect(Effect::CommitReply)
                .with_effect(Effect::NotifyDone))
        }

        (RoundTripState::Sending | RoundTripState::Streaming { .. }, RoundTripEvent::Failed(err)) => {
            Ok(TransitionResult::new(RoundTripState::RolledBack)
                .with_effect(Effect::Rollback)
                .with_effect(Effect::NotifyError(err)))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} while {}",
            state.name()
        ))),
    }
}
