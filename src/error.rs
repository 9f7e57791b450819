//! Chat error types

use thiserror::Error;

/// Chat error with classification
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ChatError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn payment_required(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PaymentRequired, message)
    }

    pub fn gateway(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Gateway, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn empty_input() -> Self {
        Self::new(ErrorKind::EmptyInput, "Message is empty")
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "Request cancelled")
    }

    /// Map a relay error status back onto a kind.
    pub fn from_relay_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            429 => Self::rate_limited(message),
            402 => Self::payment_required(message),
            _ => Self::gateway(message),
        }
    }
}

/// Error classification.
///
/// Nothing here is retried automatically: repeating a streaming call can
/// duplicate partial output that was already shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Upstream credential missing
    Config,
    /// Upstream returned 429
    RateLimited,
    /// Upstream returned 402
    PaymentRequired,
    /// Any other upstream or relay failure
    Gateway,
    /// Connection failed or dropped
    Network,
    /// Relay request body could not be parsed
    InvalidRequest,
    /// Blank submission, rejected before any state change
    EmptyInput,
    /// Round-trip aborted by the caller
    Cancelled,
    /// Controller asked to do something its current state forbids
    InvalidState,
}
