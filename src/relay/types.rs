//! Relay request and response types

use crate::transcript::Turn;
use serde::{Deserialize, Serialize};

/// Body of a relay request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Turn>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Body sent to the upstream completion API
#[derive(Debug, Serialize)]
pub(crate) struct UpstreamRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<UpstreamMessage<'a>>,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpstreamMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}
