//! Client side of the relay
//!
//! [`ChatTransport`] is the seam the controller talks through; [`RelayClient`]
//! is the production implementation over HTTP.

use crate::error::ChatError;
use crate::relay::ErrorResponse;
use crate::stream::{decode_stream, EventStream};
use crate::transcript::Turn;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:8000/chat";

/// Sends a conversation and opens the reply stream
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the full conversation. `Err` means no stream was opened.
    async fn open(&self, turns: &[Turn]) -> Result<EventStream, ChatError>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn open(&self, turns: &[Turn]) -> Result<EventStream, ChatError> {
        (**self).open(turns).await
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub relay_url: String,
    pub connect_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            relay_url: std::env::var("CHAT_RELAY_URL")
                .unwrap_or_else(|_| DEFAULT_RELAY_URL.to_string()),
            connect_timeout: std::env::var("CHAT_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
        }
    }
}

#[derive(Serialize)]
struct OutgoingChat<'a> {
    messages: &'a [Turn],
}

/// HTTP transport to a running relay
pub struct RelayClient {
    client: reqwest::Client,
    url: String,
}

impl RelayClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ChatError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ChatError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.relay_url.clone(),
        })
    }
}

#[async_trait]
impl ChatTransport for RelayClient {
    async fn open(&self, turns: &[Turn]) -> Result<EventStream, ChatError> {
        let response = self
            .client
            .post(&self.url)
            .json(&OutgoingChat { messages: turns })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    ChatError::network(format!("Connection failed: {e}"))
                } else {
                    ChatError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| ChatError::network(format!("Failed to read response: {e}")))?;
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| format!("HTTP {status}: {body}"));
            tracing::debug!(status = status.as_u16(), error = %message, "Relay refused request");
            return Err(ChatError::from_relay_status(status.as_u16(), message));
        }

        Ok(decode_stream(response.bytes_stream()))
    }
}
