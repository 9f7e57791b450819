//! Upstream completion API client

use super::types::{UpstreamMessage, UpstreamRequest};
use crate::error::ChatError;
use crate::transcript::{Role, Turn};
use reqwest::Client;

/// Opens streaming completions against an OpenAI-compatible endpoint
pub struct UpstreamClient {
    client: Client,
    url: String,
    model: String,
    system_prompt: String,
}

impl UpstreamClient {
    pub fn new(url: &str, model: &str, system_prompt: String) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            model: model.to_string(),
            system_prompt,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// System instruction first, then the conversation as given
    fn build_request<'a>(&'a self, messages: &'a [Turn]) -> UpstreamRequest<'a> {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        wire.push(UpstreamMessage {
            role: "system",
            content: &self.system_prompt,
        });
        wire.extend(messages.iter().map(|turn| UpstreamMessage {
            role: match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &turn.content,
        }));

        UpstreamRequest {
            model: &self.model,
            messages: wire,
            stream: true,
        }
    }

    /// Make one streaming request.
    ///
    /// Only the status is inspected; on success the response body is handed
    /// back unread.
    pub async fn open_stream(
        &self,
        api_key: &str,
        messages: &[Turn],
    ) -> Result<reqwest::Response, ChatError> {
        let request = self.build_request(messages);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&request)
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
        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            429 => Err(ChatError::rate_limited(
                "Rate limits exceeded, please try again later.",
            )),
            402 => Err(ChatError::payment_required(
                "Payment required, please add funds to your Lovable AI workspace.",
            )),
            code => {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(status = code, body = %body, "AI gateway error");
                Err(ChatError::gateway("AI gateway error"))
            }
        }
    }
}
