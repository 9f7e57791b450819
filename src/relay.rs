//! HTTP relay to the upstream completion service
//!
//! Stateless: every request resolves the credential, opens one upstream
//! stream, and pipes it back untouched.

mod handlers;
mod types;
mod upstream;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;
pub use upstream::UpstreamClient;

use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_UPSTREAM_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";
const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
const DEFAULT_API_KEY_VAR: &str = "LOVABLE_API_KEY";

/// Relay configuration, read from the environment at startup
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub upstream_url: String,
    pub model: String,
    /// Name of the environment variable holding the upstream credential
    pub api_key_var: String,
    pub system_prompt_file: Option<PathBuf>,
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("RELAY_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            upstream_url: std::env::var("RELAY_UPSTREAM_URL")
                .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string()),
            model: std::env::var("RELAY_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            api_key_var: std::env::var("RELAY_API_KEY_VAR")
                .unwrap_or_else(|_| DEFAULT_API_KEY_VAR.to_string()),
            system_prompt_file: std::env::var("RELAY_SYSTEM_PROMPT_FILE")
                .ok()
                .map(PathBuf::from),
        }
    }
}

/// Where the upstream credential comes from.
///
/// The environment is consulted on every request, so rotating the secret
/// does not need a restart.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    Env(String),
    Fixed(Option<String>),
}

impl CredentialSource {
    pub fn resolve(&self) -> Option<String> {
        match self {
            CredentialSource::Env(var) => std::env::var(var).ok().filter(|v| !v.is_empty()),
            CredentialSource::Fixed(value) => value.clone(),
        }
    }

    /// Name used in configuration errors
    pub fn name(&self) -> &str {
        match self {
            CredentialSource::Env(var) => var,
            CredentialSource::Fixed(_) => "API key",
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    pub credential: Arc<CredentialSource>,
}

impl AppState {
    pub fn new(upstream: UpstreamClient, credential: CredentialSource) -> Self {
        Self {
            upstream: Arc::new(upstream),
            credential: Arc::new(credential),
        }
    }

    /// Build state from configuration, loading the system prompt
    pub fn from_config(config: &RelayConfig) -> std::io::Result<Self> {
        let system_prompt = crate::system_prompt::load(config.system_prompt_file.as_deref())?;
        let upstream = UpstreamClient::new(&config.upstream_url, &config.model, system_prompt);
        Ok(Self::new(
            upstream,
            CredentialSource::Env(config.api_key_var.clone()),
        ))
    }
}
