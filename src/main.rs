//! Chat relay server
//!
//! Forwards conversations to the upstream completion API and streams the
//! reply back to the caller.

use chat_relay::relay::{create_router, AppState, RelayConfig};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = RelayConfig::from_env();
    let state = AppState::from_config(&config)?;

    if state.credential.resolve().is_none() {
        tracing::warn!(
            var = %config.api_key_var,
            "Upstream credential not set; requests will fail until it is"
        );
    }

    tracing::info!(
        upstream = %config.upstream_url,
        model = %config.model,
        custom_prompt = config.system_prompt_file.is_some(),
        "Relay configured"
    );

    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Chat relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
