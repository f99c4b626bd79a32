//! Status bot binary.
//!
//! Standalone HTTP service for GitLab webhook handling.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use status_bot::{config::Config, server, Dispatcher, GitLabClient, LabelEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("status_bot=info".parse()?))
        .init();

    info!("Starting status bot...");

    // Load configuration
    let config = Config::from_env();
    info!(config = ?config, "Loaded configuration");

    if config.api_token.is_none() {
        warn!("No GITLAB_API_TOKEN configured - label updates will be rejected by GitLab");
    }

    let client = Arc::new(GitLabClient::new(&config).context("Failed to create GitLab client")?);
    let engine = if config.serialize_issue_updates {
        info!("Serializing label updates per issue");
        LabelEngine::with_issue_locks(client)
    } else {
        LabelEngine::new(client)
    };

    let state = server::AppState {
        config: Arc::new(config.clone()),
        dispatcher: Arc::new(Dispatcher::new(engine)),
    };

    // Build router
    let app = server::build_router(state);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port = config.port, path = server::HOOK_PATH, "Status bot listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
