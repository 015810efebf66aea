use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use newsrag_backend::core::config::{AppPaths, ConfigService};
use newsrag_backend::core::logging;
use newsrag_backend::server;
use newsrag_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "server.log");

    let config = ConfigService::new(paths.clone());
    let settings = config.load_settings().context("Failed to load configuration")?;
    if let Ok(effective) = serde_json::to_value(&settings) {
        tracing::debug!(
            config = %config.redact_sensitive_values(&effective),
            "Effective configuration"
        );
    }
    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);

    let state = AppState::initialize(&paths, settings).await?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!(
        index = state.answer.index_name(),
        llm = state.answer.llm_name(),
        "Listening on {}",
        addr
    );

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
