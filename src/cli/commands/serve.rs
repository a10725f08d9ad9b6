use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::AppConfig;

pub async fn handle(config: Arc<AppConfig>) -> anyhow::Result<()> {
    info!("Starting authority-api in {:?} mode", config.environment);
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    let (app, state) = crate::cli::prepare(config.clone()).await?;

    let bind_addr = format!("0.0.0.0:{}", config.service.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!(
        "Listening on http://{} ({} store, API under {})",
        bind_addr,
        state.store.backend_name(),
        state.catalog.prefix()
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
