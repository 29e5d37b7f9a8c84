mod wiring;

use anyhow::{Context, Result};
use game_http::build_router;
use observability::init_tracing;
use platform_core::AppConfig;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("load config")?;
    init_tracing(&config.app.service_name, &config.observability.log_filter);
    if config.auth.bot_token.is_empty() {
        warn!("TELEGRAM_BOT_TOKEN is not set; win reports will be rejected");
    }

    let state = wiring::build_state(&config).await?;
    let listener = tokio::net::TcpListener::bind(&config.app.http_bind_addr)
        .await
        .with_context(|| format!("bind {}", config.app.http_bind_addr))?;
    info!(
        env = config.app.env.as_str(),
        addr = %config.app.http_bind_addr,
        storage = ?config.storage.backend,
        "http server listening"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;
    info!("http server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}
