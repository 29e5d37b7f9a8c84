use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use game_http::GameState;
use platform_core::{AppConfig, StorageBackend};
use score_service::{LeaderboardService, ReportService};
use score_store::{InMemoryScoreStore, NameDirectory, PostgresScoreStore, ScoreRepository};
use tracing::info;

type Stores = (Arc<dyn ScoreRepository>, Arc<dyn NameDirectory>);

async fn build_stores(config: &AppConfig) -> Result<Stores> {
    match config.storage.backend {
        StorageBackend::Memory => {
            let store = Arc::new(InMemoryScoreStore::new());
            let scores: Arc<dyn ScoreRepository> = store.clone();
            let names: Arc<dyn NameDirectory> = store;
            Ok((scores, names))
        }
        StorageBackend::Postgres => {
            let url = config
                .storage
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow!("storage.database_url is not set"))?;
            let store = Arc::new(
                PostgresScoreStore::connect(url, config.storage.max_connections)
                    .await
                    .context("connect postgres")?,
            );
            info!(
                max_connections = config.storage.max_connections,
                "postgres score store connected"
            );
            let scores: Arc<dyn ScoreRepository> = store.clone();
            let names: Arc<dyn NameDirectory> = store;
            Ok((scores, names))
        }
    }
}

pub async fn build_state(config: &AppConfig) -> Result<GameState> {
    let (scores, names) = build_stores(config).await?;
    Ok(GameState {
        service_name: Arc::from(config.app.service_name.as_str()),
        reports: ReportService::new(
            scores.clone(),
            names.clone(),
            config.auth.bot_token.clone(),
        ),
        leaderboard: LeaderboardService::new(scores, names, config.leaderboard.into()),
    })
}
