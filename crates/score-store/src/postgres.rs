use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use pet_domain::{PlayerId, Score, ScoreEntry};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::{NameDirectory, ScoreRepository, ScoreStoreError};

/// Scores live in `leaderboard_scores`, names in `user_directory`; both are
/// keyed by the player id rendered as text.
#[derive(Debug, Clone)]
pub struct PostgresScoreStore {
    pool: PgPool,
}

impl PostgresScoreStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, ScoreStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| ScoreStoreError::Database(e.to_string()))?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn score_from_db(raw: i64) -> Result<Score, ScoreStoreError> {
    u64::try_from(raw)
        .map(Score)
        .map_err(|_| ScoreStoreError::CorruptEntry {
            field: "score",
            value: raw.to_string(),
        })
}

fn player_from_db(player_key: &str) -> Result<PlayerId, ScoreStoreError> {
    player_key
        .parse()
        .map_err(|_| ScoreStoreError::CorruptEntry {
            field: "player_key",
            value: player_key.to_string(),
        })
}

fn entry_from_parts(player_key: &str, raw_score: i64) -> Result<ScoreEntry, ScoreStoreError> {
    Ok(ScoreEntry {
        player_id: player_from_db(player_key)?,
        score: score_from_db(raw_score)?,
    })
}

#[async_trait]
impl ScoreRepository for PostgresScoreStore {
    async fn increment_score(&self, player_id: PlayerId) -> Result<Score, ScoreStoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO leaderboard_scores (player_key, score, updated_at)
            VALUES ($1, 1, $2)
            ON CONFLICT (player_key) DO UPDATE SET
                score = leaderboard_scores.score + 1,
                updated_at = EXCLUDED.updated_at
            RETURNING score
            "#,
        )
        .bind(player_id.store_key())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ScoreStoreError::Database(e.to_string()))?;

        let raw: i64 = row
            .try_get("score")
            .map_err(|e| ScoreStoreError::Database(e.to_string()))?;
        score_from_db(raw)
    }

    async fn score_of(&self, player_id: PlayerId) -> Result<Option<Score>, ScoreStoreError> {
        let row = sqlx::query("SELECT score FROM leaderboard_scores WHERE player_key = $1")
            .bind(player_id.store_key())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ScoreStoreError::Database(e.to_string()))?;

        row.map(|row| {
            let raw: i64 = row
                .try_get("score")
                .map_err(|e| ScoreStoreError::Database(e.to_string()))?;
            score_from_db(raw)
        })
        .transpose()
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<ScoreEntry>, ScoreStoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT player_key, score
            FROM leaderboard_scores
            ORDER BY score DESC, player_key COLLATE "C" DESC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ScoreStoreError::Database(e.to_string()))?;
        debug!(limit, rows = rows.len(), "top scores fetched");

        rows.into_iter()
            .map(|row| {
                let player_key: String = row
                    .try_get("player_key")
                    .map_err(|e| ScoreStoreError::Database(e.to_string()))?;
                let raw: i64 = row
                    .try_get("score")
                    .map_err(|e| ScoreStoreError::Database(e.to_string()))?;
                entry_from_parts(&player_key, raw)
            })
            .collect()
    }
}

#[async_trait]
impl NameDirectory for PostgresScoreStore {
    async fn upsert_display_name(
        &self,
        player_id: PlayerId,
        display_name: &str,
    ) -> Result<(), ScoreStoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_directory (player_key, display_name, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (player_key) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(player_id.store_key())
        .bind(display_name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| ScoreStoreError::Database(e.to_string()))?;
        Ok(())
    }

    async fn display_names(
        &self,
        player_ids: &[PlayerId],
    ) -> Result<HashMap<PlayerId, String>, ScoreStoreError> {
        if player_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let keys = player_ids
            .iter()
            .map(|id| id.store_key())
            .collect::<Vec<_>>();
        let rows = sqlx::query(
            "SELECT player_key, display_name FROM user_directory WHERE player_key = ANY($1)",
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ScoreStoreError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let player_key: String = row
                    .try_get("player_key")
                    .map_err(|e| ScoreStoreError::Database(e.to_string()))?;
                let display_name: String = row
                    .try_get("display_name")
                    .map_err(|e| ScoreStoreError::Database(e.to_string()))?;
                Ok((player_from_db(&player_key)?, display_name))
            })
            .collect()
    }
}
