//! Persistence for the two collections behind the leaderboard: ranked win
//! counts keyed by player, and the player display-name directory.

mod memory;
mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use pet_domain::{PlayerId, Score, ScoreEntry};
use thiserror::Error;

pub use memory::InMemoryScoreStore;
pub use postgres::PostgresScoreStore;

#[derive(Debug, Error)]
pub enum ScoreStoreError {
    #[error("store lock poisoned")]
    LockPoisoned,
    #[error("database error: {0}")]
    Database(String),
    #[error("corrupt stored {field}: {value}")]
    CorruptEntry { field: &'static str, value: String },
    #[error("score overflow for player {0}")]
    ScoreOverflow(PlayerId),
}

impl ScoreStoreError {
    /// Whether the error comes from the data itself rather than from
    /// reaching the store.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptEntry { .. } | Self::ScoreOverflow(_))
    }
}

#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Adds exactly one to the player's score in a single store operation
    /// and returns the post-increment value. Absent entries start at zero.
    async fn increment_score(&self, player_id: PlayerId) -> Result<Score, ScoreStoreError>;

    async fn score_of(&self, player_id: PlayerId) -> Result<Option<Score>, ScoreStoreError>;

    /// Highest scores first; equal scores by player key, descending bytes.
    async fn top_scores(&self, limit: usize) -> Result<Vec<ScoreEntry>, ScoreStoreError>;
}

#[async_trait]
pub trait NameDirectory: Send + Sync {
    /// Last write wins.
    async fn upsert_display_name(
        &self,
        player_id: PlayerId,
        display_name: &str,
    ) -> Result<(), ScoreStoreError>;

    /// Resolves all requested players in one lookup. Players without a
    /// record are absent from the map.
    async fn display_names(
        &self,
        player_ids: &[PlayerId],
    ) -> Result<HashMap<PlayerId, String>, ScoreStoreError>;
}
