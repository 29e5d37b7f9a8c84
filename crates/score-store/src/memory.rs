use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pet_domain::{PlayerId, Score, ScoreEntry};

use crate::{NameDirectory, ScoreRepository, ScoreStoreError};

/// Process-local store. Increments run under the score lock, so concurrent
/// reporters never lose an update.
#[derive(Debug, Default, Clone)]
pub struct InMemoryScoreStore {
    scores: Arc<Mutex<HashMap<PlayerId, Score>>>,
    names: Arc<Mutex<HashMap<PlayerId, String>>>,
}

impl InMemoryScoreStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_count(&self) -> Result<usize, ScoreStoreError> {
        Ok(self
            .scores
            .lock()
            .map_err(|_| ScoreStoreError::LockPoisoned)?
            .len())
    }
}

#[async_trait]
impl ScoreRepository for InMemoryScoreStore {
    async fn increment_score(&self, player_id: PlayerId) -> Result<Score, ScoreStoreError> {
        let mut guard = self
            .scores
            .lock()
            .map_err(|_| ScoreStoreError::LockPoisoned)?;
        let slot = guard.entry(player_id).or_insert(Score::ZERO);
        *slot = slot
            .incremented()
            .map_err(|_| ScoreStoreError::ScoreOverflow(player_id))?;
        Ok(*slot)
    }

    async fn score_of(&self, player_id: PlayerId) -> Result<Option<Score>, ScoreStoreError> {
        let guard = self
            .scores
            .lock()
            .map_err(|_| ScoreStoreError::LockPoisoned)?;
        Ok(guard.get(&player_id).copied())
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<ScoreEntry>, ScoreStoreError> {
        let mut entries = {
            let guard = self
                .scores
                .lock()
                .map_err(|_| ScoreStoreError::LockPoisoned)?;
            guard
                .iter()
                .map(|(player_id, score)| ScoreEntry {
                    player_id: *player_id,
                    score: *score,
                })
                .collect::<Vec<_>>()
        };
        entries.sort_by(ScoreEntry::rank_cmp);
        entries.truncate(limit);
        Ok(entries)
    }
}

#[async_trait]
impl NameDirectory for InMemoryScoreStore {
    async fn upsert_display_name(
        &self,
        player_id: PlayerId,
        display_name: &str,
    ) -> Result<(), ScoreStoreError> {
        self.names
            .lock()
            .map_err(|_| ScoreStoreError::LockPoisoned)?
            .insert(player_id, display_name.to_string());
        Ok(())
    }

    async fn display_names(
        &self,
        player_ids: &[PlayerId],
    ) -> Result<HashMap<PlayerId, String>, ScoreStoreError> {
        let guard = self
            .names
            .lock()
            .map_err(|_| ScoreStoreError::LockPoisoned)?;
        Ok(player_ids
            .iter()
            .filter_map(|id| guard.get(id).map(|name| (*id, name.clone())))
            .collect())
    }
}
