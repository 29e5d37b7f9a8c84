use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pet_domain::{PlayerId, Score, ScoreEntry};
use score_store::{NameDirectory, ScoreRepository, ScoreStoreError};

#[derive(Debug)]
pub struct FailingScores {
    corrupt: bool,
    calls: AtomicUsize,
}

impl FailingScores {
    pub fn unavailable() -> Self {
        Self {
            corrupt: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn corrupt() -> Self {
        Self {
            corrupt: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> ScoreStoreError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.corrupt {
            ScoreStoreError::CorruptEntry {
                field: "player_key",
                value: "not-a-number".to_string(),
            }
        } else {
            ScoreStoreError::Database("connection refused".to_string())
        }
    }
}

#[async_trait]
impl ScoreRepository for FailingScores {
    async fn increment_score(&self, _player_id: PlayerId) -> Result<Score, ScoreStoreError> {
        Err(self.fail())
    }

    async fn score_of(&self, _player_id: PlayerId) -> Result<Option<Score>, ScoreStoreError> {
        Err(self.fail())
    }

    async fn top_scores(&self, _limit: usize) -> Result<Vec<ScoreEntry>, ScoreStoreError> {
        Err(self.fail())
    }
}

#[derive(Debug, Default)]
pub struct FailingNames;

#[async_trait]
impl NameDirectory for FailingNames {
    async fn upsert_display_name(
        &self,
        _player_id: PlayerId,
        _display_name: &str,
    ) -> Result<(), ScoreStoreError> {
        Err(ScoreStoreError::Database("directory offline".to_string()))
    }

    async fn display_names(
        &self,
        _player_ids: &[PlayerId],
    ) -> Result<HashMap<PlayerId, String>, ScoreStoreError> {
        Err(ScoreStoreError::Database("directory offline".to_string()))
    }
}

/// Name directory that remembers every write and every batch lookup.
#[derive(Debug, Default)]
pub struct RecordingNames {
    names: Mutex<HashMap<PlayerId, String>>,
    writes: Mutex<Vec<(PlayerId, String)>>,
    lookups: Mutex<Vec<Vec<PlayerId>>>,
}

impl RecordingNames {
    pub fn writes(&self) -> Vec<(PlayerId, String)> {
        self.writes.lock().expect("lock").clone()
    }

    pub fn lookups(&self) -> Vec<Vec<PlayerId>> {
        self.lookups.lock().expect("lock").clone()
    }
}

#[async_trait]
impl NameDirectory for RecordingNames {
    async fn upsert_display_name(
        &self,
        player_id: PlayerId,
        display_name: &str,
    ) -> Result<(), ScoreStoreError> {
        self.writes
            .lock()
            .map_err(|_| ScoreStoreError::LockPoisoned)?
            .push((player_id, display_name.to_string()));
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
        self.lookups
            .lock()
            .map_err(|_| ScoreStoreError::LockPoisoned)?
            .push(player_ids.to_vec());
        let guard = self.names.lock().map_err(|_| ScoreStoreError::LockPoisoned)?;
        Ok(player_ids
            .iter()
            .filter_map(|id| guard.get(id).map(|name| (*id, name.clone())))
            .collect())
    }
}
