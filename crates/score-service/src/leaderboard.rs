use std::sync::Arc;

use pet_domain::{PlayerId, RankedEntry, fallback_display_name};
use platform_core::LeaderboardSection;
use score_store::{NameDirectory, ScoreRepository};
use tracing::{debug, warn};

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for LeaderboardLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl From<LeaderboardSection> for LeaderboardLimits {
    fn from(section: LeaderboardSection) -> Self {
        Self {
            default_limit: section.default_limit,
            max_limit: section.max_limit,
        }
    }
}

impl LeaderboardLimits {
    #[must_use]
    pub fn resolve(self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
    }
}

/// Read side: top-N scores joined with display names at query time.
pub struct LeaderboardService<S: ScoreRepository + ?Sized, N: NameDirectory + ?Sized> {
    scores: Arc<S>,
    names: Arc<N>,
    limits: LeaderboardLimits,
}

impl<S: ScoreRepository + ?Sized, N: NameDirectory + ?Sized> Clone for LeaderboardService<S, N> {
    fn clone(&self) -> Self {
        Self {
            scores: Arc::clone(&self.scores),
            names: Arc::clone(&self.names),
            limits: self.limits,
        }
    }
}

impl<S: ScoreRepository + ?Sized, N: NameDirectory + ?Sized> LeaderboardService<S, N> {
    #[must_use]
    pub fn new(scores: Arc<S>, names: Arc<N>, limits: LeaderboardLimits) -> Self {
        Self {
            scores,
            names,
            limits,
        }
    }

    /// `None` reads the configured default; explicit limits are capped.
    /// Any store failure fails the whole read.
    pub async fn leaderboard(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<RankedEntry>, ServiceError> {
        let limit = self.limits.resolve(limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let entries = self.scores.top_scores(limit).await.map_err(|err| {
            warn!(limit, error = %err, "top scores read failed");
            ServiceError::from(err)
        })?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let player_ids = entries.iter().map(|e| e.player_id).collect::<Vec<PlayerId>>();
        let names = self.names.display_names(&player_ids).await.map_err(|err| {
            warn!(limit, error = %err, "display name lookup failed");
            ServiceError::from(err)
        })?;

        let ranked = entries
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| {
                let rank = u32::try_from(idx + 1)
                    .map_err(|_| ServiceError::Internal("rank overflow".to_string()))?;
                let name = names
                    .get(&entry.player_id)
                    .cloned()
                    .unwrap_or_else(|| fallback_display_name(entry.player_id));
                Ok(RankedEntry {
                    rank,
                    player_id: entry.player_id,
                    name,
                    score: entry.score,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;
        debug!(limit, rows = ranked.len(), "leaderboard assembled");
        Ok(ranked)
    }
}
