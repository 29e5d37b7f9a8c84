use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::ids::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(pub u64);

impl Score {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// One verified win.
    pub fn incremented(self) -> Result<Self, DomainError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(DomainError::ScoreOverflow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub player_id: PlayerId,
    pub score: Score,
}

impl ScoreEntry {
    /// Leaderboard order: score descending, then player key descending by
    /// bytes. Equal-score members come back the way a ranked key-value set
    /// returns them in reverse range reads.
    #[must_use]
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| other.player_id.store_key().cmp(&self.player_id.store_key()))
    }
}

/// One row of the ranked view. `rank` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: u32,
    pub player_id: PlayerId,
    pub name: String,
    pub score: Score,
}

#[must_use]
pub fn fallback_display_name(player_id: PlayerId) -> String {
    format!("Player {player_id}")
}

/// Picks the name shown for a player: first and last name when present,
/// else the username, else the synthesized fallback.
#[must_use]
pub fn derive_display_name(
    player_id: PlayerId,
    first_name: Option<&str>,
    last_name: Option<&str>,
    username: Option<&str>,
) -> String {
    let full = [first_name, last_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !full.is_empty() {
        return full;
    }
    match username.map(str::trim).filter(|u| !u.is_empty()) {
        Some(username) => username.to_string(),
        None => fallback_display_name(player_id),
    }
}
