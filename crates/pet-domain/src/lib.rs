pub mod errors;
pub mod ids;
pub mod leaderboard;

pub use errors::DomainError;
pub use ids::{PlayerId, TraceId};
pub use leaderboard::{
    RankedEntry, Score, ScoreEntry, derive_display_name, fallback_display_name,
};
