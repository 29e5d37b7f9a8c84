//! Stateless orchestration over the score store: recording verified wins
//! and producing the ranked view.

mod error;
mod leaderboard;
mod report;

#[cfg(test)]
mod test_support;

pub use error::ServiceError;
pub use leaderboard::{LeaderboardLimits, LeaderboardService};
pub use report::{ReportOutcome, ReportService};
