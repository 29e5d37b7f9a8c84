use std::sync::Arc;

use pet_domain::{PlayerId, Score, TraceId};
use platform_core::BotToken;
use score_store::{NameDirectory, ScoreRepository};
use tracing::{info, warn};
use webapp_auth::verify_init_data;

use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub player_id: PlayerId,
    pub new_score: Score,
    pub display_name: String,
    /// False when the directory write failed; the score still stands.
    pub name_recorded: bool,
}

/// Records one win per verified report. Every accepted call increments:
/// a replayed payload counts again.
pub struct ReportService<S: ScoreRepository + ?Sized, N: NameDirectory + ?Sized> {
    scores: Arc<S>,
    names: Arc<N>,
    bot_token: BotToken,
}

impl<S: ScoreRepository + ?Sized, N: NameDirectory + ?Sized> Clone for ReportService<S, N> {
    fn clone(&self) -> Self {
        Self {
            scores: Arc::clone(&self.scores),
            names: Arc::clone(&self.names),
            bot_token: self.bot_token.clone(),
        }
    }
}

impl<S: ScoreRepository + ?Sized, N: NameDirectory + ?Sized> ReportService<S, N> {
    #[must_use]
    pub fn new(scores: Arc<S>, names: Arc<N>, bot_token: BotToken) -> Self {
        Self {
            scores,
            names,
            bot_token,
        }
    }

    pub async fn report_win(&self, init_data: &str) -> Result<ReportOutcome, ServiceError> {
        if init_data.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("missing initData".to_string()));
        }
        if self.bot_token.is_empty() {
            return Err(ServiceError::InvalidRequest("missing bot token".to_string()));
        }
        let trace_id = TraceId::new();

        // Nothing below touches the store until the signature has passed.
        let verified = verify_init_data(init_data, self.bot_token.expose()).map_err(|err| {
            warn!(trace_id = %trace_id.0, error = %err, "init data rejected");
            ServiceError::Unauthorized
        })?;
        let user = verified
            .user()
            .map_err(|err| ServiceError::InvalidRequest(err.to_string()))?;
        let player_id = user.player_id();

        let new_score = self
            .scores
            .increment_score(player_id)
            .await
            .map_err(|err| {
                warn!(
                    trace_id = %trace_id.0,
                    player_id = %player_id,
                    error = %err,
                    "score increment failed"
                );
                ServiceError::from(err)
            })?;

        let display_name = user.display_name();
        let name_recorded = self.record_display_name(trace_id, player_id, &display_name).await;

        info!(
            trace_id = %trace_id.0,
            player_id = %player_id,
            new_score = new_score.as_u64(),
            name_recorded,
            "win reported"
        );
        Ok(ReportOutcome {
            player_id,
            new_score,
            display_name,
            name_recorded,
        })
    }

    async fn record_display_name(
        &self,
        trace_id: TraceId,
        player_id: PlayerId,
        display_name: &str,
    ) -> bool {
        match self.names.upsert_display_name(player_id, display_name).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    trace_id = %trace_id.0,
                    player_id = %player_id,
                    error = %err,
                    "display name update failed"
                );
                false
            }
        }
    }
}
