use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pet_domain::RankedEntry;
use platform_core::ErrorCode;
use score_service::{LeaderboardService, ReportService, ServiceError};
use score_store::{NameDirectory, ScoreRepository};
use serde::{Deserialize, Serialize};
use tracing::info;

pub type DynReportService = ReportService<dyn ScoreRepository, dyn NameDirectory>;
pub type DynLeaderboardService = LeaderboardService<dyn ScoreRepository, dyn NameDirectory>;

#[derive(Clone)]
pub struct GameState {
    pub service_name: Arc<str>,
    pub reports: DynReportService,
    pub leaderboard: DynLeaderboardService,
}

impl std::fmt::Debug for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameState")
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWinRequest {
    #[serde(default)]
    pub init_data: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWinResponse {
    pub success: bool,
    pub new_score: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub rank: u32,
    pub name: String,
    pub score: u64,
}

impl From<RankedEntry> for LeaderboardRow {
    fn from(entry: RankedEntry) -> Self {
        Self {
            rank: entry.rank,
            name: entry.name,
            score: entry.score.as_u64(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
}

/// Service errors rendered as `{ error, code }` with a matching status.
/// Store details stay in the logs.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ServiceError::InvalidRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            ServiceError::Unauthorized => (
                StatusCode::FORBIDDEN,
                "Invalid hash. Unauthorized.".to_string(),
            ),
            ServiceError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Storage unavailable, try again later".to_string(),
            ),
            ServiceError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            ),
        };
        let body = ErrorResponse {
            error: message,
            code: self.0.code(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn build_router(state: GameState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/report-win", post(report_win))
        .route("/api/leaderboard", get(leaderboard))
        .with_state(state)
}

async fn health(State(state): State<GameState>) -> Json<HealthResponse> {
    info!(route = "/health", "game http request");
    Json(HealthResponse {
        ok: true,
        service: state.service_name.to_string(),
    })
}

async fn report_win(
    State(state): State<GameState>,
    body: Result<Json<ReportWinRequest>, JsonRejection>,
) -> Result<Json<ReportWinResponse>, ApiError> {
    info!(route = "/api/report-win", "game http request");
    let Json(body) = body.map_err(|rejection| {
        ServiceError::InvalidRequest(format!("malformed body: {}", rejection.body_text()))
    })?;
    let init_data = body.init_data.unwrap_or_default();
    let outcome = state.reports.report_win(&init_data).await?;
    Ok(Json(ReportWinResponse {
        success: true,
        new_score: outcome.new_score.as_u64(),
    }))
}

async fn leaderboard(
    State(state): State<GameState>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<Vec<LeaderboardRow>>, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        ServiceError::InvalidRequest(format!("malformed query: {}", rejection.body_text()))
    })?;
    info!(route = "/api/leaderboard", limit = ?query.limit, "game http request");
    let rows = state.leaderboard.leaderboard(query.limit).await?;
    Ok(Json(rows.into_iter().map(LeaderboardRow::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pet_domain::PlayerId;
    use platform_core::BotToken;
    use score_service::LeaderboardLimits;
    use score_store::InMemoryScoreStore;
    use webapp_auth::sign_init_data;

    const SECRET: &str = "123456:test-token";

    fn state_with(store: &InMemoryScoreStore) -> GameState {
        let scores: Arc<dyn ScoreRepository> = Arc::new(store.clone());
        let names: Arc<dyn NameDirectory> = Arc::new(store.clone());
        GameState {
            service_name: Arc::from("pet-wars"),
            reports: ReportService::new(scores.clone(), names.clone(), BotToken::new(SECRET)),
            leaderboard: LeaderboardService::new(scores, names, LeaderboardLimits::default()),
        }
    }

    fn signed_for(user_json: &str) -> String {
        sign_init_data(&[("user", user_json), ("auth_date", "1700000000")], SECRET)
            .expect("sign")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn report_win_returns_new_score() {
        let store = InMemoryScoreStore::new();
        let resp = report_win(
            State(state_with(&store)),
            Ok(Json(ReportWinRequest {
                init_data: Some(signed_for(r#"{"id":42,"first_name":"Ann"}"#)),
            })),
        )
        .await
        .expect("report")
        .0;

        assert!(resp.success);
        assert_eq!(resp.new_score, 1);
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["newScore"], serde_json::json!(1));
    }

    #[tokio::test]
    async fn report_win_without_init_data_is_bad_request() {
        let store = InMemoryScoreStore::new();
        let err = report_win(
            State(state_with(&store)),
            Ok(Json(ReportWinRequest { init_data: None })),
        )
        .await
        .expect_err("must fail");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "REQUEST_INVALID");
    }

    #[tokio::test]
    async fn forged_report_is_forbidden_and_not_counted() {
        let store = InMemoryScoreStore::new();
        let forged = sign_init_data(&[("user", r#"{"id":42}"#)], "wrong").expect("sign");
        let err = report_win(
            State(state_with(&store)),
            Ok(Json(ReportWinRequest {
                init_data: Some(forged),
            })),
        )
        .await
        .expect_err("must fail");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
        assert_eq!(store.score_of(PlayerId(42)).await.expect("read"), None);
    }

    #[tokio::test]
    async fn leaderboard_lists_reported_players_in_order() {
        let store = InMemoryScoreStore::new();
        let state = state_with(&store);
        for (user, wins) in [
            (r#"{"id":1,"first_name":"Ann"}"#, 2),
            (r#"{"id":2,"username":"bobby"}"#, 3),
        ] {
            for _ in 0..wins {
                report_win(
                    State(state.clone()),
                    Ok(Json(ReportWinRequest {
                        init_data: Some(signed_for(user)),
                    })),
                )
                .await
                .expect("report");
            }
        }
        store.increment_score(PlayerId(3)).await.expect("inc");

        let rows = leaderboard(State(state), Ok(Query(LeaderboardQuery::default())))
            .await
            .expect("board")
            .0;
        assert_eq!(
            rows,
            vec![
                LeaderboardRow {
                    rank: 1,
                    name: "bobby".to_string(),
                    score: 3,
                },
                LeaderboardRow {
                    rank: 2,
                    name: "Ann".to_string(),
                    score: 2,
                },
                LeaderboardRow {
                    rank: 3,
                    name: "Player 3".to_string(),
                    score: 1,
                },
            ]
        );
    }

    #[tokio::test]
    async fn leaderboard_honours_explicit_limit() {
        let store = InMemoryScoreStore::new();
        for id in 1..=4 {
            store.increment_score(PlayerId(id)).await.expect("inc");
        }
        let rows = leaderboard(
            State(state_with(&store)),
            Ok(Query(LeaderboardQuery { limit: Some(2) })),
        )
        .await
        .expect("board")
        .0;
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn service_errors_map_to_status_codes() {
        let cases = [
            (
                ServiceError::Unavailable("db down".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
            ),
            (
                ServiceError::Internal("db down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            let response = ApiError(err).into_response();
            assert_eq!(response.status(), status);
            let json = body_json(response).await;
            assert_eq!(json["code"], code);
            assert!(!json["error"].as_str().expect("message").contains("db down"));
        }
    }

    #[tokio::test]
    async fn health_reports_service_name() {
        let store = InMemoryScoreStore::new();
        let resp = health(State(state_with(&store))).await.0;
        assert!(resp.ok);
        assert_eq!(resp.service, "pet-wars");
    }
}
