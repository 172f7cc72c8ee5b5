use axum::{
    Json,
    extract::{Query, State},
};
use services::DashboardSummary;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{HealthResponse, LeaderboardQuery, LeaderboardResponse};

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let leaderboard = state.services.leaderboard();
    let limit = leaderboard.effective_limit(query.limit);
    let entries = leaderboard.top(Some(limit)).await?;
    Ok(Json(LeaderboardResponse { limit, entries }))
}

pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DashboardSummary>, ApiError> {
    Ok(Json(state.services.dashboard().summary(user.id).await?))
}
