use axum::{Json, extract::State, http::StatusCode};
use aware_core::model::{Badge, UserBadge};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{AwardRequest, AwardResponse, CreateBadgeRequest};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Badge>>, ApiError> {
    Ok(Json(state.services.badges().list().await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateBadgeRequest>,
) -> Result<(StatusCode, Json<Badge>), ApiError> {
    user.require_author()?;
    let badge = state.services.badges().create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(badge)))
}

pub async fn mine(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<UserBadge>>, ApiError> {
    Ok(Json(state.services.badges().for_user(user.id).await?))
}

/// Manual award. Repeating it reports `success: false` instead of failing.
pub async fn award(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<AwardRequest>,
) -> Result<Json<AwardResponse>, ApiError> {
    user.require_author()?;
    let outcome = state
        .services
        .badges()
        .award(req.user_id, req.badge_id)
        .await?;
    info!(
        by = %user.username,
        recipient = %req.user_id,
        badge = %req.badge_id,
        awarded = outcome.is_awarded(),
        "badge award requested"
    );
    Ok(Json(outcome.into()))
}
