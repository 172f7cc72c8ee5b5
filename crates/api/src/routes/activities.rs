use axum::{Json, extract::State};
use aware_core::model::ActivitySubmission;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{ActivityRequest, ActivityResponse};

pub async fn submit(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ActivityRequest>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let result = state
        .services
        .activities()
        .submit(user.id, req.module_id, &req.activity_key, req.score)
        .await?;
    Ok(Json(result.into()))
}

pub async fn history(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ActivitySubmission>>, ApiError> {
    Ok(Json(state.services.activities().history(user.id).await?))
}
