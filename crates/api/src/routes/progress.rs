use axum::{
    Json,
    extract::{Path, State},
};
use aware_core::model::{ModuleId, ModuleProgress};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{ProgressResponse, SectionsRequest};

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ModuleProgress>>, ApiError> {
    Ok(Json(state.services.progress().list(user.id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(module_id): Path<u64>,
) -> Result<Json<ModuleProgress>, ApiError> {
    let progress = state
        .services
        .progress()
        .get(user.id, ModuleId::new(module_id))
        .await?;
    Ok(Json(progress))
}

pub async fn start(
    State(state): State<AppState>,
    user: AuthUser,
    Path(module_id): Path<u64>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let update = state
        .services
        .progress()
        .start(user.id, ModuleId::new(module_id))
        .await?;
    Ok(Json(update.into()))
}

pub async fn sections(
    State(state): State<AppState>,
    user: AuthUser,
    Path(module_id): Path<u64>,
    Json(req): Json<SectionsRequest>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let update = state
        .services
        .progress()
        .record_sections(user.id, ModuleId::new(module_id), req.completed_sections)
        .await?;
    Ok(Json(update.into()))
}

pub async fn complete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(module_id): Path<u64>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let update = state
        .services
        .progress()
        .complete(user.id, ModuleId::new(module_id))
        .await?;
    Ok(Json(update.into()))
}

pub async fn access(
    State(state): State<AppState>,
    user: AuthUser,
    Path(module_id): Path<u64>,
) -> Result<Json<ModuleProgress>, ApiError> {
    let progress = state
        .services
        .progress()
        .record_access(user.id, ModuleId::new(module_id))
        .await?;
    Ok(Json(progress))
}
