use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use aware_core::model::{ModuleDraft, ModuleId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{ModuleDetailResponse, ModuleResponse};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ModuleResponse>>, ApiError> {
    let modules = state.services.modules().list().await?;
    Ok(Json(modules.iter().map(ModuleResponse::from).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ModuleDetailResponse>, ApiError> {
    let detail = state
        .services
        .modules()
        .get(ModuleId::new(id))
        .await?
        .ok_or_else(|| ApiError::not_found("module"))?;
    Ok(Json(detail.into()))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(draft): Json<ModuleDraft>,
) -> Result<(StatusCode, Json<ModuleResponse>), ApiError> {
    user.require_author()?;
    let module = state.services.modules().create(draft).await?;
    Ok((StatusCode::CREATED, Json(ModuleResponse::from(&module))))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Json(draft): Json<ModuleDraft>,
) -> Result<Json<ModuleResponse>, ApiError> {
    user.require_author()?;
    let module = state
        .services
        .modules()
        .update(ModuleId::new(id), draft)
        .await?;
    Ok(Json(ModuleResponse::from(&module)))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    user.require_author()?;
    state.services.modules().delete(ModuleId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
