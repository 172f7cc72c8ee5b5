use axum::{Json, extract::State, http::StatusCode};
use aware_core::model::Profile;
use services::Registration;
use tracing::info;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let auth = state.services.auth();
    let user = auth
        .register(Registration {
            profile: req.profile(),
            username: req.username,
            email: req.email,
            password: req.password,
        })
        .await?;
    let session = auth.issue(&user)?;
    info!(user = %user.id(), "registered via api");
    Ok((StatusCode::CREATED, Json(session.into())))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let session = state.services.auth().login(&req.login, &req.password).await?;
    Ok(Json(session.into()))
}

pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let current = state.services.auth().current_user(user.id).await?;
    Ok(Json(UserResponse::from(&current)))
}

pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(profile): Json<Profile>,
) -> Result<Json<UserResponse>, ApiError> {
    let updated = state.services.auth().update_profile(user.id, profile).await?;
    Ok(Json(UserResponse::from(&updated)))
}
