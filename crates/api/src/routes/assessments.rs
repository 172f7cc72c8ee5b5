use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use aware_core::model::{AssessmentAttempt, ModuleId, PublicAssessment};
use services::Submission;
use tracing::info;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{CreateAssessmentRequest, SubmissionResponse};

/// The quiz for a module, without the answer key.
pub async fn for_module(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(module_id): Path<u64>,
) -> Result<Json<PublicAssessment>, ApiError> {
    let assessment = state
        .services
        .assessments()
        .for_module(ModuleId::new(module_id))
        .await?
        .ok_or_else(|| ApiError::not_found("assessment"))?;
    Ok(Json(assessment))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateAssessmentRequest>,
) -> Result<(StatusCode, Json<PublicAssessment>), ApiError> {
    user.require_author()?;
    let draft = req.into_draft(state.default_passing_score);
    let assessment = state.services.assessments().create(draft).await?;
    Ok((StatusCode::CREATED, Json(assessment.public_view())))
}

pub async fn submit(
    State(state): State<AppState>,
    user: AuthUser,
    Json(submission): Json<Submission>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let result = state
        .services
        .assessments()
        .submit(user.id, &submission)
        .await?;
    info!(
        user = %user.username,
        score = result.score.score,
        passed = result.score.passed,
        "assessment submitted"
    );
    Ok(Json(result.into()))
}

pub async fn attempts(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<AssessmentAttempt>>, ApiError> {
    Ok(Json(state.services.assessments().attempts(user.id).await?))
}
