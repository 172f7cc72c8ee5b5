use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use services::{
    ActivityServiceError, AppServicesError, AssessmentServiceError, AuthError, BadgeServiceError,
    ModuleServiceError, ProgressServiceError,
};
use storage::repository::StorageError;
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;

/// Errors returned from handlers. The message is the JSON `error` field.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    fn internal(source: impl std::fmt::Display) -> Self {
        Self::Internal(source.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(detail) => {
                error!(error = %detail, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => ApiError::NotFound("resource not found".into()),
            StorageError::Conflict => ApiError::Conflict("resource already exists".into()),
            other => ApiError::internal(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials | AuthError::InvalidToken => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::WeakPassword(_) | AuthError::User(_) => ApiError::BadRequest(e.to_string()),
            AuthError::Storage(StorageError::Conflict) => {
                ApiError::Conflict("username or email already in use".into())
            }
            AuthError::Storage(StorageError::NotFound) => ApiError::not_found("user"),
            AuthError::Storage(inner) => inner.into(),
            other => ApiError::internal(other),
        }
    }
}

impl From<ModuleServiceError> for ApiError {
    fn from(e: ModuleServiceError) -> Self {
        match e {
            ModuleServiceError::Module(inner) => ApiError::BadRequest(inner.to_string()),
            ModuleServiceError::Storage(StorageError::NotFound) => ApiError::not_found("module"),
            ModuleServiceError::Storage(inner) => inner.into(),
            other => ApiError::internal(other),
        }
    }
}

impl From<ProgressServiceError> for ApiError {
    fn from(e: ProgressServiceError) -> Self {
        match e {
            ProgressServiceError::Storage(StorageError::NotFound) => ApiError::not_found("module"),
            ProgressServiceError::Storage(inner) => inner.into(),
            other => ApiError::internal(other),
        }
    }
}

impl From<AssessmentServiceError> for ApiError {
    fn from(e: AssessmentServiceError) -> Self {
        match e {
            AssessmentServiceError::Assessment(inner) => ApiError::BadRequest(inner.to_string()),
            AssessmentServiceError::Progress(inner) => inner.into(),
            AssessmentServiceError::Storage(StorageError::NotFound) => {
                ApiError::not_found("assessment")
            }
            AssessmentServiceError::Storage(StorageError::Conflict) => {
                ApiError::Conflict("module already has an assessment".into())
            }
            AssessmentServiceError::Storage(inner) => inner.into(),
            other => ApiError::internal(other),
        }
    }
}

impl From<ActivityServiceError> for ApiError {
    fn from(e: ActivityServiceError) -> Self {
        match e {
            ActivityServiceError::Activity(inner) => ApiError::BadRequest(inner.to_string()),
            ActivityServiceError::Progress(inner) => inner.into(),
            ActivityServiceError::Storage(inner) => inner.into(),
            other => ApiError::internal(other),
        }
    }
}

impl From<BadgeServiceError> for ApiError {
    fn from(e: BadgeServiceError) -> Self {
        match e {
            BadgeServiceError::Badge(inner) => ApiError::BadRequest(inner.to_string()),
            BadgeServiceError::Storage(StorageError::NotFound) => {
                ApiError::not_found("user or badge")
            }
            BadgeServiceError::Storage(StorageError::Conflict) => {
                ApiError::Conflict("badge name already in use".into())
            }
            BadgeServiceError::Storage(inner) => inner.into(),
            other => ApiError::internal(other),
        }
    }
}

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Services(#[from] AppServicesError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}
