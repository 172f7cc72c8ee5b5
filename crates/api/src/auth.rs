//! Bearer-token authentication for handlers.
//!
//! Send the token returned by `/auth/login` in the Authorization header:
//! ```text
//! Authorization: Bearer <token>
//! ```

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use aware_core::model::{Role, UserId};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// The caller identified by a valid access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    /// Content authoring (modules, assessments, badges) is limited to
    /// instructors and admins.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for learners.
    pub fn require_author(&self) -> Result<(), ApiError> {
        if self.role.can_author() {
            Ok(())
        } else {
            warn!(user = %self.id, role = %self.role, "author-only request rejected");
            Err(ApiError::Forbidden("instructor or admin role required".into()))
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then_some(token.trim())
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing bearer token"
            );
            return Err(ApiError::Unauthorized("authentication required".into()));
        };

        let claims = state.services.auth().verify(token).map_err(|e| {
            warn!(event = "auth_failure", reason = %e, "Rejected bearer token");
            ApiError::Unauthorized("invalid or expired token".into())
        })?;

        Ok(Self {
            id: claims.user_id()?,
            username: claims.username,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn extracts_bearer_token_case_insensitively() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
    }

    #[test]
    fn ignores_other_schemes_and_empty_tokens() {
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
