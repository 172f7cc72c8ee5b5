use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ModuleId, UserId};

/// Points an activity is worth at a perfect score.
pub const DEFAULT_ACTIVITY_POINTS: u32 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActivityError {
    #[error("activity key cannot be empty")]
    EmptyKey,

    #[error("activity score must be between 0 and 100, got {0}")]
    InvalidScore(u32),
}

/// A completed interactive exercise inside a module (e.g. spot-the-phish).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySubmission {
    pub id: Option<i64>,
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub activity_key: String,
    pub score: u32,
    pub points: u32,
    pub submitted_at: DateTime<Utc>,
}

impl ActivitySubmission {
    /// Scores a submission; points scale linearly with the score.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` for a blank key or a score above 100.
    pub fn new(
        user_id: UserId,
        module_id: ModuleId,
        activity_key: impl Into<String>,
        score: u32,
        max_points: u32,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, ActivityError> {
        let activity_key = activity_key.into().trim().to_string();
        if activity_key.is_empty() {
            return Err(ActivityError::EmptyKey);
        }
        if score > 100 {
            return Err(ActivityError::InvalidScore(score));
        }
        let points = u32::try_from(u64::from(score) * u64::from(max_points) / 100).unwrap_or(u32::MAX);
        Ok(Self {
            id: None,
            user_id,
            module_id,
            activity_key,
            score,
            points,
            submitted_at,
        })
    }
}
