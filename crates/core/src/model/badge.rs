use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{BadgeId, ModuleId, UserId};

/// Message returned when a badge award would duplicate an existing one.
pub const ALREADY_AWARDED_MESSAGE: &str = "User already has this badge.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BadgeError {
    #[error("badge name cannot be empty")]
    EmptyName,
}

/// An achievement in the catalog.
///
/// When `module_id` is set the badge is awarded automatically on completing
/// that module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    id: BadgeId,
    name: String,
    description: String,
    image_url: Option<String>,
    module_id: Option<ModuleId>,
    created_at: DateTime<Utc>,
}

impl Badge {
    /// # Errors
    ///
    /// Returns `BadgeError::EmptyName` for a blank name.
    pub fn new(
        id: BadgeId,
        name: impl Into<String>,
        description: impl Into<String>,
        image_url: Option<String>,
        module_id: Option<ModuleId>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, BadgeError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(BadgeError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            description: description.into(),
            image_url: image_url.filter(|u| !u.trim().is_empty()),
            module_id,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> BadgeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    #[must_use]
    pub fn module_id(&self) -> Option<ModuleId> {
        self.module_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A badge held by a user, joined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBadge {
    pub user_id: UserId,
    pub badge: Badge,
    pub awarded_at: DateTime<Utc>,
}

/// Result of an award attempt. Awarding twice is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwardOutcome {
    Awarded(UserBadge),
    AlreadyAwarded,
}

impl AwardOutcome {
    #[must_use]
    pub fn is_awarded(&self) -> bool {
        matches!(self, AwardOutcome::Awarded(_))
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            AwardOutcome::Awarded(_) => "Badge awarded successfully.",
            AwardOutcome::AlreadyAwarded => ALREADY_AWARDED_MESSAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn rejects_blank_badge_names() {
        let err = Badge::new(BadgeId::new(1), " ", "", None, None, fixed_now()).unwrap_err();
        assert_eq!(err, BadgeError::EmptyName);
    }

    #[test]
    fn already_awarded_carries_the_expected_message() {
        assert_eq!(
            AwardOutcome::AlreadyAwarded.message(),
            "User already has this badge."
        );
        assert!(!AwardOutcome::AlreadyAwarded.is_awarded());
    }
}
