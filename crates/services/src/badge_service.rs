use std::sync::Arc;

use aware_core::model::{AwardOutcome, Badge, BadgeId, ModuleId, UserBadge, UserId};
use storage::repository::{BadgeRepository, NewBadgeRecord};
use tracing::info;

use crate::Clock;
use crate::error::BadgeServiceError;

/// Input for a new catalog badge.
#[derive(Debug, Clone, Default)]
pub struct BadgeDraft {
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub module_id: Option<ModuleId>,
}

/// Badge catalog and idempotent awards.
#[derive(Clone)]
pub struct BadgeService {
    clock: Clock,
    badges: Arc<dyn BadgeRepository>,
}

impl BadgeService {
    #[must_use]
    pub fn new(clock: Clock, badges: Arc<dyn BadgeRepository>) -> Self {
        Self { clock, badges }
    }

    /// # Errors
    ///
    /// Returns `BadgeServiceError::Storage` if repository access fails.
    pub async fn list(&self) -> Result<Vec<Badge>, BadgeServiceError> {
        Ok(self.badges.list_badges().await?)
    }

    /// # Errors
    ///
    /// Returns `BadgeServiceError::Badge` for a blank name.
    /// Returns `BadgeServiceError::Storage` with `StorageError::Conflict` if
    /// the name is taken.
    pub async fn create(&self, draft: BadgeDraft) -> Result<Badge, BadgeServiceError> {
        let probe = Badge::new(
            BadgeId::new(0),
            draft.name,
            draft.description,
            draft.image_url,
            draft.module_id,
            self.clock.now(),
        )?;
        let badge = self
            .badges
            .insert_badge(NewBadgeRecord::from_badge(&probe))
            .await?;
        info!(badge_id = %badge.id(), name = badge.name(), "created badge");
        Ok(badge)
    }

    /// Award a badge. A repeat award is reported, not treated as an error.
    ///
    /// # Errors
    ///
    /// Returns `BadgeServiceError::Storage` with `StorageError::NotFound` for
    /// an unknown badge or user.
    pub async fn award(
        &self,
        user_id: UserId,
        badge_id: BadgeId,
    ) -> Result<AwardOutcome, BadgeServiceError> {
        let outcome = self
            .badges
            .award_badge(user_id, badge_id, self.clock.now())
            .await?;
        info!(
            user_id = %user_id,
            badge_id = %badge_id,
            awarded = outcome.is_awarded(),
            "badge award"
        );
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns `BadgeServiceError::Storage` if repository access fails.
    pub async fn for_user(&self, user_id: UserId) -> Result<Vec<UserBadge>, BadgeServiceError> {
        Ok(self.badges.user_badges(user_id).await?)
    }
}
