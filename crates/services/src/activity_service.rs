use std::sync::Arc;

use aware_core::model::{ActivitySubmission, DEFAULT_ACTIVITY_POINTS, ModuleId, UserId};
use storage::repository::ActivityRepository;
use tracing::info;

use crate::Clock;
use crate::error::ActivityServiceError;
use crate::progress_service::{ProgressService, ProgressUpdate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityResult {
    pub submission: ActivitySubmission,
    pub progress: ProgressUpdate,
}

/// Records interactive exercises and credits their points to module progress.
#[derive(Clone)]
pub struct ActivityService {
    clock: Clock,
    activities: Arc<dyn ActivityRepository>,
    progress: Arc<ProgressService>,
    max_points: u32,
}

impl ActivityService {
    #[must_use]
    pub fn new(
        clock: Clock,
        activities: Arc<dyn ActivityRepository>,
        progress: Arc<ProgressService>,
    ) -> Self {
        Self {
            clock,
            activities,
            progress,
            max_points: DEFAULT_ACTIVITY_POINTS,
        }
    }

    /// # Errors
    ///
    /// Returns `ActivityServiceError::Activity` for a blank key or a score
    /// above 100. Returns `ActivityServiceError::Progress` for an unknown
    /// module.
    pub async fn submit(
        &self,
        user_id: UserId,
        module_id: ModuleId,
        activity_key: &str,
        score: u32,
    ) -> Result<ActivityResult, ActivityServiceError> {
        let mut submission = ActivitySubmission::new(
            user_id,
            module_id,
            activity_key,
            score,
            self.max_points,
            self.clock.now(),
        )?;
        // Progress first, so an unknown module never leaves an orphan row.
        let progress = self
            .progress
            .add_points(user_id, module_id, submission.points)
            .await?;
        submission.id = Some(self.activities.append_activity(&submission).await?);
        info!(
            user_id = %user_id,
            module_id = %module_id,
            activity = submission.activity_key.as_str(),
            points = submission.points,
            "activity submitted"
        );
        Ok(ActivityResult {
            submission,
            progress,
        })
    }

    /// # Errors
    ///
    /// Returns `ActivityServiceError::Storage` if repository access fails.
    pub async fn history(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ActivitySubmission>, ActivityServiceError> {
        Ok(self.activities.list_activities(user_id).await?)
    }
}
