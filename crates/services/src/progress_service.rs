use std::sync::Arc;

use aware_core::model::{
    AwardOutcome, LearningModule, ModuleId, ModuleProgress, Transition, UserBadge, UserId,
};
use storage::repository::{BadgeRepository, ModuleRepository, ProgressRepository, StorageError};
use tracing::{debug, info};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Result of a progress mutation: the persisted row, what changed, and any
/// badges the change unlocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub progress: ModuleProgress,
    pub transition: Transition,
    pub awarded: Vec<UserBadge>,
}

/// Drives the per-(user, module) progress state machine.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    modules: Arc<dyn ModuleRepository>,
    progress: Arc<dyn ProgressRepository>,
    badges: Arc<dyn BadgeRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        modules: Arc<dyn ModuleRepository>,
        progress: Arc<dyn ProgressRepository>,
        badges: Arc<dyn BadgeRepository>,
    ) -> Self {
        Self {
            clock,
            modules,
            progress,
            badges,
        }
    }

    /// NOT_STARTED -> IN_PROGRESS.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` with `StorageError::NotFound`
    /// for an unknown module, or if persistence fails.
    pub async fn start(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<ProgressUpdate, ProgressServiceError> {
        let (_, mut row) = self.load(user_id, module_id).await?;
        let transition = row.start(self.clock.now());
        self.save(row, transition).await
    }

    /// Record how many of the module's sections the learner has finished.
    ///
    /// # Errors
    ///
    /// Same as [`ProgressService::start`].
    pub async fn record_sections(
        &self,
        user_id: UserId,
        module_id: ModuleId,
        completed_sections: u32,
    ) -> Result<ProgressUpdate, ProgressServiceError> {
        let (module, mut row) = self.load(user_id, module_id).await?;
        let transition = row.record_sections(
            completed_sections,
            module.section_count(),
            module.points(),
            self.clock.now(),
        );
        self.save(row, transition).await
    }

    /// Mark the module completed. Completing twice leaves points unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`ProgressService::start`].
    pub async fn complete(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<ProgressUpdate, ProgressServiceError> {
        let (module, mut row) = self.load(user_id, module_id).await?;
        let transition = row.complete(module.points(), self.clock.now());
        self.save(row, transition).await
    }

    /// Credit extra points (interactive activities) to the module row.
    ///
    /// # Errors
    ///
    /// Same as [`ProgressService::start`].
    pub async fn add_points(
        &self,
        user_id: UserId,
        module_id: ModuleId,
        points: u32,
    ) -> Result<ProgressUpdate, ProgressServiceError> {
        let (_, mut row) = self.load(user_id, module_id).await?;
        let transition = row.add_points(points, self.clock.now());
        self.save(row, transition).await
    }

    /// Touch `last_accessed_at` without changing status.
    ///
    /// # Errors
    ///
    /// Same as [`ProgressService::start`].
    pub async fn record_access(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<ModuleProgress, ProgressServiceError> {
        let (_, mut row) = self.load(user_id, module_id).await?;
        row.touch(self.clock.now());
        self.progress.upsert_progress(&row).await?;
        Ok(row)
    }

    /// Progress for one module; a NOT_STARTED row (not persisted) when the
    /// learner never opened it.
    ///
    /// # Errors
    ///
    /// Same as [`ProgressService::start`].
    pub async fn get(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<ModuleProgress, ProgressServiceError> {
        let (_, row) = self.load(user_id, module_id).await?;
        Ok(row)
    }

    /// Every persisted row for a learner, ordered by module id.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<ModuleProgress>, ProgressServiceError> {
        Ok(self.progress.list_user_progress(user_id).await?)
    }

    async fn load(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<(LearningModule, ModuleProgress), ProgressServiceError> {
        let module = self
            .modules
            .get_module(module_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let row = match self.progress.get_progress(user_id, module_id).await? {
            Some(row) => row,
            None => ModuleProgress::new(user_id, module_id, self.clock.now()),
        };
        Ok((module, row))
    }

    async fn save(
        &self,
        progress: ModuleProgress,
        transition: Transition,
    ) -> Result<ProgressUpdate, ProgressServiceError> {
        self.progress.upsert_progress(&progress).await?;
        debug!(
            user_id = %progress.user_id(),
            module_id = %progress.module_id(),
            status = progress.status().as_str(),
            ?transition,
            "saved progress"
        );

        let awarded = if transition == Transition::Completed {
            info!(user_id = %progress.user_id(), module_id = %progress.module_id(), "module completed");
            self.award_module_badges(progress.user_id(), progress.module_id())
                .await?
        } else {
            Vec::new()
        };

        Ok(ProgressUpdate {
            progress,
            transition,
            awarded,
        })
    }

    async fn award_module_badges(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Vec<UserBadge>, ProgressServiceError> {
        let now = self.clock.now();
        let mut awarded = Vec::new();
        for badge in self.badges.badges_for_module(module_id).await? {
            if let AwardOutcome::Awarded(held) =
                self.badges.award_badge(user_id, badge.id(), now).await?
            {
                info!(user_id = %user_id, badge = held.badge.name(), "badge awarded on completion");
                awarded.push(held);
            }
        }
        Ok(awarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aware_core::model::{CompletionStatus, Difficulty, ModuleDraft, Profile, Role};
    use aware_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, NewBadgeRecord, NewUserRecord, UserRepository};

    struct Fixture {
        service: ProgressService,
        user: UserId,
        module: ModuleId,
    }

    async fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryRepository::new());
        let user = repo
            .insert_user(NewUserRecord {
                username: "learner".into(),
                email: "learner@example.com".into(),
                role: Role::User,
                profile: Profile::default(),
                password_hash: "hash".into(),
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        let module = repo
            .insert_module(
                ModuleDraft {
                    title: "Phishing".into(),
                    description: String::new(),
                    difficulty: Difficulty::Beginner,
                    content: String::new(),
                    order_index: 1,
                    section_count: 4,
                    points: 100,
                },
                fixed_now(),
            )
            .await
            .unwrap();
        repo.insert_badge(NewBadgeRecord {
            name: "Phish Spotter".into(),
            description: String::new(),
            image_url: None,
            module_id: Some(module.id()),
            created_at: fixed_now(),
        })
        .await
        .unwrap();

        let service = ProgressService::new(
            Clock::fixed(fixed_now()),
            repo.clone(),
            repo.clone(),
            repo,
        );
        Fixture {
            service,
            user: user.id(),
            module: module.id(),
        }
    }

    #[tokio::test]
    async fn untouched_module_reads_as_not_started() {
        let f = fixture().await;
        let row = f.service.get(f.user, f.module).await.unwrap();
        assert_eq!(row.status(), CompletionStatus::NotStarted);
        assert!(f.service.list(f.user).await.unwrap().is_empty());

        assert!(matches!(
            f.service.get(f.user, ModuleId::new(404)).await,
            Err(ProgressServiceError::Storage(StorageError::NotFound))
        ));
    }

    #[tokio::test]
    async fn sections_advance_then_complete_and_award_once() {
        let f = fixture().await;
        let update = f.service.record_sections(f.user, f.module, 1).await.unwrap();
        assert_eq!(update.transition, Transition::Advanced);
        assert_eq!(update.progress.progress_percentage(), 25);

        let update = f.service.record_sections(f.user, f.module, 4).await.unwrap();
        assert_eq!(update.transition, Transition::Completed);
        assert_eq!(update.progress.status(), CompletionStatus::Completed);
        assert_eq!(update.progress.points_earned(), 100);
        assert_eq!(update.awarded.len(), 1);

        let again = f.service.complete(f.user, f.module).await.unwrap();
        assert_eq!(again.transition, Transition::Unchanged);
        assert_eq!(again.progress.points_earned(), 100);
        assert!(again.awarded.is_empty());
        assert_eq!(f.service.list(f.user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn completing_without_starting_sets_full_progress() {
        let f = fixture().await;
        let update = f.service.complete(f.user, f.module).await.unwrap();
        assert_eq!(update.progress.status(), CompletionStatus::Completed);
        assert_eq!(update.progress.progress_percentage(), 100);
        assert!(update.progress.started_at().is_some());
    }

    #[tokio::test]
    async fn access_and_points_start_the_module() {
        let f = fixture().await;
        let touched = f.service.record_access(f.user, f.module).await.unwrap();
        assert_eq!(touched.status(), CompletionStatus::NotStarted);

        let update = f.service.add_points(f.user, f.module, 7).await.unwrap();
        assert_eq!(update.transition, Transition::Started);
        assert_eq!(update.progress.points_earned(), 7);
    }
}
