use std::sync::Arc;

use chrono::Duration;
use storage::repository::Storage;

use crate::Clock;
use crate::activity_service::ActivityService;
use crate::assessment_service::AssessmentService;
use crate::auth_service::AuthService;
use crate::badge_service::BadgeService;
use crate::dashboard_service::DashboardService;
use crate::error::AppServicesError;
use crate::leaderboard_service::{DEFAULT_LEADERBOARD_LIMIT, LeaderboardService, MAX_LEADERBOARD_LIMIT};
use crate::module_service::ModuleService;
use crate::progress_service::ProgressService;

/// Knobs the outer layers pass down when assembling services.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub leaderboard_default: u32,
    pub leaderboard_max: u32,
}

impl ServiceSettings {
    #[must_use]
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::hours(24),
            leaderboard_default: DEFAULT_LEADERBOARD_LIMIT,
            leaderboard_max: MAX_LEADERBOARD_LIMIT,
        }
    }
}

/// Assembles every app-facing service over one `Storage`.
#[derive(Clone)]
pub struct AppServices {
    auth: Arc<AuthService>,
    modules: Arc<ModuleService>,
    progress: Arc<ProgressService>,
    assessments: Arc<AssessmentService>,
    activities: Arc<ActivityService>,
    badges: Arc<BadgeService>,
    leaderboard: Arc<LeaderboardService>,
    dashboard: Arc<DashboardService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: &ServiceSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, settings))
    }

    /// Build services over in-memory storage (tests, demos).
    #[must_use]
    pub fn in_memory(clock: Clock, settings: &ServiceSettings) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, settings)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, settings: &ServiceSettings) -> Self {
        let auth = Arc::new(AuthService::new(
            clock,
            Arc::clone(&storage.users),
            &settings.jwt_secret,
            settings.token_ttl,
        ));
        let modules = Arc::new(ModuleService::new(
            clock,
            Arc::clone(&storage.modules),
            Arc::clone(&storage.assessments),
        ));
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.modules),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.badges),
        ));
        let assessments = Arc::new(AssessmentService::new(
            clock,
            Arc::clone(&storage.assessments),
            Arc::clone(&storage.attempts),
            Arc::clone(&progress),
        ));
        let activities = Arc::new(ActivityService::new(
            clock,
            Arc::clone(&storage.activities),
            Arc::clone(&progress),
        ));
        let badges = Arc::new(BadgeService::new(clock, Arc::clone(&storage.badges)));
        let leaderboard = Arc::new(
            LeaderboardService::new(Arc::clone(&storage.users), Arc::clone(&storage.progress))
                .with_limits(settings.leaderboard_default, settings.leaderboard_max),
        );
        let dashboard = Arc::new(DashboardService::new(
            Arc::clone(&storage.modules),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.badges),
            Arc::clone(&leaderboard),
        ));

        Self {
            auth,
            modules,
            progress,
            assessments,
            activities,
            badges,
            leaderboard,
            dashboard,
        }
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn modules(&self) -> Arc<ModuleService> {
        Arc::clone(&self.modules)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn assessments(&self) -> Arc<AssessmentService> {
        Arc::clone(&self.assessments)
    }

    #[must_use]
    pub fn activities(&self) -> Arc<ActivityService> {
        Arc::clone(&self.activities)
    }

    #[must_use]
    pub fn badges(&self) -> Arc<BadgeService> {
        Arc::clone(&self.badges)
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboard)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }
}
