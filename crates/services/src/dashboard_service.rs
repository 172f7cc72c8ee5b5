use std::sync::Arc;

use aware_core::model::{AssessmentAttempt, CompletionStatus, UserBadge, UserId, percentage};
use serde::Serialize;
use storage::repository::{
    AttemptRepository, BadgeRepository, ModuleRepository, ProgressRepository, StorageError,
};

use crate::leaderboard_service::LeaderboardService;

const RECENT_ATTEMPTS: usize = 5;

/// Per-learner overview shown on the dashboard page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub user_id: UserId,
    pub modules_total: u32,
    pub modules_completed: u32,
    pub modules_in_progress: u32,
    pub total_points: u64,
    pub badges: Vec<UserBadge>,
    pub attempts_total: u32,
    pub attempts_passed: u32,
    /// Share of passed attempts, integer percent.
    pub pass_rate: u32,
    pub rank: Option<u32>,
    pub recent_attempts: Vec<AssessmentAttempt>,
}

#[derive(Clone)]
pub struct DashboardService {
    modules: Arc<dyn ModuleRepository>,
    progress: Arc<dyn ProgressRepository>,
    attempts: Arc<dyn AttemptRepository>,
    badges: Arc<dyn BadgeRepository>,
    leaderboard: Arc<LeaderboardService>,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        modules: Arc<dyn ModuleRepository>,
        progress: Arc<dyn ProgressRepository>,
        attempts: Arc<dyn AttemptRepository>,
        badges: Arc<dyn BadgeRepository>,
        leaderboard: Arc<LeaderboardService>,
    ) -> Self {
        Self {
            modules,
            progress,
            attempts,
            badges,
            leaderboard,
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    pub async fn summary(&self, user_id: UserId) -> Result<DashboardSummary, StorageError> {
        let modules_total = self.modules.list_modules().await?.len();
        let rows = self.progress.list_user_progress(user_id).await?;
        let mut attempts = self.attempts.list_attempts(user_id).await?;
        let badges = self.badges.user_badges(user_id).await?;
        let rank = self.leaderboard.rank_of(user_id).await?;

        let count = |status: CompletionStatus| {
            count_u32(rows.iter().filter(|r| r.status() == status).count())
        };
        let attempts_total = count_u32(attempts.len());
        let attempts_passed = count_u32(attempts.iter().filter(|a| a.passed).count());
        attempts.truncate(RECENT_ATTEMPTS);

        Ok(DashboardSummary {
            user_id,
            modules_total: count_u32(modules_total),
            modules_completed: count(CompletionStatus::Completed),
            modules_in_progress: count(CompletionStatus::InProgress),
            total_points: rows.iter().map(|r| u64::from(r.points_earned())).sum(),
            badges,
            attempts_total,
            attempts_passed,
            pass_rate: percentage(attempts_passed, attempts_total),
            rank,
            recent_attempts: attempts,
        })
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aware_core::model::{
        AssessmentId, AssessmentScore, Difficulty, ModuleDraft, ModuleProgress, Profile, Role,
    };
    use aware_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, NewUserRecord, UserRepository};

    #[tokio::test]
    async fn summary_counts_progress_attempts_and_rank() {
        let repo = Arc::new(InMemoryRepository::new());
        let user = repo
            .insert_user(NewUserRecord {
                username: "dash".into(),
                email: "dash@example.com".into(),
                role: Role::User,
                profile: Profile::default(),
                password_hash: "hash".into(),
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        let mut module_ids = Vec::new();
        for (i, title) in ["Phishing", "Passwords", "Browsing"].iter().enumerate() {
            let m = repo
                .insert_module(
                    ModuleDraft {
                        title: (*title).into(),
                        description: String::new(),
                        difficulty: Difficulty::Beginner,
                        content: String::new(),
                        order_index: u32::try_from(i).unwrap(),
                        section_count: 1,
                        points: 100,
                    },
                    fixed_now(),
                )
                .await
                .unwrap();
            module_ids.push(m.id());
        }

        let mut done = ModuleProgress::new(user.id(), module_ids[0], fixed_now());
        done.complete(100, fixed_now());
        repo.upsert_progress(&done).await.unwrap();
        let mut started = ModuleProgress::new(user.id(), module_ids[1], fixed_now());
        started.start(fixed_now());
        repo.upsert_progress(&started).await.unwrap();

        for passed in [false, true, true] {
            let score = AssessmentScore {
                correct: if passed { 4 } else { 1 },
                total: 5,
                score: if passed { 80 } else { 20 },
                passing_score: 70,
                passed,
                outcomes: Vec::new(),
            };
            repo.append_attempt(&AssessmentAttempt::from_score(
                user.id(),
                AssessmentId::new(1),
                module_ids[0],
                &score,
                fixed_now(),
            ))
            .await
            .unwrap();
        }

        let leaderboard = Arc::new(LeaderboardService::new(repo.clone(), repo.clone()));
        let service = DashboardService::new(
            repo.clone(),
            repo.clone(),
            repo.clone(),
            repo,
            leaderboard,
        );
        let summary = service.summary(user.id()).await.unwrap();
        assert_eq!(summary.modules_total, 3);
        assert_eq!(summary.modules_completed, 1);
        assert_eq!(summary.modules_in_progress, 1);
        assert_eq!(summary.total_points, 100);
        assert_eq!(summary.attempts_total, 3);
        assert_eq!(summary.attempts_passed, 2);
        assert_eq!(summary.pass_rate, 67);
        assert_eq!(summary.rank, Some(1));
    }
}
