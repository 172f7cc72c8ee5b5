use std::collections::HashMap;
use std::sync::Arc;

use aware_core::leaderboard::{self, LeaderboardEntry};
use aware_core::model::UserId;
use storage::repository::{ProgressRepository, StorageError, UserRepository};

pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

/// Top learners by points earned across all modules.
#[derive(Clone)]
pub struct LeaderboardService {
    users: Arc<dyn UserRepository>,
    progress: Arc<dyn ProgressRepository>,
    default_limit: u32,
    max_limit: u32,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self {
            users,
            progress,
            default_limit: DEFAULT_LEADERBOARD_LIMIT,
            max_limit: MAX_LEADERBOARD_LIMIT,
        }
    }

    /// Override the default and maximum page sizes; the default is kept
    /// within `1..=max`.
    #[must_use]
    pub fn with_limits(mut self, default_limit: u32, max_limit: u32) -> Self {
        self.max_limit = max_limit.max(1);
        self.default_limit = default_limit.clamp(1, self.max_limit);
        self
    }

    /// `requested` falls back to the default and is clamped to `1..=max`.
    #[must_use]
    pub fn effective_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }

    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    pub async fn top(&self, requested: Option<u32>) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let limit = self.effective_limit(requested);
        let totals = self.progress.points_totals(limit).await?;
        let ids: Vec<UserId> = totals.iter().map(|t| t.user_id).collect();
        let users: HashMap<UserId, _> = self
            .users
            .users_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id(), u))
            .collect();
        Ok(leaderboard::rank(&totals, &users))
    }

    /// 1-based position of a learner among everyone with progress.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    pub async fn rank_of(&self, user_id: UserId) -> Result<Option<u32>, StorageError> {
        let totals = self.progress.points_totals(u32::MAX).await?;
        Ok(totals
            .iter()
            .position(|t| t.user_id == user_id)
            .map(|i| u32::try_from(i + 1).unwrap_or(u32::MAX)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aware_core::model::{Difficulty, ModuleDraft, ModuleProgress, Profile, Role};
    use aware_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, ModuleRepository, NewUserRecord};

    #[test]
    fn limits_are_clamped() {
        let repo = Arc::new(InMemoryRepository::new());
        let board = LeaderboardService::new(repo.clone(), repo);
        assert_eq!(board.effective_limit(None), DEFAULT_LEADERBOARD_LIMIT);
        assert_eq!(board.effective_limit(Some(0)), 1);
        assert_eq!(board.effective_limit(Some(5000)), MAX_LEADERBOARD_LIMIT);

        let small = board.with_limits(50, 20);
        assert_eq!(small.effective_limit(None), 20);
    }

    #[tokio::test]
    async fn entries_are_ranked_by_points() {
        let repo = Arc::new(InMemoryRepository::new());
        let module = repo
            .insert_module(
                ModuleDraft {
                    title: "Passwords".into(),
                    description: String::new(),
                    difficulty: Difficulty::Beginner,
                    content: String::new(),
                    order_index: 0,
                    section_count: 1,
                    points: 100,
                },
                fixed_now(),
            )
            .await
            .unwrap();

        let mut ids = Vec::new();
        for (name, points) in [("low", 10), ("high", 90), ("mid", 40)] {
            let user = repo
                .insert_user(NewUserRecord {
                    username: name.into(),
                    email: format!("{name}@example.com"),
                    role: Role::User,
                    profile: Profile::default(),
                    password_hash: "hash".into(),
                    created_at: fixed_now(),
                })
                .await
                .unwrap();
            let mut row = ModuleProgress::new(user.id(), module.id(), fixed_now());
            row.add_points(points, fixed_now());
            repo.upsert_progress(&row).await.unwrap();
            ids.push(user.id());
        }

        let board = LeaderboardService::new(repo.clone(), repo);
        let top = board.top(Some(2)).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].username, "high");
        assert_eq!(top[0].rank, 1);
        assert_eq!(top[1].username, "mid");
        assert_eq!(board.rank_of(ids[0]).await.unwrap(), Some(3));
        assert_eq!(board.rank_of(UserId::new(999)).await.unwrap(), None);
    }
}
