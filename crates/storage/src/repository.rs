use async_trait::async_trait;
use aware_core::leaderboard::{self, PointsTotal};
use aware_core::model::{
    ActivitySubmission, Assessment, AssessmentAttempt, AssessmentDraft, AttemptId, AwardOutcome,
    Badge, BadgeId, LearningModule, ModuleDraft, ModuleId, ModuleProgress, Profile, Role, User,
    UserBadge, UserId, sort_catalog,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Insert shape for a user; the id is assigned by storage.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub profile: Profile,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl NewUserRecord {
    /// Take identity fields from an already validated (placeholder-id) user.
    #[must_use]
    pub fn from_user(user: &User, password_hash: String) -> Self {
        Self {
            username: user.username().to_string(),
            email: user.email().to_string(),
            role: user.role(),
            profile: user.profile().clone(),
            password_hash,
            created_at: user.created_at(),
        }
    }
}

/// A user together with the stored password hash, for login checks only.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub user: User,
    pub password_hash: String,
}

/// Insert shape for a badge; the id is assigned by storage.
#[derive(Debug, Clone)]
pub struct NewBadgeRecord {
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub module_id: Option<ModuleId>,
    pub created_at: DateTime<Utc>,
}

impl NewBadgeRecord {
    #[must_use]
    pub fn from_badge(badge: &Badge) -> Self {
        Self {
            name: badge.name().to_string(),
            description: badge.description().to_string(),
            image_url: badge.image_url().map(str::to_owned),
            module_id: badge.module_id(),
            created_at: badge.created_at(),
        }
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the username or email is taken.
    async fn insert_user(&self, user: NewUserRecord) -> Result<User, StorageError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Look up credentials by username (case-insensitive) or email.
    async fn find_credentials(&self, login: &str) -> Result<Option<CredentialRecord>, StorageError>;

    /// Persist profile and role changes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn update_user(&self, user: &User) -> Result<(), StorageError>;

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StorageError>;
}

#[async_trait]
pub trait ModuleRepository: Send + Sync {
    async fn insert_module(
        &self,
        draft: ModuleDraft,
        now: DateTime<Utc>,
    ) -> Result<LearningModule, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the module does not exist.
    async fn update_module(&self, module: &LearningModule) -> Result<(), StorageError>;

    async fn get_module(&self, id: ModuleId) -> Result<Option<LearningModule>, StorageError>;

    /// All modules in catalog order.
    async fn list_modules(&self) -> Result<Vec<LearningModule>, StorageError>;

    /// Delete a module and everything hanging off it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the module does not exist.
    async fn delete_module(&self, id: ModuleId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// Persist a validated draft, assigning assessment, question and answer ids.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the module already has an assessment,
    /// `StorageError::NotFound` if the module is missing.
    async fn insert_assessment(&self, draft: AssessmentDraft) -> Result<Assessment, StorageError>;

    async fn get_assessment(
        &self,
        id: aware_core::model::AssessmentId,
    ) -> Result<Option<Assessment>, StorageError>;

    async fn assessment_for_module(
        &self,
        module_id: ModuleId,
    ) -> Result<Option<Assessment>, StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn get_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Option<ModuleProgress>, StorageError>;

    /// Insert or replace the single row for `(user_id, module_id)`.
    async fn upsert_progress(&self, progress: &ModuleProgress) -> Result<(), StorageError>;

    async fn list_user_progress(&self, user_id: UserId)
    -> Result<Vec<ModuleProgress>, StorageError>;

    /// Points summed per user, highest first, ties by user id, at most `limit`.
    async fn points_totals(&self, limit: u32) -> Result<Vec<PointsTotal>, StorageError>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn append_attempt(&self, attempt: &AssessmentAttempt) -> Result<AttemptId, StorageError>;

    /// A user's attempts, newest first.
    async fn list_attempts(&self, user_id: UserId) -> Result<Vec<AssessmentAttempt>, StorageError>;
}

#[async_trait]
pub trait BadgeRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the name is taken.
    async fn insert_badge(&self, badge: NewBadgeRecord) -> Result<Badge, StorageError>;

    async fn get_badge(&self, id: BadgeId) -> Result<Option<Badge>, StorageError>;

    async fn list_badges(&self) -> Result<Vec<Badge>, StorageError>;

    async fn badges_for_module(&self, module_id: ModuleId) -> Result<Vec<Badge>, StorageError>;

    /// Idempotent award: an existing award yields `AwardOutcome::AlreadyAwarded`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the badge does not exist.
    async fn award_badge(
        &self,
        user_id: UserId,
        badge_id: BadgeId,
        awarded_at: DateTime<Utc>,
    ) -> Result<AwardOutcome, StorageError>;

    /// A user's badges, oldest award first.
    async fn user_badges(&self, user_id: UserId) -> Result<Vec<UserBadge>, StorageError>;
}

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn append_activity(&self, submission: &ActivitySubmission) -> Result<i64, StorageError>;

    /// A user's submissions, newest first.
    async fn list_activities(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ActivitySubmission>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, CredentialRecord>,
    modules: HashMap<ModuleId, LearningModule>,
    assessments: HashMap<ModuleId, Assessment>,
    progress: HashMap<(UserId, ModuleId), ModuleProgress>,
    attempts: Vec<AssessmentAttempt>,
    badges: HashMap<BadgeId, Badge>,
    awards: Vec<(UserId, BadgeId, DateTime<Utc>)>,
    activities: Vec<ActivitySubmission>,
    next_id: u64,
    next_question_id: u64,
    next_answer_id: u64,
}

impl MemoryState {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, user: NewUserRecord) -> Result<User, StorageError> {
        let mut guard = self.lock()?;
        let taken = guard.users.values().any(|r| {
            r.user.username().eq_ignore_ascii_case(&user.username) || r.user.email() == user.email
        });
        if taken {
            return Err(StorageError::Conflict);
        }
        let id = UserId::new(guard.next());
        let created = User::new(
            id,
            user.username,
            user.email,
            user.role,
            user.profile,
            user.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.users.insert(
            id,
            CredentialRecord {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.users.get(&id).map(|r| r.user.clone()))
    }

    async fn find_credentials(&self, login: &str) -> Result<Option<CredentialRecord>, StorageError> {
        let guard = self.lock()?;
        let login = login.trim();
        Ok(guard
            .users
            .values()
            .find(|r| {
                r.user.username().eq_ignore_ascii_case(login)
                    || r.user.email().eq_ignore_ascii_case(login)
            })
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let record = guard.users.get_mut(&user.id()).ok_or(StorageError::NotFound)?;
        record.user = user.clone();
        Ok(())
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StorageError> {
        let guard = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| guard.users.get(id).map(|r| r.user.clone()))
            .collect())
    }
}

#[async_trait]
impl ModuleRepository for InMemoryRepository {
    async fn insert_module(
        &self,
        draft: ModuleDraft,
        now: DateTime<Utc>,
    ) -> Result<LearningModule, StorageError> {
        let mut guard = self.lock()?;
        let id = ModuleId::new(guard.next());
        let module = LearningModule::new(id, draft, now)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.modules.insert(id, module.clone());
        Ok(module)
    }

    async fn update_module(&self, module: &LearningModule) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard.modules.get_mut(&module.id()).ok_or(StorageError::NotFound)?;
        *slot = module.clone();
        Ok(())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<LearningModule>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.modules.get(&id).cloned())
    }

    async fn list_modules(&self) -> Result<Vec<LearningModule>, StorageError> {
        let guard = self.lock()?;
        let mut modules: Vec<LearningModule> = guard.modules.values().cloned().collect();
        sort_catalog(&mut modules);
        Ok(modules)
    }

    async fn delete_module(&self, id: ModuleId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.modules.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        // Mirror the SQLite cascades.
        guard.assessments.remove(&id);
        guard.progress.retain(|(_, module_id), _| *module_id != id);
        guard.attempts.retain(|a| a.module_id != id);
        guard.activities.retain(|a| a.module_id != id);
        let unlinked: Vec<BadgeId> = guard
            .badges
            .values()
            .filter(|b| b.module_id() == Some(id))
            .map(Badge::id)
            .collect();
        for badge_id in unlinked {
            if let Some(b) = guard.badges.get(&badge_id).cloned() {
                let relinked = Badge::new(
                    b.id(),
                    b.name(),
                    b.description(),
                    b.image_url().map(str::to_owned),
                    None,
                    b.created_at(),
                )
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
                guard.badges.insert(badge_id, relinked);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AssessmentRepository for InMemoryRepository {
    async fn insert_assessment(&self, draft: AssessmentDraft) -> Result<Assessment, StorageError> {
        let mut guard = self.lock()?;
        if !guard.modules.contains_key(&draft.module_id) {
            return Err(StorageError::NotFound);
        }
        if guard.assessments.contains_key(&draft.module_id) {
            return Err(StorageError::Conflict);
        }
        let id = aware_core::model::AssessmentId::new(guard.next());
        let first_question = guard.next_question_id + 1;
        let first_answer = guard.next_answer_id + 1;
        let question_count = draft.questions.len() as u64;
        let answer_count = draft.answer_count() as u64;
        let module_id = draft.module_id;
        let assessment = draft
            .build(id, first_question, first_answer)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.next_question_id += question_count;
        guard.next_answer_id += answer_count;
        guard.assessments.insert(module_id, assessment.clone());
        Ok(assessment)
    }

    async fn get_assessment(
        &self,
        id: aware_core::model::AssessmentId,
    ) -> Result<Option<Assessment>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.assessments.values().find(|a| a.id() == id).cloned())
    }

    async fn assessment_for_module(
        &self,
        module_id: ModuleId,
    ) -> Result<Option<Assessment>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.assessments.get(&module_id).cloned())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Option<ModuleProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.progress.get(&(user_id, module_id)).cloned())
    }

    async fn upsert_progress(&self, progress: &ModuleProgress) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.users.contains_key(&progress.user_id())
            || !guard.modules.contains_key(&progress.module_id())
        {
            return Err(StorageError::NotFound);
        }
        guard
            .progress
            .insert((progress.user_id(), progress.module_id()), progress.clone());
        Ok(())
    }

    async fn list_user_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ModuleProgress>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<ModuleProgress> = guard
            .progress
            .values()
            .filter(|p| p.user_id() == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(ModuleProgress::module_id);
        Ok(rows)
    }

    async fn points_totals(&self, limit: u32) -> Result<Vec<PointsTotal>, StorageError> {
        let guard = self.lock()?;
        let mut totals = leaderboard::aggregate(guard.progress.values());
        leaderboard::order_totals(&mut totals, limit as usize);
        Ok(totals)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &AssessmentAttempt) -> Result<AttemptId, StorageError> {
        let mut guard = self.lock()?;
        let id = AttemptId::new(guard.next());
        guard.attempts.push(attempt.clone().with_id(id));
        Ok(id)
    }

    async fn list_attempts(&self, user_id: UserId) -> Result<Vec<AssessmentAttempt>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .attempts
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BadgeRepository for InMemoryRepository {
    async fn insert_badge(&self, badge: NewBadgeRecord) -> Result<Badge, StorageError> {
        let mut guard = self.lock()?;
        if guard.badges.values().any(|b| b.name() == badge.name) {
            return Err(StorageError::Conflict);
        }
        let id = BadgeId::new(guard.next());
        let created = Badge::new(
            id,
            badge.name,
            badge.description,
            badge.image_url,
            badge.module_id,
            badge.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.badges.insert(id, created.clone());
        Ok(created)
    }

    async fn get_badge(&self, id: BadgeId) -> Result<Option<Badge>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.badges.get(&id).cloned())
    }

    async fn list_badges(&self) -> Result<Vec<Badge>, StorageError> {
        let guard = self.lock()?;
        let mut badges: Vec<Badge> = guard.badges.values().cloned().collect();
        badges.sort_by_key(Badge::id);
        Ok(badges)
    }

    async fn badges_for_module(&self, module_id: ModuleId) -> Result<Vec<Badge>, StorageError> {
        let guard = self.lock()?;
        let mut badges: Vec<Badge> = guard
            .badges
            .values()
            .filter(|b| b.module_id() == Some(module_id))
            .cloned()
            .collect();
        badges.sort_by_key(Badge::id);
        Ok(badges)
    }

    async fn award_badge(
        &self,
        user_id: UserId,
        badge_id: BadgeId,
        awarded_at: DateTime<Utc>,
    ) -> Result<AwardOutcome, StorageError> {
        let mut guard = self.lock()?;
        let badge = guard.badges.get(&badge_id).cloned().ok_or(StorageError::NotFound)?;
        if !guard.users.contains_key(&user_id) {
            return Err(StorageError::NotFound);
        }
        if guard
            .awards
            .iter()
            .any(|(u, b, _)| *u == user_id && *b == badge_id)
        {
            return Ok(AwardOutcome::AlreadyAwarded);
        }
        guard.awards.push((user_id, badge_id, awarded_at));
        Ok(AwardOutcome::Awarded(UserBadge {
            user_id,
            badge,
            awarded_at,
        }))
    }

    async fn user_badges(&self, user_id: UserId) -> Result<Vec<UserBadge>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .awards
            .iter()
            .filter(|(u, _, _)| *u == user_id)
            .filter_map(|(u, b, at)| {
                guard.badges.get(b).map(|badge| UserBadge {
                    user_id: *u,
                    badge: badge.clone(),
                    awarded_at: *at,
                })
            })
            .collect())
    }
}

#[async_trait]
impl ActivityRepository for InMemoryRepository {
    async fn append_activity(&self, submission: &ActivitySubmission) -> Result<i64, StorageError> {
        let mut guard = self.lock()?;
        let id = i64::try_from(guard.next())
            .map_err(|_| StorageError::Serialization("id overflow".into()))?;
        let mut stored = submission.clone();
        stored.id = Some(id);
        guard.activities.push(stored);
        Ok(id)
    }

    async fn list_activities(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ActivitySubmission>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .activities
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub modules: Arc<dyn ModuleRepository>,
    pub assessments: Arc<dyn AssessmentRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub badges: Arc<dyn BadgeRepository>,
    pub activities: Arc<dyn ActivityRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            users: Arc::new(repo.clone()),
            modules: Arc::new(repo.clone()),
            assessments: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            badges: Arc::new(repo.clone()),
            activities: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aware_core::model::{Difficulty, DEFAULT_MODULE_POINTS};
    use aware_core::time::fixed_now;

    fn new_user(name: &str) -> NewUserRecord {
        NewUserRecord {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            role: Role::User,
            profile: Profile::default(),
            password_hash: "hash".into(),
            created_at: fixed_now(),
        }
    }

    fn draft(title: &str) -> ModuleDraft {
        ModuleDraft {
            title: title.into(),
            description: String::new(),
            difficulty: Difficulty::Beginner,
            content: String::new(),
            order_index: 0,
            section_count: 2,
            points: DEFAULT_MODULE_POINTS,
        }
    }

    #[tokio::test]
    async fn progress_is_unique_per_user_and_module() {
        let repo = InMemoryRepository::new();
        let user = repo.insert_user(new_user("alice")).await.unwrap();
        let module = repo.insert_module(draft("Phishing"), fixed_now()).await.unwrap();

        let mut p = ModuleProgress::new(user.id(), module.id(), fixed_now());
        repo.upsert_progress(&p).await.unwrap();
        p.start(fixed_now());
        repo.upsert_progress(&p).await.unwrap();

        let rows = repo.list_user_progress(user.id()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status(), p.status());
    }

    #[tokio::test]
    async fn duplicate_usernames_conflict_case_insensitively() {
        let repo = InMemoryRepository::new();
        repo.insert_user(new_user("alice")).await.unwrap();
        let mut dup = new_user("ALICE");
        dup.email = "other@example.com".into();
        let err = repo.insert_user(dup).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn second_award_reports_already_awarded() {
        let repo = InMemoryRepository::new();
        let user = repo.insert_user(new_user("bob")).await.unwrap();
        let badge = repo
            .insert_badge(NewBadgeRecord {
                name: "Phish Finder".into(),
                description: String::new(),
                image_url: None,
                module_id: None,
                created_at: fixed_now(),
            })
            .await
            .unwrap();

        let first = repo.award_badge(user.id(), badge.id(), fixed_now()).await.unwrap();
        assert!(first.is_awarded());
        let second = repo.award_badge(user.id(), badge.id(), fixed_now()).await.unwrap();
        assert_eq!(second, AwardOutcome::AlreadyAwarded);
        assert_eq!(repo.user_badges(user.id()).await.unwrap().len(), 1);
    }
}
