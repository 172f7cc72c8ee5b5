//! Request and response bodies.

use aware_core::leaderboard::LeaderboardEntry;
use aware_core::model::{
    ActivitySubmission, AssessmentDraft, AssessmentScore, AttemptId, AwardOutcome, BadgeId,
    Difficulty, LearningModule, ModuleId, ModuleProgress, Profile, QuestionDraft, Role, User,
    UserBadge, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use services::{
    ActivityResult, AssessmentSummary, AuthSession, BadgeDraft, ModuleDetail, ProgressUpdate,
    SubmissionResult,
};

//
// ─── AUTH ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl RegisterRequest {
    #[must_use]
    pub fn profile(&self) -> Profile {
        Profile {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            ..Profile::default()
        }
    }
}

/// `login` accepts a username or an email address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub display_name: String,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            username: user.username().to_string(),
            email: user.email().to_string(),
            role: user.role(),
            display_name: user.display_name(),
            profile: user.profile().clone(),
            created_at: user.created_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            expires_at: session.expires_at,
            user: UserResponse::from(&session.user),
        }
    }
}

//
// ─── MODULES ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleResponse {
    pub id: ModuleId,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub content: String,
    pub order_index: u32,
    pub section_count: u32,
    pub points: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&LearningModule> for ModuleResponse {
    fn from(m: &LearningModule) -> Self {
        Self {
            id: m.id(),
            title: m.title().to_string(),
            description: m.description().to_string(),
            difficulty: m.difficulty(),
            content: m.content().to_string(),
            order_index: m.order_index(),
            section_count: m.section_count(),
            points: m.points(),
            created_at: m.created_at(),
            updated_at: m.updated_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleDetailResponse {
    #[serde(flatten)]
    pub module: ModuleResponse,
    pub assessment: Option<AssessmentSummary>,
}

impl From<ModuleDetail> for ModuleDetailResponse {
    fn from(detail: ModuleDetail) -> Self {
        Self {
            module: ModuleResponse::from(&detail.module),
            assessment: detail.assessment,
        }
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionsRequest {
    pub completed_sections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub progress: ModuleProgress,
    /// Badges granted by this call.
    pub awarded_badges: Vec<UserBadge>,
}

impl From<ProgressUpdate> for ProgressResponse {
    fn from(update: ProgressUpdate) -> Self {
        Self {
            progress: update.progress,
            awarded_badges: update.awarded,
        }
    }
}

//
// ─── ASSESSMENTS ───────────────────────────────────────────────────────────────
//

/// New assessment; `passing_score` falls back to the server default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAssessmentRequest {
    pub module_id: ModuleId,
    pub title: String,
    #[serde(default)]
    pub passing_score: Option<u32>,
    #[serde(default)]
    pub time_limit_secs: Option<u32>,
    pub questions: Vec<QuestionDraft>,
}

impl CreateAssessmentRequest {
    #[must_use]
    pub fn into_draft(self, default_passing_score: u32) -> AssessmentDraft {
        AssessmentDraft {
            module_id: self.module_id,
            title: self.title,
            passing_score: self.passing_score.unwrap_or(default_passing_score),
            time_limit_secs: self.time_limit_secs,
            questions: self.questions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub attempt_id: AttemptId,
    pub module_id: ModuleId,
    #[serde(flatten)]
    pub score: AssessmentScore,
    pub module_completed: bool,
    pub progress: Option<ModuleProgress>,
    pub awarded_badges: Vec<UserBadge>,
}

impl From<SubmissionResult> for SubmissionResponse {
    fn from(result: SubmissionResult) -> Self {
        let (progress, awarded_badges) = match result.completion {
            Some(update) => (Some(update.progress), update.awarded),
            None => (None, Vec::new()),
        };
        Self {
            attempt_id: result.attempt_id,
            module_id: result.module_id,
            module_completed: progress.as_ref().is_some_and(ModuleProgress::is_completed),
            score: result.score,
            progress,
            awarded_badges,
        }
    }
}

//
// ─── ACTIVITIES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRequest {
    pub module_id: ModuleId,
    pub activity_key: String,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub submission: ActivitySubmission,
    pub progress: ModuleProgress,
}

impl From<ActivityResult> for ActivityResponse {
    fn from(result: ActivityResult) -> Self {
        Self {
            submission: result.submission,
            progress: result.progress.progress,
        }
    }
}

//
// ─── BADGES ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBadgeRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub module_id: Option<ModuleId>,
}

impl From<CreateBadgeRequest> for BadgeDraft {
    fn from(req: CreateBadgeRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            image_url: req.image_url,
            module_id: req.module_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardRequest {
    pub user_id: UserId,
    pub badge_id: BadgeId,
}

/// `success` is false when the user already held the badge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardResponse {
    pub success: bool,
    pub message: String,
    pub badge: Option<UserBadge>,
}

impl From<AwardOutcome> for AwardResponse {
    fn from(outcome: AwardOutcome) -> Self {
        let message = outcome.message().to_string();
        match outcome {
            AwardOutcome::Awarded(badge) => Self {
                success: true,
                message,
                badge: Some(badge),
            },
            AwardOutcome::AlreadyAwarded => Self {
                success: false,
                message,
                badge: None,
            },
        }
    }
}

//
// ─── LEADERBOARD / HEALTH ──────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub limit: u32,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
