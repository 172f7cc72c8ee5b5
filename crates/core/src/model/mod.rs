mod activity;
mod assessment;
mod attempt;
mod badge;
mod ids;
mod module;
mod progress;
mod user;

pub use ids::{AnswerId, AssessmentId, AttemptId, BadgeId, ModuleId, ParseIdError, QuestionId, UserId};

pub use activity::{ActivityError, ActivitySubmission, DEFAULT_ACTIVITY_POINTS};
pub use assessment::{
    Answer, AnswerDraft, Assessment, AssessmentDraft, AssessmentError, AssessmentScore,
    PublicAnswer, PublicAssessment, PublicQuestion, Question, QuestionDraft, QuestionOutcome,
    Selection, percentage,
};
pub use attempt::AssessmentAttempt;
pub use badge::{ALREADY_AWARDED_MESSAGE, AwardOutcome, Badge, BadgeError, UserBadge};
pub use module::{DEFAULT_MODULE_POINTS, Difficulty, LearningModule, ModuleDraft, ModuleError, sort_catalog};
pub use progress::{CompletionStatus, ModuleProgress, ProgressError, Transition};
pub use user::{Profile, Role, User, UserError};
