use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::assessment::AssessmentScore;
use crate::model::ids::{AssessmentId, AttemptId, ModuleId, UserId};

/// One graded submission of an assessment. Attempts are append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentAttempt {
    pub id: Option<AttemptId>,
    pub user_id: UserId,
    pub assessment_id: AssessmentId,
    pub module_id: ModuleId,
    pub score: u32,
    pub correct: u32,
    pub total: u32,
    pub passed: bool,
    pub submitted_at: DateTime<Utc>,
}

impl AssessmentAttempt {
    #[must_use]
    pub fn from_score(
        user_id: UserId,
        assessment_id: AssessmentId,
        module_id: ModuleId,
        score: &AssessmentScore,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            user_id,
            assessment_id,
            module_id,
            score: score.score,
            correct: score.correct,
            total: score.total,
            passed: score.passed,
            submitted_at,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: AttemptId) -> Self {
        self.id = Some(id);
        self
    }
}
