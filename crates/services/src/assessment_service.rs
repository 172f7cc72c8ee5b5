use std::sync::Arc;

use aware_core::model::{
    Assessment, AssessmentAttempt, AssessmentDraft, AssessmentId, AssessmentScore, AttemptId,
    ModuleId, PublicAssessment, Selection, UserId,
};
use serde::{Deserialize, Serialize};
use storage::repository::{AssessmentRepository, AttemptRepository, StorageError};
use tracing::info;

use crate::Clock;
use crate::error::AssessmentServiceError;
use crate::progress_service::{ProgressService, ProgressUpdate};

/// A learner's answers to one assessment. Questions left out count as wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub assessment_id: AssessmentId,
    #[serde(default)]
    pub answers: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub attempt_id: AttemptId,
    pub module_id: ModuleId,
    pub score: AssessmentScore,
    /// Set when the attempt passed and the module was marked completed.
    pub completion: Option<ProgressUpdate>,
}

/// Quiz authoring, grading, and attempt history.
#[derive(Clone)]
pub struct AssessmentService {
    clock: Clock,
    assessments: Arc<dyn AssessmentRepository>,
    attempts: Arc<dyn AttemptRepository>,
    progress: Arc<ProgressService>,
}

impl AssessmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        assessments: Arc<dyn AssessmentRepository>,
        attempts: Arc<dyn AttemptRepository>,
        progress: Arc<ProgressService>,
    ) -> Self {
        Self {
            clock,
            assessments,
            attempts,
            progress,
        }
    }

    /// The learner-facing view (no correct flags, no explanations).
    ///
    /// # Errors
    ///
    /// Returns `AssessmentServiceError::Storage` if repository access fails.
    pub async fn for_module(
        &self,
        module_id: ModuleId,
    ) -> Result<Option<PublicAssessment>, AssessmentServiceError> {
        let assessment = self.assessments.assessment_for_module(module_id).await?;
        Ok(assessment.as_ref().map(Assessment::public_view))
    }

    /// # Errors
    ///
    /// Returns `AssessmentServiceError::Assessment` for a malformed question
    /// bank. Returns `AssessmentServiceError::Storage` with
    /// `StorageError::Conflict` if the module already has an assessment.
    pub async fn create(&self, draft: AssessmentDraft) -> Result<Assessment, AssessmentServiceError> {
        draft.validate()?;
        let assessment = self.assessments.insert_assessment(draft).await?;
        info!(
            assessment_id = %assessment.id(),
            module_id = %assessment.module_id(),
            questions = assessment.questions().len(),
            "created assessment"
        );
        Ok(assessment)
    }

    /// Grade a submission and record the attempt. A passing score completes
    /// the module, which in turn awards any module badges.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentServiceError::Storage` with `StorageError::NotFound`
    /// for an unknown assessment, or if persistence fails.
    pub async fn submit(
        &self,
        user_id: UserId,
        submission: &Submission,
    ) -> Result<SubmissionResult, AssessmentServiceError> {
        let assessment = self
            .assessments
            .get_assessment(submission.assessment_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let score = assessment.score(&submission.answers);

        let attempt = AssessmentAttempt::from_score(
            user_id,
            assessment.id(),
            assessment.module_id(),
            &score,
            self.clock.now(),
        );
        let attempt_id = self.attempts.append_attempt(&attempt).await?;
        info!(
            user_id = %user_id,
            assessment_id = %assessment.id(),
            score = score.score,
            passed = score.passed,
            "assessment submitted"
        );

        let completion = if score.passed {
            Some(self.progress.complete(user_id, assessment.module_id()).await?)
        } else {
            None
        };

        Ok(SubmissionResult {
            attempt_id,
            module_id: assessment.module_id(),
            score,
            completion,
        })
    }

    /// A learner's attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentServiceError::Storage` if repository access fails.
    pub async fn attempts(
        &self,
        user_id: UserId,
    ) -> Result<Vec<AssessmentAttempt>, AssessmentServiceError> {
        Ok(self.attempts.list_attempts(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aware_core::model::{
        AnswerDraft, AssessmentError, CompletionStatus, Difficulty, ModuleDraft, Profile,
        QuestionDraft, Role,
    };
    use aware_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, ModuleRepository, NewUserRecord, UserRepository};

    fn question(text: &str) -> QuestionDraft {
        QuestionDraft {
            text: text.into(),
            explanation: None,
            answers: vec![
                AnswerDraft {
                    text: "Yes".into(),
                    is_correct: true,
                },
                AnswerDraft {
                    text: "No".into(),
                    is_correct: false,
                },
            ],
        }
    }

    async fn setup() -> (AssessmentService, UserId, ModuleId) {
        let repo = Arc::new(InMemoryRepository::new());
        let clock = Clock::fixed(fixed_now());
        let user = repo
            .insert_user(NewUserRecord {
                username: "quizzer".into(),
                email: "quizzer@example.com".into(),
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
                    title: "Passwords".into(),
                    description: String::new(),
                    difficulty: Difficulty::Beginner,
                    content: String::new(),
                    order_index: 1,
                    section_count: 2,
                    points: 50,
                },
                fixed_now(),
            )
            .await
            .unwrap();
        let progress = Arc::new(ProgressService::new(
            clock,
            repo.clone(),
            repo.clone(),
            repo.clone(),
        ));
        let service = AssessmentService::new(clock, repo.clone(), repo, progress);
        (service, user.id(), module.id())
    }

    #[tokio::test]
    async fn public_view_hides_answers() {
        let (service, _, module_id) = setup().await;
        service
            .create(AssessmentDraft {
                module_id,
                title: "Check".into(),
                passing_score: 70,
                time_limit_secs: None,
                questions: vec![question("Use a manager?")],
            })
            .await
            .unwrap();

        let view = service.for_module(module_id).await.unwrap().unwrap();
        assert_eq!(view.questions.len(), 1);
        assert_eq!(view.questions[0].answers.len(), 2);
    }

    #[tokio::test]
    async fn invalid_drafts_are_rejected_before_storage() {
        let (service, _, module_id) = setup().await;
        let mut bad = question("Two right answers?");
        bad.answers[1].is_correct = true;
        let err = service
            .create(AssessmentDraft {
                module_id,
                title: "Broken".into(),
                passing_score: 70,
                time_limit_secs: None,
                questions: vec![bad],
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssessmentServiceError::Assessment(AssessmentError::CorrectAnswerCount(_))
        ));
    }

    #[tokio::test]
    async fn passing_completes_module_and_failing_only_records() {
        let (service, user, module_id) = setup().await;
        let assessment = service
            .create(AssessmentDraft {
                module_id,
                title: "Check".into(),
                passing_score: 70,
                time_limit_secs: Some(120),
                questions: vec![question("A?"), question("B?")],
            })
            .await
            .unwrap();

        let fail = service
            .submit(
                user,
                &Submission {
                    assessment_id: assessment.id(),
                    answers: Vec::new(),
                },
            )
            .await
            .unwrap();
        assert_eq!(fail.score.score, 0);
        assert!(fail.completion.is_none());

        let answers = assessment
            .questions()
            .iter()
            .map(|q| Selection {
                question_id: q.id,
                answer_id: q.correct_answer().unwrap(),
            })
            .collect();
        let pass = service
            .submit(
                user,
                &Submission {
                    assessment_id: assessment.id(),
                    answers,
                },
            )
            .await
            .unwrap();
        assert!(pass.score.passed);
        let completion = pass.completion.unwrap();
        assert_eq!(completion.progress.status(), CompletionStatus::Completed);
        assert_eq!(completion.progress.points_earned(), 50);

        let attempts = service.attempts(user).await.unwrap();
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].passed);
    }
}
