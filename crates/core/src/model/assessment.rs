use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{AnswerId, AssessmentId, ModuleId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("assessment title cannot be empty")]
    EmptyTitle,

    #[error("assessment must have at least one question")]
    NoQuestions,

    #[error("passing score must be between 0 and 100, got {0}")]
    InvalidPassingScore(u32),

    #[error("question {0} text cannot be empty")]
    EmptyQuestion(QuestionId),

    #[error("question {0} needs at least two answers")]
    TooFewAnswers(QuestionId),

    #[error("question {0} must have exactly one correct answer")]
    CorrectAnswerCount(QuestionId),

    #[error("duplicate question id {0}")]
    DuplicateQuestion(QuestionId),

    #[error("duplicate answer id {0}")]
    DuplicateAnswer(AnswerId),
}

//
// ─── QUESTION BANK ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub answers: Vec<Answer>,
    pub explanation: Option<String>,
}

impl Question {
    /// The single answer marked correct; validated at assessment construction.
    #[must_use]
    pub fn correct_answer(&self) -> Option<AnswerId> {
        self.answers.iter().find(|a| a.is_correct).map(|a| a.id)
    }
}

/// A scored quiz attached to a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    id: AssessmentId,
    module_id: ModuleId,
    title: String,
    passing_score: u32,
    time_limit_secs: Option<u32>,
    questions: Vec<Question>,
}

impl Assessment {
    /// Builds a validated assessment. Question order is preserved.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError` if the question bank is malformed or the
    /// passing score is out of range.
    pub fn new(
        id: AssessmentId,
        module_id: ModuleId,
        title: impl Into<String>,
        passing_score: u32,
        time_limit_secs: Option<u32>,
        questions: Vec<Question>,
    ) -> Result<Self, AssessmentError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(AssessmentError::EmptyTitle);
        }
        if passing_score > 100 {
            return Err(AssessmentError::InvalidPassingScore(passing_score));
        }
        if questions.is_empty() {
            return Err(AssessmentError::NoQuestions);
        }

        let mut question_ids = HashSet::new();
        let mut answer_ids = HashSet::new();
        for q in &questions {
            if !question_ids.insert(q.id) {
                return Err(AssessmentError::DuplicateQuestion(q.id));
            }
            if q.text.trim().is_empty() {
                return Err(AssessmentError::EmptyQuestion(q.id));
            }
            if q.answers.len() < 2 {
                return Err(AssessmentError::TooFewAnswers(q.id));
            }
            if q.answers.iter().filter(|a| a.is_correct).count() != 1 {
                return Err(AssessmentError::CorrectAnswerCount(q.id));
            }
            for a in &q.answers {
                if !answer_ids.insert(a.id) {
                    return Err(AssessmentError::DuplicateAnswer(a.id));
                }
            }
        }

        Ok(Self {
            id,
            module_id,
            title,
            passing_score,
            time_limit_secs: time_limit_secs.filter(|s| *s > 0),
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> AssessmentId {
        self.id
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Minimum integer percentage required to pass.
    #[must_use]
    pub fn passing_score(&self) -> u32 {
        self.passing_score
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Learner-facing view with the answer key and explanations removed.
    #[must_use]
    pub fn public_view(&self) -> PublicAssessment {
        PublicAssessment {
            id: self.id,
            module_id: self.module_id,
            title: self.title.clone(),
            passing_score: self.passing_score,
            time_limit_secs: self.time_limit_secs,
            questions: self
                .questions
                .iter()
                .map(|q| PublicQuestion {
                    id: q.id,
                    text: q.text.clone(),
                    answers: q
                        .answers
                        .iter()
                        .map(|a| PublicAnswer {
                            id: a.id,
                            text: a.text.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Grades a set of selections against this assessment's answer key.
    ///
    /// Unanswered questions count as wrong, which is how a timed-out quiz
    /// is auto-submitted. Selections for unknown questions are ignored and
    /// only the first selection per question counts.
    #[must_use]
    pub fn score(&self, selections: &[Selection]) -> AssessmentScore {
        let mut seen = HashSet::new();
        let mut first_pick = Vec::with_capacity(selections.len());
        for s in selections {
            if seen.insert(s.question_id) {
                first_pick.push(*s);
            }
        }

        let outcomes: Vec<QuestionOutcome> = self
            .questions
            .iter()
            .map(|q| {
                let selected = first_pick
                    .iter()
                    .find(|s| s.question_id == q.id)
                    .map(|s| s.answer_id);
                let correct_answer = q.correct_answer();
                QuestionOutcome {
                    question_id: q.id,
                    selected_answer_id: selected,
                    correct_answer_id: correct_answer,
                    is_correct: selected.is_some() && selected == correct_answer,
                    explanation: q.explanation.clone(),
                }
            })
            .collect();

        let total = u32::try_from(outcomes.len()).unwrap_or(u32::MAX);
        let correct = u32::try_from(outcomes.iter().filter(|o| o.is_correct).count())
            .unwrap_or(u32::MAX);
        let score = percentage(correct, total);

        AssessmentScore {
            correct,
            total,
            score,
            passing_score: self.passing_score,
            passed: score >= self.passing_score,
            outcomes,
        }
    }
}

/// `round(100 * part / whole)` with halves rounding up; `0` when `whole` is zero.
#[must_use]
pub fn percentage(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let part = u64::from(part.min(whole));
    let whole = u64::from(whole);
    let rounded = (200 * part + whole) / (2 * whole);
    u32::try_from(rounded).unwrap_or(100)
}

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerDraft {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    #[serde(default)]
    pub explanation: Option<String>,
    pub answers: Vec<AnswerDraft>,
}

/// Author input for a new assessment. Storage assigns all ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentDraft {
    pub module_id: ModuleId,
    pub title: String,
    pub passing_score: u32,
    #[serde(default)]
    pub time_limit_secs: Option<u32>,
    pub questions: Vec<QuestionDraft>,
}

impl AssessmentDraft {
    /// Builds the assessment, numbering questions and answers sequentially
    /// from the given starting ids.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError` if the draft violates assessment invariants.
    pub fn build(
        self,
        id: AssessmentId,
        first_question_id: u64,
        first_answer_id: u64,
    ) -> Result<Assessment, AssessmentError> {
        let mut next_answer = first_answer_id;
        let questions = self
            .questions
            .into_iter()
            .zip(first_question_id..)
            .map(|(q, qid)| Question {
                id: QuestionId::new(qid),
                text: q.text.trim().to_string(),
                explanation: q.explanation.filter(|e| !e.trim().is_empty()),
                answers: q
                    .answers
                    .into_iter()
                    .map(|a| {
                        let answer = Answer {
                            id: AnswerId::new(next_answer),
                            text: a.text,
                            is_correct: a.is_correct,
                        };
                        next_answer += 1;
                        answer
                    })
                    .collect(),
            })
            .collect();
        Assessment::new(
            id,
            self.module_id,
            self.title,
            self.passing_score,
            self.time_limit_secs,
            questions,
        )
    }

    /// Checks the draft without keeping the result.
    ///
    /// # Errors
    ///
    /// Returns the first `AssessmentError` found.
    pub fn validate(&self) -> Result<(), AssessmentError> {
        self.clone().build(AssessmentId::new(0), 1, 1).map(|_| ())
    }

    #[must_use]
    pub fn answer_count(&self) -> usize {
        self.questions.iter().map(|q| q.answers.len()).sum()
    }
}

//
// ─── SUBMISSION / RESULT ───────────────────────────────────────────────────────
//

/// One (question, chosen answer) pair in a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub question_id: QuestionId,
    pub answer_id: AnswerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub selected_answer_id: Option<AnswerId>,
    pub correct_answer_id: Option<AnswerId>,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentScore {
    pub correct: u32,
    pub total: u32,
    /// Integer percentage, 0..=100.
    pub score: u32,
    pub passing_score: u32,
    pub passed: bool,
    pub outcomes: Vec<QuestionOutcome>,
}

//
// ─── PUBLIC VIEW ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAnswer {
    pub id: AnswerId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: QuestionId,
    pub text: String,
    pub answers: Vec<PublicAnswer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAssessment {
    pub id: AssessmentId,
    pub module_id: ModuleId,
    pub title: String,
    pub passing_score: u32,
    pub time_limit_secs: Option<u32>,
    pub questions: Vec<PublicQuestion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u64) -> Question {
        // answers: id*10 (correct), id*10+1, id*10+2
        Question {
            id: QuestionId::new(id),
            text: format!("Question {id}"),
            answers: (0..3)
                .map(|n| Answer {
                    id: AnswerId::new(id * 10 + n),
                    text: format!("Option {n}"),
                    is_correct: n == 0,
                })
                .collect(),
            explanation: None,
        }
    }

    fn five_question_quiz(passing: u32) -> Assessment {
        Assessment::new(
            AssessmentId::new(1),
            ModuleId::new(1),
            "Phishing quiz",
            passing,
            Some(300),
            (1..=5).map(question).collect(),
        )
        .unwrap()
    }

    fn pick(q: u64, a: u64) -> Selection {
        Selection {
            question_id: QuestionId::new(q),
            answer_id: AnswerId::new(a),
        }
    }

    #[test]
    fn four_of_five_scores_eighty_and_passes_at_seventy() {
        let quiz = five_question_quiz(70);
        let picks = vec![pick(1, 10), pick(2, 20), pick(3, 30), pick(4, 40), pick(5, 51)];
        let result = quiz.score(&picks);
        assert_eq!(result.correct, 4);
        assert_eq!(result.total, 5);
        assert_eq!(result.score, 80);
        assert!(result.passed);
        assert!(!result.outcomes[4].is_correct);
    }

    #[test]
    fn pass_is_inclusive_of_threshold() {
        let quiz = five_question_quiz(80);
        let picks = vec![pick(1, 10), pick(2, 20), pick(3, 30), pick(4, 40)];
        let result = quiz.score(&picks);
        assert_eq!(result.score, 80);
        assert!(result.passed);

        let quiz = five_question_quiz(81);
        assert!(!quiz.score(&picks).passed);
    }

    #[test]
    fn unanswered_questions_count_as_wrong() {
        let quiz = five_question_quiz(70);
        let result = quiz.score(&[pick(1, 10)]);
        assert_eq!(result.score, 20);
        assert!(!result.passed);
        assert_eq!(result.outcomes[1].selected_answer_id, None);
    }

    #[test]
    fn only_first_selection_per_question_counts() {
        let quiz = five_question_quiz(0);
        let result = quiz.score(&[pick(1, 11), pick(1, 10), pick(99, 990)]);
        assert_eq!(result.correct, 0);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13); // 12.5
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(7, 7), 100);
    }

    #[test]
    fn rejects_question_without_single_correct_answer() {
        let mut q = question(1);
        q.answers[1].is_correct = true;
        let err = Assessment::new(AssessmentId::new(1), ModuleId::new(1), "Q", 70, None, vec![q])
            .unwrap_err();
        assert_eq!(err, AssessmentError::CorrectAnswerCount(QuestionId::new(1)));
    }

    #[test]
    fn rejects_empty_bank_and_bad_threshold() {
        let err = Assessment::new(AssessmentId::new(1), ModuleId::new(1), "Q", 70, None, vec![])
            .unwrap_err();
        assert_eq!(err, AssessmentError::NoQuestions);

        let err = Assessment::new(
            AssessmentId::new(1),
            ModuleId::new(1),
            "Q",
            101,
            None,
            vec![question(1)],
        )
        .unwrap_err();
        assert_eq!(err, AssessmentError::InvalidPassingScore(101));
    }

    #[test]
    fn public_view_hides_answer_key() {
        let quiz = five_question_quiz(70);
        let view = quiz.public_view();
        assert_eq!(view.questions.len(), 5);
        assert_eq!(view.questions[0].answers.len(), 3);
    }

    #[test]
    fn draft_build_numbers_questions_and_answers_sequentially() {
        let draft = AssessmentDraft {
            module_id: ModuleId::new(4),
            title: "Passwords".into(),
            passing_score: 70,
            time_limit_secs: Some(0),
            questions: (0..2)
                .map(|n| QuestionDraft {
                    text: format!("Q{n}"),
                    explanation: Some(" ".into()),
                    answers: vec![
                        AnswerDraft {
                            text: "yes".into(),
                            is_correct: true,
                        },
                        AnswerDraft {
                            text: "no".into(),
                            is_correct: false,
                        },
                    ],
                })
                .collect(),
        };
        assert!(draft.validate().is_ok());
        assert_eq!(draft.answer_count(), 4);

        let built = draft.build(AssessmentId::new(9), 20, 100).unwrap();
        assert_eq!(built.time_limit_secs(), None);
        assert_eq!(built.questions()[1].id, QuestionId::new(21));
        assert_eq!(built.questions()[1].answers[1].id, AnswerId::new(103));
        assert_eq!(built.questions()[0].explanation, None);
    }
}
