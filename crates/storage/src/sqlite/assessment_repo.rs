use std::collections::HashMap;

use aware_core::model::{
    Answer, AnswerId, Assessment, AssessmentDraft, AssessmentId, ModuleId, Question, QuestionId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{db, get_u32, get_u64, id_to_i64, ser};
use crate::repository::{AssessmentRepository, StorageError};

impl SqliteRepository {
    async fn load_assessment(&self, row: &SqliteRow) -> Result<Assessment, StorageError> {
        let id: i64 = row.try_get("id").map_err(ser)?;

        let question_rows = sqlx::query(
            r"
            SELECT id, text, explanation
            FROM questions
            WHERE assessment_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let answer_rows = sqlx::query(
            r"
            SELECT a.id, a.question_id, a.text, a.is_correct
            FROM answers a
            JOIN questions q ON q.id = a.question_id
            WHERE q.assessment_id = ?1
            ORDER BY a.question_id ASC, a.position ASC, a.id ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut answers: HashMap<u64, Vec<Answer>> = HashMap::new();
        for a in &answer_rows {
            answers
                .entry(get_u64(a, "question_id")?)
                .or_default()
                .push(Answer {
                    id: AnswerId::new(get_u64(a, "id")?),
                    text: a.try_get("text").map_err(ser)?,
                    is_correct: a.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
                });
        }

        let mut questions = Vec::with_capacity(question_rows.len());
        for q in &question_rows {
            let qid = get_u64(q, "id")?;
            questions.push(Question {
                id: QuestionId::new(qid),
                text: q.try_get("text").map_err(ser)?,
                explanation: q.try_get("explanation").map_err(ser)?,
                answers: answers.remove(&qid).unwrap_or_default(),
            });
        }

        let time_limit = row
            .try_get::<Option<i64>, _>("time_limit_secs")
            .map_err(ser)?
            .map(|v| {
                u32::try_from(v)
                    .map_err(|_| StorageError::Serialization(format!("invalid time_limit_secs: {v}")))
            })
            .transpose()?;

        Assessment::new(
            AssessmentId::new(get_u64(row, "id")?),
            ModuleId::new(get_u64(row, "module_id")?),
            row.try_get::<String, _>("title").map_err(ser)?,
            get_u32(row, "passing_score")?,
            time_limit,
            questions,
        )
        .map_err(ser)
    }
}

#[async_trait::async_trait]
impl AssessmentRepository for SqliteRepository {
    async fn insert_assessment(&self, draft: AssessmentDraft) -> Result<Assessment, StorageError> {
        draft.validate().map_err(ser)?;

        let mut tx = self.pool.begin().await.map_err(db)?;

        let res = sqlx::query(
            r"
            INSERT INTO assessments (module_id, title, passing_score, time_limit_secs)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(id_to_i64("module_id", draft.module_id.value())?)
        .bind(draft.title.trim())
        .bind(i64::from(draft.passing_score))
        .bind(draft.time_limit_secs.filter(|s| *s > 0).map(i64::from))
        .execute(&mut *tx)
        .await
        .map_err(db)?;
        let assessment_id = res.last_insert_rowid();

        for (q_pos, question) in draft.questions.iter().enumerate() {
            let res = sqlx::query(
                r"
                INSERT INTO questions (assessment_id, position, text, explanation)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(assessment_id)
            .bind(i64::try_from(q_pos).map_err(ser)?)
            .bind(question.text.trim())
            .bind(
                question
                    .explanation
                    .as_deref()
                    .filter(|e| !e.trim().is_empty()),
            )
            .execute(&mut *tx)
            .await
            .map_err(db)?;
            let question_id = res.last_insert_rowid();

            for (a_pos, answer) in question.answers.iter().enumerate() {
                sqlx::query(
                    r"
                    INSERT INTO answers (question_id, position, text, is_correct)
                    VALUES (?1, ?2, ?3, ?4)
                    ",
                )
                .bind(question_id)
                .bind(i64::try_from(a_pos).map_err(ser)?)
                .bind(answer.text.as_str())
                .bind(i64::from(answer.is_correct))
                .execute(&mut *tx)
                .await
                .map_err(db)?;
            }
        }

        tx.commit().await.map_err(db)?;

        let id = AssessmentId::new(
            u64::try_from(assessment_id)
                .map_err(|_| StorageError::Serialization("id sign overflow".into()))?,
        );
        self.get_assessment(id).await?.ok_or(StorageError::NotFound)
    }

    async fn get_assessment(&self, id: AssessmentId) -> Result<Option<Assessment>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, module_id, title, passing_score, time_limit_secs
            FROM assessments WHERE id = ?1
            ",
        )
        .bind(id_to_i64("assessment_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        match row {
            Some(row) => self.load_assessment(&row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn assessment_for_module(
        &self,
        module_id: ModuleId,
    ) -> Result<Option<Assessment>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, module_id, title, passing_score, time_limit_secs
            FROM assessments WHERE module_id = ?1
            ",
        )
        .bind(id_to_i64("module_id", module_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        match row {
            Some(row) => self.load_assessment(&row).await.map(Some),
            None => Ok(None),
        }
    }
}
