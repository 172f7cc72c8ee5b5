use aware_core::model::{AssessmentAttempt, AssessmentId, AttemptId, ModuleId, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db, get_u32, get_u64, id_to_i64, ser};
use crate::repository::{AttemptRepository, StorageError};

fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AssessmentAttempt, StorageError> {
    Ok(AssessmentAttempt {
        id: Some(AttemptId::new(get_u64(row, "id")?)),
        user_id: UserId::new(get_u64(row, "user_id")?),
        assessment_id: AssessmentId::new(get_u64(row, "assessment_id")?),
        module_id: ModuleId::new(get_u64(row, "module_id")?),
        score: get_u32(row, "score")?,
        correct: get_u32(row, "correct")?,
        total: get_u32(row, "total")?,
        passed: row.try_get::<i64, _>("passed").map_err(ser)? != 0,
        submitted_at: row.try_get("submitted_at").map_err(ser)?,
    })
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &AssessmentAttempt) -> Result<AttemptId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO assessment_attempts (
                user_id, assessment_id, module_id, score, correct, total, passed, submitted_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_to_i64("user_id", attempt.user_id.value())?)
        .bind(id_to_i64("assessment_id", attempt.assessment_id.value())?)
        .bind(id_to_i64("module_id", attempt.module_id.value())?)
        .bind(i64::from(attempt.score))
        .bind(i64::from(attempt.correct))
        .bind(i64::from(attempt.total))
        .bind(i64::from(attempt.passed))
        .bind(attempt.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        u64::try_from(res.last_insert_rowid())
            .map(AttemptId::new)
            .map_err(|_| StorageError::Serialization("id sign overflow".into()))
    }

    async fn list_attempts(&self, user_id: UserId) -> Result<Vec<AssessmentAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, assessment_id, module_id, score, correct, total, passed, submitted_at
            FROM assessment_attempts
            WHERE user_id = ?1
            ORDER BY submitted_at DESC, id DESC
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter().map(map_attempt_row).collect()
    }
}
