use aware_core::model::{ActivitySubmission, ModuleId, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db, get_u32, get_u64, id_to_i64, ser};
use crate::repository::{ActivityRepository, StorageError};

#[async_trait::async_trait]
impl ActivityRepository for SqliteRepository {
    async fn append_activity(&self, submission: &ActivitySubmission) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO activity_submissions (user_id, module_id, activity_key, score, points, submitted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_to_i64("user_id", submission.user_id.value())?)
        .bind(id_to_i64("module_id", submission.module_id.value())?)
        .bind(submission.activity_key.as_str())
        .bind(i64::from(submission.score))
        .bind(i64::from(submission.points))
        .bind(submission.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        Ok(res.last_insert_rowid())
    }

    async fn list_activities(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ActivitySubmission>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, module_id, activity_key, score, points, submitted_at
            FROM activity_submissions
            WHERE user_id = ?1
            ORDER BY submitted_at DESC, id DESC
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(ActivitySubmission {
                id: Some(row.try_get("id").map_err(ser)?),
                user_id: UserId::new(get_u64(row, "user_id")?),
                module_id: ModuleId::new(get_u64(row, "module_id")?),
                activity_key: row.try_get("activity_key").map_err(ser)?,
                score: get_u32(row, "score")?,
                points: get_u32(row, "points")?,
                submitted_at: row.try_get("submitted_at").map_err(ser)?,
            });
        }
        Ok(out)
    }
}
