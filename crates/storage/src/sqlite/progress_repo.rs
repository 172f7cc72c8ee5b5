use aware_core::leaderboard::PointsTotal;
use aware_core::model::{ModuleId, ModuleProgress, UserId};

use super::SqliteRepository;
use super::mapping::{db, get_u32, get_u64, id_to_i64, map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Option<ModuleProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, module_id, status, progress_percentage, completed_sections,
                   points_earned, started_at, completed_at, last_accessed_at
            FROM user_progress
            WHERE user_id = ?1 AND module_id = ?2
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .bind(id_to_i64("module_id", module_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn upsert_progress(&self, progress: &ModuleProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO user_progress (
                user_id, module_id, status, progress_percentage, completed_sections,
                points_earned, started_at, completed_at, last_accessed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(user_id, module_id) DO UPDATE SET
                status = excluded.status,
                progress_percentage = excluded.progress_percentage,
                completed_sections = excluded.completed_sections,
                points_earned = excluded.points_earned,
                started_at = excluded.started_at,
                completed_at = excluded.completed_at,
                last_accessed_at = excluded.last_accessed_at
            ",
        )
        .bind(id_to_i64("user_id", progress.user_id().value())?)
        .bind(id_to_i64("module_id", progress.module_id().value())?)
        .bind(progress.status().as_str())
        .bind(i64::from(progress.progress_percentage()))
        .bind(i64::from(progress.completed_sections()))
        .bind(i64::from(progress.points_earned()))
        .bind(progress.started_at())
        .bind(progress.completed_at())
        .bind(progress.last_accessed_at())
        .execute(&self.pool)
        .await
        .map_err(db)?;

        Ok(())
    }

    async fn list_user_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ModuleProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, module_id, status, progress_percentage, completed_sections,
                   points_earned, started_at, completed_at, last_accessed_at
            FROM user_progress
            WHERE user_id = ?1
            ORDER BY module_id ASC
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn points_totals(&self, limit: u32) -> Result<Vec<PointsTotal>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                user_id,
                CAST(SUM(points_earned) AS INTEGER) AS total_points,
                CAST(SUM(CASE WHEN status = 'COMPLETED' THEN 1 ELSE 0 END) AS INTEGER) AS modules_completed
            FROM user_progress
            GROUP BY user_id
            ORDER BY total_points DESC, user_id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(PointsTotal {
                user_id: UserId::new(get_u64(row, "user_id")?),
                total_points: get_u64(row, "total_points")?,
                modules_completed: get_u32(row, "modules_completed")?,
            });
        }
        Ok(out)
    }
}
