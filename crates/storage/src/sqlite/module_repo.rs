use aware_core::model::{LearningModule, ModuleDraft, ModuleId};
use chrono::{DateTime, Utc};

use super::SqliteRepository;
use super::mapping::{db, id_to_i64, map_module_row, ser};
use crate::repository::{ModuleRepository, StorageError};

#[async_trait::async_trait]
impl ModuleRepository for SqliteRepository {
    async fn insert_module(
        &self,
        draft: ModuleDraft,
        now: DateTime<Utc>,
    ) -> Result<LearningModule, StorageError> {
        // Validate before touching the table so bad drafts never get an id.
        let probe = LearningModule::new(ModuleId::new(0), draft, now).map_err(ser)?;

        let res = sqlx::query(
            r"
            INSERT INTO modules (title, description, difficulty, content, order_index, section_count, points, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(probe.title())
        .bind(probe.description())
        .bind(probe.difficulty().as_str())
        .bind(probe.content())
        .bind(i64::from(probe.order_index()))
        .bind(i64::from(probe.section_count()))
        .bind(i64::from(probe.points()))
        .bind(probe.created_at())
        .bind(probe.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db)?;

        let id = ModuleId::new(
            u64::try_from(res.last_insert_rowid())
                .map_err(|_| StorageError::Serialization("id sign overflow".into()))?,
        );
        LearningModule::from_persisted(id, probe.to_draft(), probe.created_at(), probe.updated_at())
            .map_err(ser)
    }

    async fn update_module(&self, module: &LearningModule) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE modules
            SET title = ?2, description = ?3, difficulty = ?4, content = ?5,
                order_index = ?6, section_count = ?7, points = ?8, updated_at = ?9
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("module_id", module.id().value())?)
        .bind(module.title())
        .bind(module.description())
        .bind(module.difficulty().as_str())
        .bind(module.content())
        .bind(i64::from(module.order_index()))
        .bind(i64::from(module.section_count()))
        .bind(i64::from(module.points()))
        .bind(module.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<LearningModule>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, difficulty, content, order_index, section_count, points, created_at, updated_at
            FROM modules WHERE id = ?1
            ",
        )
        .bind(id_to_i64("module_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        row.as_ref().map(map_module_row).transpose()
    }

    async fn list_modules(&self) -> Result<Vec<LearningModule>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, difficulty, content, order_index, section_count, points, created_at, updated_at
            FROM modules
            ORDER BY order_index ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter().map(map_module_row).collect()
    }

    async fn delete_module(&self, id: ModuleId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM modules WHERE id = ?1")
            .bind(id_to_i64("module_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
