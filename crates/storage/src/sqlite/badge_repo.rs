use aware_core::model::{AwardOutcome, Badge, BadgeId, ModuleId, UserBadge, UserId};
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db, id_to_i64, map_badge_row, ser};
use crate::repository::{BadgeRepository, NewBadgeRecord, StorageError};

#[async_trait::async_trait]
impl BadgeRepository for SqliteRepository {
    async fn insert_badge(&self, badge: NewBadgeRecord) -> Result<Badge, StorageError> {
        let module_id = badge
            .module_id
            .map(|m| id_to_i64("module_id", m.value()))
            .transpose()?;

        let res = sqlx::query(
            r"
            INSERT INTO badges (name, description, image_url, module_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(badge.name.trim())
        .bind(&badge.description)
        .bind(&badge.image_url)
        .bind(module_id)
        .bind(badge.created_at)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        let id = BadgeId::new(
            u64::try_from(res.last_insert_rowid())
                .map_err(|_| StorageError::Serialization("id sign overflow".into()))?,
        );
        Badge::new(
            id,
            badge.name,
            badge.description,
            badge.image_url,
            badge.module_id,
            badge.created_at,
        )
        .map_err(ser)
    }

    async fn get_badge(&self, id: BadgeId) -> Result<Option<Badge>, StorageError> {
        let row = sqlx::query(
            "SELECT id, name, description, image_url, module_id, created_at FROM badges WHERE id = ?1",
        )
        .bind(id_to_i64("badge_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        row.as_ref().map(map_badge_row).transpose()
    }

    async fn list_badges(&self) -> Result<Vec<Badge>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, name, description, image_url, module_id, created_at FROM badges ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter().map(map_badge_row).collect()
    }

    async fn badges_for_module(&self, module_id: ModuleId) -> Result<Vec<Badge>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, description, image_url, module_id, created_at
            FROM badges
            WHERE module_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("module_id", module_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter().map(map_badge_row).collect()
    }

    async fn award_badge(
        &self,
        user_id: UserId,
        badge_id: BadgeId,
        awarded_at: DateTime<Utc>,
    ) -> Result<AwardOutcome, StorageError> {
        let badge = self.get_badge(badge_id).await?.ok_or(StorageError::NotFound)?;
        let user = id_to_i64("user_id", user_id.value())?;
        let badge_key = id_to_i64("badge_id", badge_id.value())?;

        let existing = sqlx::query("SELECT 1 FROM user_badges WHERE user_id = ?1 AND badge_id = ?2")
            .bind(user)
            .bind(badge_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        if existing.is_some() {
            return Ok(AwardOutcome::AlreadyAwarded);
        }

        // A concurrent award can still slip between the check and the insert;
        // the unique index turns that into a no-op.
        let res = sqlx::query(
            r"
            INSERT INTO user_badges (user_id, badge_id, awarded_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, badge_id) DO NOTHING
            ",
        )
        .bind(user)
        .bind(badge_key)
        .bind(awarded_at)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        if res.rows_affected() == 0 {
            return Ok(AwardOutcome::AlreadyAwarded);
        }
        Ok(AwardOutcome::Awarded(UserBadge {
            user_id,
            badge,
            awarded_at,
        }))
    }

    async fn user_badges(&self, user_id: UserId) -> Result<Vec<UserBadge>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT b.id, b.name, b.description, b.image_url, b.module_id, b.created_at,
                   ub.awarded_at
            FROM user_badges ub
            JOIN badges b ON b.id = ub.badge_id
            WHERE ub.user_id = ?1
            ORDER BY ub.awarded_at ASC, ub.id ASC
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(UserBadge {
                user_id,
                badge: map_badge_row(row)?,
                awarded_at: row.try_get("awarded_at").map_err(ser)?,
            });
        }
        Ok(out)
    }
}
