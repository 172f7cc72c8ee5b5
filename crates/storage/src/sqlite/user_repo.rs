use aware_core::model::{User, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db, id_to_i64, map_user_row, ser};
use crate::repository::{CredentialRecord, NewUserRecord, StorageError, UserRepository};

const USER_COLUMNS: &str =
    "id, username, email, role, first_name, last_name, bio, avatar_url, created_at";

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(&self, user: NewUserRecord) -> Result<User, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO users (username, email, password_hash, role, first_name, last_name, bio, avatar_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.profile.first_name)
        .bind(&user.profile.last_name)
        .bind(&user.profile.bio)
        .bind(&user.profile.avatar_url)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        let id = UserId::new(
            u64::try_from(res.last_insert_rowid())
                .map_err(|_| StorageError::Serialization("id sign overflow".into()))?,
        );
        User::new(
            id,
            user.username,
            user.email,
            user.role,
            user.profile,
            user.created_at,
        )
        .map_err(ser)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("user_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn find_credentials(
        &self,
        login: &str,
    ) -> Result<Option<CredentialRecord>, StorageError> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?1 OR email = ?1"
        );
        let row = sqlx::query(&sql)
            .bind(login.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        match row {
            Some(row) => Ok(Some(CredentialRecord {
                user: map_user_row(&row)?,
                password_hash: row.try_get("password_hash").map_err(ser)?,
            })),
            None => Ok(None),
        }
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let profile = user.profile();
        let res = sqlx::query(
            r"
            UPDATE users
            SET role = ?2, first_name = ?3, last_name = ?4, bio = ?5, avatar_url = ?6
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("user_id", user.id().value())?)
        .bind(user.role().as_str())
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.bio)
        .bind(&profile.avatar_url)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id IN (");
        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push(')');

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id_to_i64("user_id", id.value())?);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(db)?;
        rows.iter().map(map_user_row).collect()
    }
}
