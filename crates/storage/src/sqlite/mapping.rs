use aware_core::model::{
    Badge, BadgeId, Difficulty, LearningModule, ModuleDraft, ModuleId, ModuleProgress, Profile,
    User, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Query failures; unique-constraint violations become `Conflict` and
/// foreign-key violations `NotFound`.
pub(crate) fn db(e: sqlx::Error) -> StorageError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db_err.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn get_u64(row: &SqliteRow, field: &'static str) -> Result<u64, StorageError> {
    u64_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
}

pub(crate) fn get_u32(row: &SqliteRow, field: &'static str) -> Result<u32, StorageError> {
    u32_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let role: String = row.try_get("role").map_err(ser)?;
    let profile = Profile {
        first_name: row.try_get("first_name").map_err(ser)?,
        last_name: row.try_get("last_name").map_err(ser)?,
        bio: row.try_get("bio").map_err(ser)?,
        avatar_url: row.try_get("avatar_url").map_err(ser)?,
    };
    User::new(
        UserId::new(get_u64(row, "id")?),
        row.try_get::<String, _>("username").map_err(ser)?,
        row.try_get::<String, _>("email").map_err(ser)?,
        role.parse().map_err(ser)?,
        profile,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_module_row(row: &SqliteRow) -> Result<LearningModule, StorageError> {
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    let draft = ModuleDraft {
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        difficulty: difficulty.parse::<Difficulty>().map_err(ser)?,
        content: row.try_get("content").map_err(ser)?,
        order_index: get_u32(row, "order_index")?,
        section_count: get_u32(row, "section_count")?,
        points: get_u32(row, "points")?,
    };
    LearningModule::from_persisted(
        ModuleId::new(get_u64(row, "id")?),
        draft,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ModuleProgress, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    ModuleProgress::from_persisted(
        UserId::new(get_u64(row, "user_id")?),
        ModuleId::new(get_u64(row, "module_id")?),
        status.parse().map_err(ser)?,
        get_u32(row, "progress_percentage")?,
        get_u32(row, "completed_sections")?,
        get_u32(row, "points_earned")?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        row.try_get("last_accessed_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_badge_row(row: &SqliteRow) -> Result<Badge, StorageError> {
    let module_id = row
        .try_get::<Option<i64>, _>("module_id")
        .map_err(ser)?
        .map(|v| u64_from_i64("module_id", v).map(ModuleId::new))
        .transpose()?;
    Badge::new(
        BadgeId::new(get_u64(row, "id")?),
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<String, _>("description").map_err(ser)?,
        row.try_get("image_url").map_err(ser)?,
        module_id,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}
