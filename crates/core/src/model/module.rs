use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::ModuleId;

/// Points credited for completing a module when none are configured.
pub const DEFAULT_MODULE_POINTS: u32 = 100;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleError {
    #[error("module title cannot be empty")]
    EmptyTitle,

    #[error("module must have at least one section")]
    NoSections,

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "BEGINNER",
            Difficulty::Intermediate => "INTERMEDIATE",
            Difficulty::Advanced => "ADVANCED",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BEGINNER" => Ok(Difficulty::Beginner),
            "INTERMEDIATE" => Ok(Difficulty::Intermediate),
            "ADVANCED" => Ok(Difficulty::Advanced),
            _ => Err(ModuleError::UnknownDifficulty(s.to_string())),
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Author-supplied fields of a module, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub order_index: u32,
    #[serde(default = "default_sections")]
    pub section_count: u32,
    #[serde(default = "default_points")]
    pub points: u32,
}

fn default_sections() -> u32 {
    1
}

fn default_points() -> u32 {
    DEFAULT_MODULE_POINTS
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

/// A unit of learning content, optionally gated by an assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningModule {
    id: ModuleId,
    title: String,
    description: String,
    difficulty: Difficulty,
    content: String,
    order_index: u32,
    section_count: u32,
    points: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LearningModule {
    /// Creates a new module from a draft.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError` if the title is blank or there are no sections.
    pub fn new(id: ModuleId, draft: ModuleDraft, now: DateTime<Utc>) -> Result<Self, ModuleError> {
        Self::from_persisted(id, draft, now, now)
    }

    /// Rehydrates a module from storage, applying the same validation as `new`.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError` if persisted values violate module invariants.
    pub fn from_persisted(
        id: ModuleId,
        draft: ModuleDraft,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, ModuleError> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(ModuleError::EmptyTitle);
        }
        if draft.section_count == 0 {
            return Err(ModuleError::NoSections);
        }
        Ok(Self {
            id,
            title,
            description: draft.description.trim().to_string(),
            difficulty: draft.difficulty,
            content: draft.content,
            order_index: draft.order_index,
            section_count: draft.section_count,
            points: draft.points,
            created_at,
            updated_at,
        })
    }

    /// Applies an edited draft, preserving id and creation time.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError` if the draft is invalid; `self` is left untouched.
    pub fn apply_draft(&mut self, draft: ModuleDraft, now: DateTime<Utc>) -> Result<(), ModuleError> {
        *self = Self::from_persisted(self.id, draft, self.created_at, now)?;
        Ok(())
    }

    #[must_use]
    pub fn to_draft(&self) -> ModuleDraft {
        ModuleDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            difficulty: self.difficulty,
            content: self.content.clone(),
            order_index: self.order_index,
            section_count: self.section_count,
            points: self.points,
        }
    }

    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn order_index(&self) -> u32 {
        self.order_index
    }

    #[must_use]
    pub fn section_count(&self) -> u32 {
        self.section_count
    }

    /// Points credited once when a learner completes this module.
    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Catalog order: `order_index`, then id.
pub fn sort_catalog(modules: &mut [LearningModule]) {
    modules.sort_by_key(|m| (m.order_index(), m.id()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft(title: &str, order: u32) -> ModuleDraft {
        ModuleDraft {
            title: title.to_string(),
            description: "desc".into(),
            difficulty: Difficulty::Beginner,
            content: "# Body".into(),
            order_index: order,
            section_count: 3,
            points: DEFAULT_MODULE_POINTS,
        }
    }

    #[test]
    fn rejects_blank_title_and_zero_sections() {
        let err = LearningModule::new(ModuleId::new(1), draft("  ", 0), fixed_now()).unwrap_err();
        assert_eq!(err, ModuleError::EmptyTitle);

        let mut d = draft("Phishing", 0);
        d.section_count = 0;
        let err = LearningModule::new(ModuleId::new(1), d, fixed_now()).unwrap_err();
        assert_eq!(err, ModuleError::NoSections);
    }

    #[test]
    fn apply_draft_keeps_created_at() {
        let created = fixed_now();
        let mut m = LearningModule::new(ModuleId::new(1), draft("Passwords", 1), created).unwrap();
        let later = created + chrono::Duration::hours(2);
        m.apply_draft(draft("Password Hygiene", 1), later).unwrap();
        assert_eq!(m.title(), "Password Hygiene");
        assert_eq!(m.created_at(), created);
        assert_eq!(m.updated_at(), later);
    }

    #[test]
    fn catalog_sorts_by_order_then_id() {
        let now = fixed_now();
        let mut mods = vec![
            LearningModule::new(ModuleId::new(3), draft("C", 2), now).unwrap(),
            LearningModule::new(ModuleId::new(2), draft("B", 1), now).unwrap(),
            LearningModule::new(ModuleId::new(1), draft("A", 2), now).unwrap(),
        ];
        sort_catalog(&mut mods);
        let ids: Vec<u64> = mods.iter().map(|m| m.id().value()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("advanced".parse::<Difficulty>().unwrap(), Difficulty::Advanced);
        assert!("expert".parse::<Difficulty>().is_err());
    }
}
