use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::assessment::percentage;
use crate::model::ids::{ModuleId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("unknown completion status: {0}")]
    UnknownStatus(String),

    #[error("progress percentage must be <= 100, got {0}")]
    InvalidPercentage(u32),

    #[error("completed progress must be at 100%")]
    IncompleteCompletion,
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Per-user, per-module completion state. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl CompletionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionStatus::NotStarted => "NOT_STARTED",
            CompletionStatus::InProgress => "IN_PROGRESS",
            CompletionStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompletionStatus {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_STARTED" => Ok(CompletionStatus::NotStarted),
            "IN_PROGRESS" => Ok(CompletionStatus::InProgress),
            "COMPLETED" => Ok(CompletionStatus::Completed),
            other => Err(ProgressError::UnknownStatus(other.to_string())),
        }
    }
}

/// What a state-machine call changed; services use it to decide follow-up
/// work such as badge awards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Started,
    Advanced,
    Completed,
}

//
// ─── MODULE PROGRESS ───────────────────────────────────────────────────────────
//

/// Progress of one user through one module. Exactly one exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleProgress {
    user_id: UserId,
    module_id: ModuleId,
    status: CompletionStatus,
    progress_percentage: u32,
    completed_sections: u32,
    points_earned: u32,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    last_accessed_at: DateTime<Utc>,
}

impl ModuleProgress {
    /// A fresh, not-yet-started row, as created on first access.
    #[must_use]
    pub fn new(user_id: UserId, module_id: ModuleId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            module_id,
            status: CompletionStatus::NotStarted,
            progress_percentage: 0,
            completed_sections: 0,
            points_earned: 0,
            started_at: None,
            completed_at: None,
            last_accessed_at: now,
        }
    }

    /// Rehydrates a row from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the stored percentage is out of range or a
    /// completed row is not at 100%.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        module_id: ModuleId,
        status: CompletionStatus,
        progress_percentage: u32,
        completed_sections: u32,
        points_earned: u32,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
        last_accessed_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if progress_percentage > 100 {
            return Err(ProgressError::InvalidPercentage(progress_percentage));
        }
        if status == CompletionStatus::Completed && progress_percentage != 100 {
            return Err(ProgressError::IncompleteCompletion);
        }
        Ok(Self {
            user_id,
            module_id,
            status,
            progress_percentage,
            completed_sections,
            points_earned,
            started_at,
            completed_at,
            last_accessed_at,
        })
    }

    /// NOT_STARTED -> IN_PROGRESS. Any other state only records the access.
    pub fn start(&mut self, now: DateTime<Utc>) -> Transition {
        self.last_accessed_at = now;
        if self.status == CompletionStatus::NotStarted {
            self.status = CompletionStatus::InProgress;
            self.started_at = Some(now);
            Transition::Started
        } else {
            Transition::Unchanged
        }
    }

    /// Records that `completed` of `total` sections are done.
    ///
    /// The section count never decreases. Finishing every section completes
    /// the module and credits `module_points`.
    pub fn record_sections(
        &mut self,
        completed: u32,
        total: u32,
        module_points: u32,
        now: DateTime<Utc>,
    ) -> Transition {
        if self.status == CompletionStatus::Completed {
            self.last_accessed_at = now;
            return Transition::Unchanged;
        }
        let started = self.start(now) == Transition::Started;

        let total = total.max(1);
        let completed = completed.min(total);
        if completed >= total {
            return self.complete(module_points, now);
        }
        if completed > self.completed_sections {
            self.completed_sections = completed;
            // 100% is reserved for COMPLETED.
            self.progress_percentage = percentage(completed, total).min(99);
            return Transition::Advanced;
        }
        if started {
            Transition::Started
        } else {
            Transition::Unchanged
        }
    }

    /// Marks the module completed at 100% and credits the module points once.
    /// Calling it again is a no-op.
    pub fn complete(&mut self, module_points: u32, now: DateTime<Utc>) -> Transition {
        self.last_accessed_at = now;
        if self.status == CompletionStatus::Completed {
            return Transition::Unchanged;
        }
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.status = CompletionStatus::Completed;
        self.progress_percentage = 100;
        self.completed_at = Some(now);
        self.points_earned = self.points_earned.saturating_add(module_points);
        Transition::Completed
    }

    /// Credits activity points; an untouched module becomes IN_PROGRESS.
    pub fn add_points(&mut self, points: u32, now: DateTime<Utc>) -> Transition {
        let transition = self.start(now);
        self.points_earned = self.points_earned.saturating_add(points);
        transition
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed_at = now;
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn status(&self) -> CompletionStatus {
        self.status
    }

    #[must_use]
    pub fn progress_percentage(&self) -> u32 {
        self.progress_percentage
    }

    #[must_use]
    pub fn completed_sections(&self) -> u32 {
        self.completed_sections
    }

    #[must_use]
    pub fn points_earned(&self) -> u32 {
        self.points_earned
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == CompletionStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn fresh() -> ModuleProgress {
        ModuleProgress::new(UserId::new(1), ModuleId::new(1), fixed_now())
    }

    #[test]
    fn start_moves_not_started_to_in_progress_once() {
        let mut p = fresh();
        assert_eq!(p.start(fixed_now()), Transition::Started);
        assert_eq!(p.status(), CompletionStatus::InProgress);
        let later = fixed_now() + Duration::minutes(5);
        assert_eq!(p.start(later), Transition::Unchanged);
        assert_eq!(p.started_at(), Some(fixed_now()));
        assert_eq!(p.last_accessed_at(), later);
    }

    #[test]
    fn unfinished_sections_never_show_a_full_percentage() {
        let mut p = fresh();
        assert_eq!(p.record_sections(199, 200, 100, fixed_now()), Transition::Advanced);
        assert_eq!(p.status(), CompletionStatus::InProgress);
        assert_eq!(p.progress_percentage(), 99);
        assert_eq!(p.record_sections(200, 200, 100, fixed_now()), Transition::Completed);
        assert_eq!(p.progress_percentage(), 100);
    }

    #[test]
    fn sections_advance_percentage_and_complete_at_the_end() {
        let mut p = fresh();
        assert_eq!(p.record_sections(1, 3, 100, fixed_now()), Transition::Advanced);
        assert_eq!(p.progress_percentage(), 33);
        assert_eq!(p.record_sections(2, 3, 100, fixed_now()), Transition::Advanced);
        assert_eq!(p.progress_percentage(), 67);
        assert_eq!(p.record_sections(3, 3, 100, fixed_now()), Transition::Completed);
        assert!(p.is_completed());
        assert_eq!(p.progress_percentage(), 100);
        assert_eq!(p.points_earned(), 100);
    }

    #[test]
    fn sections_never_go_backwards() {
        let mut p = fresh();
        p.record_sections(2, 4, 100, fixed_now());
        assert_eq!(p.record_sections(1, 4, 100, fixed_now()), Transition::Unchanged);
        assert_eq!(p.completed_sections(), 2);
        assert_eq!(p.progress_percentage(), 50);
    }

    #[test]
    fn complete_is_idempotent_from_any_state() {
        let mut p = fresh();
        assert_eq!(p.complete(100, fixed_now()), Transition::Completed);
        assert_eq!(p.status(), CompletionStatus::Completed);
        assert_eq!(p.progress_percentage(), 100);
        assert!(p.started_at().is_some());

        assert_eq!(p.complete(100, fixed_now()), Transition::Unchanged);
        assert_eq!(p.points_earned(), 100);
        assert_eq!(p.record_sections(0, 3, 100, fixed_now()), Transition::Unchanged);
        assert_eq!(p.progress_percentage(), 100);
    }

    #[test]
    fn activity_points_start_the_module() {
        let mut p = fresh();
        assert_eq!(p.add_points(8, fixed_now()), Transition::Started);
        assert_eq!(p.points_earned(), 8);
        p.complete(100, fixed_now());
        assert_eq!(p.points_earned(), 108);
    }

    #[test]
    fn persisted_completed_rows_must_be_full() {
        let err = ModuleProgress::from_persisted(
            UserId::new(1),
            ModuleId::new(1),
            CompletionStatus::Completed,
            90,
            0,
            0,
            None,
            None,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, ProgressError::IncompleteCompletion);
    }

    #[test]
    fn status_strings_round_trip() {
        for s in [
            CompletionStatus::NotStarted,
            CompletionStatus::InProgress,
            CompletionStatus::Completed,
        ] {
            assert_eq!(s.as_str().parse::<CompletionStatus>().unwrap(), s);
        }
    }
}
