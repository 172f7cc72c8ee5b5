//! Ranking users by the points they earned across modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{ModuleProgress, User, UserId};

/// Per-user point totals, before joining display fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsTotal {
    pub user_id: UserId,
    pub total_points: u64,
    pub modules_completed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub total_points: u64,
    pub modules_completed: u32,
}

/// Sums `points_earned` per user (the `GROUP BY user_id` step).
#[must_use]
pub fn aggregate<'a>(rows: impl IntoIterator<Item = &'a ModuleProgress>) -> Vec<PointsTotal> {
    let mut totals: HashMap<UserId, PointsTotal> = HashMap::new();
    for row in rows {
        let entry = totals.entry(row.user_id()).or_insert(PointsTotal {
            user_id: row.user_id(),
            total_points: 0,
            modules_completed: 0,
        });
        entry.total_points += u64::from(row.points_earned());
        if row.is_completed() {
            entry.modules_completed += 1;
        }
    }
    totals.into_values().collect()
}

/// Orders totals by points descending, ties by ascending user id, and keeps
/// the first `limit`.
pub fn order_totals(totals: &mut Vec<PointsTotal>, limit: usize) {
    totals.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then(a.user_id.cmp(&b.user_id))
    });
    totals.truncate(limit);
}

/// Joins ordered totals with user display fields and assigns 1-based ranks.
/// Totals whose user is missing are skipped.
#[must_use]
pub fn rank(totals: &[PointsTotal], users: &HashMap<UserId, User>) -> Vec<LeaderboardEntry> {
    totals
        .iter()
        .filter_map(|t| users.get(&t.user_id).map(|u| (t, u)))
        .enumerate()
        .map(|(i, (t, u))| LeaderboardEntry {
            rank: u32::try_from(i + 1).unwrap_or(u32::MAX),
            user_id: t.user_id,
            username: u.username().to_string(),
            display_name: u.display_name(),
            avatar_url: u.profile().avatar_url.clone(),
            total_points: t.total_points,
            modules_completed: t.modules_completed,
        })
        .collect()
}
