//! Task data structure and related functionality.
//!
//! This module defines the core `Task` struct representing a single to-do
//! item, including its place in the local subtask hierarchy and its optional
//! linkage into a synced (remote) list.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::Priority;

/// A to-do item.
///
/// Tasks nest arbitrarily deep locally via `parent`. A task linked into a
/// synced list additionally carries a [`RemoteLink`] describing its position
/// in that list's own (single-level) hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Name of the list this task belongs to, if any.
    pub list: Option<String>,
    pub due: Option<NaiveDate>,
    /// The task is hidden from default listings until this date.
    #[serde(default)]
    pub hide_until: Option<NaiveDate>,
    pub parent: Option<u64>,
    pub priority: Option<Priority>,
    #[serde(default)]
    pub completed: bool,
    /// Whether the task's subtask subtree is folded in listings.
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub remote: Option<RemoteLink>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl Task {
    /// A task stays hidden while its hide-until date is in the future.
    pub fn is_hidden(&self, today: NaiveDate) -> bool {
        self.hide_until.map_or(false, |d| d > today)
    }
}

/// A task's linkage into a synced list's own hierarchy.
///
/// `parent > 0` means the task is itself a child row inside the remote list,
/// which restricts further nesting (synced lists support one level only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLink {
    /// Remote identifier of the synced list the task lives in.
    pub list_id: String,
    /// Remote-side parent row, `0` for top-level entries.
    #[serde(default)]
    pub parent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hide_until_in_future_hides_task() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let mut task = Task {
            id: 1,
            title: "Water plants".into(),
            notes: None,
            tags: Vec::new(),
            list: None,
            due: None,
            hide_until: Some(NaiveDate::from_ymd_opt(2026, 3, 12).unwrap()),
            parent: None,
            priority: None,
            completed: false,
            collapsed: false,
            remote: None,
            created_at_utc: 0,
            updated_at_utc: 0,
        };
        assert!(task.is_hidden(today));
        task.hide_until = Some(today);
        assert!(!task.is_hidden(today));
        task.hide_until = None;
        assert!(!task.is_hidden(today));
    }
}
