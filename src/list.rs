//! Task lists and view filters.
//!
//! Lists group tasks the way folders group files. A list may be *synced*: it
//! mirrors an external, remote task list and carries that list's remote
//! identifier. Synced lists come with their own hierarchy rules (one level of
//! nesting only, flat rendering), which the subtask section enforces.

use serde::{Deserialize, Serialize};

/// A task list, local or synced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskList {
    /// Storage name, lowercase with underscores.
    pub name: String,
    pub display_name: String,
    /// Remote identifier when this list mirrors an external synced list.
    #[serde(default)]
    pub remote_id: Option<String>,
}

impl TaskList {
    /// Create a local list from a display name.
    pub fn new(display_name: &str) -> Self {
        TaskList {
            name: sanitize_list_name(display_name),
            display_name: display_name.trim().to_string(),
            remote_id: None,
        }
    }

    /// Create a synced list mirroring the remote list `remote_id`.
    pub fn synced(display_name: &str, remote_id: &str) -> Self {
        TaskList {
            remote_id: Some(remote_id.to_string()),
            ..TaskList::new(display_name)
        }
    }

    pub fn is_synced(&self) -> bool {
        self.remote_id.is_some()
    }
}

/// The grouping a view was opened from.
///
/// The edit screen remembers the filter it was entered through; the subtask
/// section uses it to decide indentation and nesting rules.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every task, regardless of list.
    All,
    /// Tasks belonging to the named local list.
    List { name: String },
    /// Tasks belonging to the synced list with this remote identifier.
    Synced { remote_id: String },
    /// Tasks carrying the given tag.
    Tag { tag: String },
}

impl Filter {
    /// Build the filter for a list, synced or local.
    pub fn for_list(list: &TaskList) -> Self {
        match &list.remote_id {
            Some(remote_id) => Filter::Synced {
                remote_id: remote_id.clone(),
            },
            None => Filter::List {
                name: list.name.clone(),
            },
        }
    }

    /// Human-readable name for headers and status lines.
    pub fn display_name(&self, lists: &[TaskList]) -> String {
        match self {
            Filter::All => "All Tasks".to_string(),
            Filter::List { name } => lists
                .iter()
                .find(|l| &l.name == name)
                .map(|l| l.display_name.clone())
                .unwrap_or_else(|| name.clone()),
            Filter::Synced { remote_id } => lists
                .iter()
                .find(|l| l.remote_id.as_deref() == Some(remote_id))
                .map(|l| format!("{} (synced)", l.display_name))
                .unwrap_or_else(|| format!("Synced list {}", remote_id)),
            Filter::Tag { tag } => format!("#{}", tag),
        }
    }

    /// Whether a task falls inside this grouping.
    pub fn matches(&self, task: &crate::task::Task, lists: &[TaskList]) -> bool {
        match self {
            Filter::All => true,
            Filter::List { name } => task.list.as_deref() == Some(name.as_str()),
            Filter::Synced { remote_id } => lists
                .iter()
                .find(|l| l.remote_id.as_deref() == Some(remote_id))
                .map_or(false, |l| task.list.as_deref() == Some(l.name.as_str())),
            Filter::Tag { tag } => task.tags.iter().any(|t| t == tag),
        }
    }
}

/// Convert a display name to a safe storage name.
/// Converts to lowercase and replaces runs of other characters with underscores.
pub fn sanitize_list_name(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_list_name() {
        assert_eq!(sanitize_list_name("Groceries"), "groceries");
        assert_eq!(sanitize_list_name("Home Errands"), "home_errands");
        assert_eq!(sanitize_list_name("Work-2026_Q1"), "work_2026_q1");
        assert_eq!(sanitize_list_name("  Multiple   Spaces  "), "multiple_spaces");
        assert_eq!(sanitize_list_name(""), "");
    }

    #[test]
    fn filter_for_list_prefers_remote_identity() {
        let local = TaskList::new("Groceries");
        let synced = TaskList::synced("Chores", "remote-123");
        assert_eq!(
            Filter::for_list(&local),
            Filter::List {
                name: "groceries".into()
            }
        );
        assert_eq!(
            Filter::for_list(&synced),
            Filter::Synced {
                remote_id: "remote-123".into()
            }
        );
        assert!(synced.is_synced());
        assert!(!local.is_synced());
    }
}
