//! Database operations and utility functions for task management.
//!
//! This module provides the `Database` struct storing tasks and lists, along
//! with utility functions for date parsing, formatting, identifier resolution
//! and hierarchical queries. The `subtask_views` query produces the read-only
//! snapshots the subtask section of the edit screen is built from.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::fields::Priority;
use crate::list::TaskList;
use crate::task::Task;

/// In-memory database holding every task and list.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub lists: Vec<TaskList>,
}

impl Database {
    /// Load database from JSON file, creating a new empty database if file doesn't exist.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Database::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(db) => db,
                Err(e) => {
                    eprintln!("Error parsing DB, starting fresh: {e}");
                    Database::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading DB, starting fresh: {e}");
                Database::default()
            }
        }
    }

    /// Save database to JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self).unwrap();
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Generate the next available task ID.
    pub fn next_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable reference to a task by ID.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Remove tasks by IDs and clean up any parent references pointing to removed tasks.
    pub fn remove_ids(&mut self, ids: &HashSet<u64>) {
        self.tasks.retain(|t| !ids.contains(&t.id));
        for t in self.tasks.iter_mut() {
            if let Some(p) = t.parent {
                if ids.contains(&p) {
                    t.parent = None;
                }
            }
        }
    }

    /// Look up a list by storage name.
    pub fn find_list(&self, name: &str) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.name == name)
    }

    /// Look up a synced list by its remote identifier.
    pub fn find_list_by_remote(&self, remote_id: &str) -> Option<&TaskList> {
        self.lists
            .iter()
            .find(|l| l.remote_id.as_deref() == Some(remote_id))
    }
}

/// Read-only snapshot of a stored subtask, as supplied to the subtask section.
///
/// `indent` is the depth relative to the task being edited, starting at 0 for
/// its direct children.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtaskView {
    pub id: u64,
    pub title: String,
    pub completed: bool,
    pub priority: Option<Priority>,
    pub indent: usize,
    pub hidden: bool,
    pub collapsed: bool,
    pub has_children: bool,
}

/// Collect the visible subtask subtree of `parent_id`, depth first.
///
/// Children of collapsed nodes are skipped; the collapsed node itself is still
/// listed so its fold chip can be toggled back open. Siblings order by ID.
pub fn subtask_views(db: &Database, parent_id: u64, today: NaiveDate) -> Vec<SubtaskView> {
    let child_map = build_children_map(&db.tasks);
    let mut out = Vec::new();
    let mut stack: Vec<(u64, usize)> = child_map
        .get(&parent_id)
        .map(|children| children.iter().rev().map(|&c| (c, 0)).collect())
        .unwrap_or_default();
    while let Some((id, depth)) = stack.pop() {
        let Some(task) = db.get(id) else { continue };
        let children = child_map.get(&id);
        out.push(SubtaskView {
            id,
            title: task.title.clone(),
            completed: task.completed,
            priority: task.priority,
            indent: depth,
            hidden: task.is_hidden(today),
            collapsed: task.collapsed,
            has_children: children.map_or(false, |c| !c.is_empty()),
        });
        if !task.collapsed {
            if let Some(children) = children {
                for &c in children.iter().rev() {
                    stack.push((c, depth + 1));
                }
            }
        }
    }
    out
}

/// Normalize a tag string by trimming, lowercasing, and replacing spaces with hyphens.
pub fn normalise_tag(s: &str) -> String {
    s.trim().to_lowercase().replace(' ', "-")
}

/// Split comma-separated tag strings and normalize each tag.
pub fn split_and_normalise_tags(inputs: &[String]) -> Vec<String> {
    let mut tags = Vec::new();
    for raw in inputs {
        for part in raw.split(',') {
            let tag = normalise_tag(part);
            if !tag.is_empty() {
                tags.push(tag);
            }
        }
    }
    tags.sort();
    tags.dedup();
    tags
}

/// Parse human-readable due date input.
///
/// Supports "today", "tomorrow", "yesterday", bare weekday names, "next
/// <weekday>", "in Nd" / "in Nw", and the ISO "YYYY-MM-DD" format.
pub fn parse_due_input(s: &str) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    let today = Local::now().date_naive();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
    }

    let weekdays = [
        ("monday", 0),
        ("tuesday", 1),
        ("wednesday", 2),
        ("thursday", 3),
        ("friday", 4),
        ("saturday", 5),
        ("sunday", 6),
    ];
    for (day_name, target_day) in weekdays {
        let current_day = today.weekday().num_days_from_monday() as i32;
        if s == day_name {
            let days_ahead = (target_day + 7 - current_day) % 7;
            return Some(today + Duration::days(days_ahead as i64));
        }
        if s == format!("next {}", day_name) {
            let days_ahead = (target_day + 7 - current_day) % 7;
            let days_to_add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(days_to_add as i64));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Calculate the start and end dates of the current ISO week (Monday to Sunday).
pub fn start_end_of_this_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    let end = start + Duration::days(6);
    (start, end)
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let delta = (d - today).num_days();
            if delta == 0 {
                "today".into()
            } else if delta == 1 {
                "tomorrow".into()
            } else if delta > 1 {
                format!("in {}d", delta)
            } else {
                format!("{}d late", -delta)
            }
        }
    }
}

/// Format a priority for display.
pub fn format_priority(p: Option<Priority>) -> &'static str {
    match p {
        Some(Priority::High) => "High",
        Some(Priority::Medium) => "Medium",
        Some(Priority::Low) => "Low",
        None => "-",
    }
}

/// Build a map of parent task IDs to their children's IDs.
pub fn build_children_map(tasks: &[Task]) -> BTreeMap<u64, Vec<u64>> {
    let mut map: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
    for t in tasks {
        if let Some(p) = t.parent {
            map.entry(p).or_default().push(t.id);
        }
    }
    for v in map.values_mut() {
        v.sort_unstable();
    }
    map
}

/// Recursively collect all descendant task IDs from a root task.
pub fn collect_descendants(root: u64, child_map: &BTreeMap<u64, Vec<u64>>, out: &mut HashSet<u64>) {
    if let Some(children) = child_map.get(&root) {
        for &c in children {
            if out.insert(c) {
                collect_descendants(c, child_map, out);
            }
        }
    }
}

/// Collect all ancestor task IDs by following parent references.
pub fn collect_ancestors(mut id: u64, db: &Database) -> Vec<u64> {
    let mut chain = Vec::new();
    while let Some(t) = db.get(id) {
        if let Some(p) = t.parent {
            if chain.contains(&p) {
                break; // cycle guard
            }
            chain.push(p);
            id = p;
        } else {
            break;
        }
    }
    chain
}

/// Depth of a task below its topmost ancestor (0 for top-level tasks).
pub fn depth_of(id: u64, db: &Database) -> usize {
    collect_ancestors(id, db).len()
}

/// Resolve a task identifier (either ID or title) to a task ID.
/// Returns an error if the title has multiple matches and suggests using ID instead.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    if let Ok(id) = identifier.parse::<u64>() {
        if db.get(id).is_some() {
            return Ok(id);
        } else {
            return Err(format!("Task with ID {} not found", id));
        }
    }

    let matches: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|task| task.title.to_lowercase() == identifier.to_lowercase())
        .collect();

    match matches.len() {
        0 => Err(format!("No task found with title '{}'", identifier)),
        1 => Ok(matches[0].id),
        _ => {
            let mut error_msg = format!("Multiple tasks found with title '{}':\n", identifier);
            for task in matches {
                error_msg.push_str(&format!("  ID {}: {}", task.id, task.title));
                if let Some(ref list) = task.list {
                    error_msg.push_str(&format!(" [list: {}]", list));
                }
                error_msg.push('\n');
            }
            error_msg.push_str("Please use the specific ID instead.");
            Err(error_msg)
        }
    }
}

/// Print tasks in a formatted table with optional tree indentation.
pub fn print_table(tasks: &[&Task], id_to_depth: Option<&HashMap<u64, usize>>) {
    println!(
        "{:<5} {:<5} {:<8} {:<10} {:<14} {}",
        "ID", "Done", "Pri", "Due", "List", "Title [tags]"
    );
    let today = Local::now().date_naive();
    for t in tasks {
        let indent = id_to_depth.and_then(|m| m.get(&t.id).copied()).unwrap_or(0);
        let indent_str = "  ".repeat(indent);
        let tags = if t.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", t.tags.join(","))
        };
        let due = format_due_relative(t.due, today);
        let list = t.list.clone().unwrap_or_else(|| "-".into());
        println!(
            "{:<5} {:<5} {:<8} {:<10} {:<14} {}{}{}",
            t.id,
            if t.completed { "x" } else { " " },
            format_priority(t.priority),
            due,
            truncate(&list, 14),
            indent_str,
            t.title,
            tags
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u64, title: &str, parent: Option<u64>) -> Task {
        Task {
            id,
            title: title.to_string(),
            notes: None,
            tags: Vec::new(),
            list: None,
            due: None,
            hide_until: None,
            parent,
            priority: None,
            completed: false,
            collapsed: false,
            remote: None,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    fn sample_db() -> Database {
        // 1 ── 2 ── 4
        //   └─ 3    └─ 5
        Database {
            tasks: vec![
                task(1, "Parent", None),
                task(2, "First child", Some(1)),
                task(3, "Second child", Some(1)),
                task(4, "Grandchild", Some(2)),
                task(5, "Great-grandchild", Some(4)),
            ],
            lists: Vec::new(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    #[test]
    fn subtask_views_walks_subtree_depth_first() {
        let db = sample_db();
        let views = subtask_views(&db, 1, today());
        let titles: Vec<&str> = views.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(
            titles,
            ["First child", "Grandchild", "Great-grandchild", "Second child"]
        );
        let indents: Vec<usize> = views.iter().map(|v| v.indent).collect();
        assert_eq!(indents, [0, 1, 2, 0]);
        assert!(views[0].has_children);
        assert!(!views[3].has_children);
    }

    #[test]
    fn subtask_views_skips_collapsed_subtrees() {
        let mut db = sample_db();
        db.get_mut(2).unwrap().collapsed = true;
        let views = subtask_views(&db, 1, today());
        let titles: Vec<&str> = views.iter().map(|v| v.title.as_str()).collect();
        // The collapsed node stays visible; its descendants do not.
        assert_eq!(titles, ["First child", "Second child"]);
        assert!(views[0].collapsed);
    }

    #[test]
    fn subtask_views_flags_hidden_tasks() {
        let mut db = sample_db();
        db.get_mut(3).unwrap().hide_until = Some(today() + Duration::days(2));
        let views = subtask_views(&db, 1, today());
        assert!(!views.iter().find(|v| v.id == 2).unwrap().hidden);
        assert!(views.iter().find(|v| v.id == 3).unwrap().hidden);
    }

    #[test]
    fn subtask_views_empty_for_leaf() {
        let db = sample_db();
        assert!(subtask_views(&db, 5, today()).is_empty());
    }

    #[test]
    fn remove_ids_clears_dangling_parents() {
        let mut db = sample_db();
        let ids: HashSet<u64> = [2].into_iter().collect();
        db.remove_ids(&ids);
        assert!(db.get(2).is_none());
        assert_eq!(db.get(4).unwrap().parent, None);
        assert_eq!(db.get(3).unwrap().parent, Some(1));
    }

    #[test]
    fn resolve_by_id_and_title() {
        let db = sample_db();
        assert_eq!(resolve_task_identifier("3", &db), Ok(3));
        assert_eq!(resolve_task_identifier("second child", &db), Ok(3));
        assert!(resolve_task_identifier("99", &db).is_err());
        assert!(resolve_task_identifier("missing", &db).is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let mut db = sample_db();
        db.lists.push(crate::list::TaskList::synced("Chores", "r-1"));
        db.save(&path).unwrap();
        let loaded = Database::load(&path);
        assert_eq!(loaded.tasks.len(), 5);
        assert_eq!(loaded.lists.len(), 1);
        assert_eq!(loaded.find_list_by_remote("r-1").unwrap().name, "chores");
        assert_eq!(loaded.next_id(), 6);
    }

    #[test]
    fn parse_due_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_due_input("today"), Some(today));
        assert_eq!(parse_due_input("tomorrow"), Some(today + Duration::days(1)));
        assert_eq!(parse_due_input("in 3d"), Some(today + Duration::days(3)));
        assert_eq!(parse_due_input("in 2w"), Some(today + Duration::weeks(2)));
        assert_eq!(
            parse_due_input("2026-04-01"),
            NaiveDate::from_ymd_opt(2026, 4, 1)
        );
        assert_eq!(parse_due_input("not a date"), None);
    }
}
