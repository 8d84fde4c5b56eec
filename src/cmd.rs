//! Command implementations for the CLI interface.
//!
//! This module contains all the command handlers implementing the various
//! subcommands, from basic CRUD operations to hierarchical queries and the
//! TUI entry points.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use chrono::{Local, NaiveDate, Utc};
use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::cli::Cli;
use crate::db::*;
use crate::fields::{DueFilter, Priority, SortKey};
use crate::list::{Filter, TaskList};
use crate::task::Task;
use crate::tui::menu::MenuApp;
use crate::tui::run::run_tui;
use crate::tui::subtasks::{build_rows, ParentContext, SubtaskRow};

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive UI.
    Ui {
        /// Open a specific list instead of all tasks.
        #[arg(long, conflicts_with = "tag")]
        list: Option<String>,
        /// Open the view for a tag instead of all tasks.
        #[arg(long)]
        tag: Option<String>,
        /// Use the muted colour palette.
        #[arg(long)]
        desaturate: bool,
    },

    /// Open the list selection menu (interactive mode).
    Menu {
        /// Use the muted colour palette.
        #[arg(long)]
        desaturate: bool,
    },

    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer notes.
        #[arg(long)]
        notes: Option<String>,
        /// List name.
        #[arg(long)]
        list: Option<String>,
        /// Comma-separated tags. May be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        due: Option<String>,
        /// Hide the task from default listings until this date.
        #[arg(long)]
        hide_until: Option<String>,
        /// Parent task ID or title.
        #[arg(long)]
        parent: Option<String>,
        /// Priority: high | medium | low.
        #[arg(long, value_enum)]
        priority: Option<Priority>,
    },

    /// List tasks with optional filters.
    List {
        /// Include completed and hidden tasks.
        #[arg(long)]
        all: bool,
        /// Filter by list.
        #[arg(long)]
        list: Option<String>,
        /// Filter by tag. May be repeated. Accepts comma-separated.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Due filter: today | this-week | overdue | none.
        #[arg(long, value_enum)]
        due: Option<DueFilter>,
        /// Render as a tree across parent-child relationships.
        #[arg(long)]
        tree: bool,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Due)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task by ID or title.
    View {
        /// Task ID or title to view.
        id: String,
        /// Show child subtree.
        #[arg(long)]
        children: bool,
        /// Show ancestor chain.
        #[arg(long)]
        parents: bool,
    },

    /// Print the subtask rows of a task as its edit screen would show them.
    Subtasks {
        /// Task ID or title.
        id: String,
    },

    /// Update fields on a task.
    Update {
        /// Task ID or title to update.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        list: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        hide_until: Option<String>,
        /// Parent task ID or title.
        #[arg(long)]
        parent: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Add tags. May be repeated and comma-separated.
        #[arg(long = "add-tag")]
        add_tags: Vec<String>,
        /// Remove tags. May be repeated and comma-separated.
        #[arg(long = "rm-tag")]
        rm_tags: Vec<String>,
        /// Clear due date.
        #[arg(long)]
        clear_due: bool,
        /// Clear parent.
        #[arg(long)]
        clear_parent: bool,
    },

    /// Mark a task done.
    Complete {
        /// Task ID or title (mutually exclusive with bulk options).
        id: Option<String>,
        /// Also mark all descendants done.
        #[arg(long)]
        recurse: bool,
        /// Complete all tasks with this tag.
        #[arg(long)]
        tag: Option<String>,
        /// Complete all tasks in this list.
        #[arg(long)]
        list: Option<String>,
    },

    /// Reopen a completed task.
    Reopen {
        /// Task ID or title to reopen.
        id: String,
    },

    /// Delete a task by ID or title.
    Delete {
        /// Task ID or title (mutually exclusive with bulk options).
        id: Option<String>,
        /// Cascade into all descendants.
        #[arg(long)]
        cascade: bool,
        /// Delete all tasks with this tag.
        #[arg(long)]
        tag: Option<String>,
        /// Delete all tasks in this list.
        #[arg(long)]
        list: Option<String>,
    },

    /// Manage task lists.
    Lists {
        #[command(subcommand)]
        action: Option<ListAction>,
    },

    /// List distinct tags and counts.
    Tags,

    /// Export tasks to CSV format.
    Export {
        /// Output file path (default: tasks.csv).
        #[arg(long, short)]
        output: Option<String>,
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
        /// Filter by list.
        #[arg(long)]
        list: Option<String>,
        /// Filter by tag.
        #[arg(long)]
        tag: Option<String>,
    },

    /// Create a timestamped backup of the database file.
    Backup,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ListAction {
    /// Show all lists.
    List,
    /// Create a local list.
    Add {
        /// Display name of the list.
        name: String,
    },
    /// Link a synced list by its remote identifier.
    Link {
        /// Remote identifier of the synced list.
        remote_id: String,
        /// Display name of the list.
        name: String,
    },
    /// Delete a list. Its tasks are kept and moved out of the list.
    Rm {
        /// Name of the list to delete.
        name: String,
    },
}

/// Launch the terminal user interface.
pub fn cmd_ui(db_path: &Path, list: Option<String>, tag: Option<String>, desaturate: bool) {
    let filter = match (list, tag) {
        (Some(name), _) => {
            let db = Database::load(db_path);
            match db.find_list(&crate::list::sanitize_list_name(&name)) {
                Some(l) => Filter::for_list(l),
                None => {
                    eprintln!("List '{}' not found", name);
                    std::process::exit(1);
                }
            }
        }
        (None, Some(tag)) => Filter::Tag {
            tag: normalise_tag(&tag),
        },
        (None, None) => Filter::All,
    };
    if let Err(e) = run_tui(db_path, filter, desaturate) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Open the list selection menu, then the TUI for the chosen list.
pub fn cmd_menu(db_path: &Path, desaturate: bool) {
    enable_raw_mode().unwrap();
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).unwrap();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).unwrap();

    let mut app = MenuApp::new(db_path.to_path_buf()).unwrap();
    let res = app.run(&mut terminal);

    disable_raw_mode().unwrap();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).unwrap();
    terminal.show_cursor().unwrap();

    if let Err(err) = res {
        eprintln!("Menu error: {err}");
        std::process::exit(1);
    }

    if let Some(filter) = app.selected_filter() {
        if let Err(err) = run_tui(db_path, filter.clone(), desaturate) {
            eprintln!("UI error: {err}");
            std::process::exit(1);
        }
    }
}

/// Add a new task to the database.
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    title: String,
    notes: Option<String>,
    list: Option<String>,
    tags: Vec<String>,
    due: Option<String>,
    hide_until: Option<String>,
    parent: Option<String>,
    priority: Option<Priority>,
) {
    let now_utc = Utc::now().timestamp();
    let id = db.next_id();

    let parent_id = match parent {
        Some(parent_str) => match resolve_task_identifier(&parent_str, db) {
            Ok(pid) => Some(pid),
            Err(e) => {
                eprintln!("Error resolving parent: {}", e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let list = list.map(|l| {
        let name = crate::list::sanitize_list_name(&l);
        if db.find_list(&name).is_none() {
            db.lists.push(TaskList::new(&l));
        }
        name
    });

    let task = Task {
        id,
        title,
        notes,
        tags: split_and_normalise_tags(&tags),
        list,
        due: due.as_deref().and_then(parse_due_input),
        hide_until: hide_until.as_deref().and_then(parse_due_input),
        parent: parent_id,
        priority,
        completed: false,
        collapsed: false,
        remote: None,
        created_at_utc: now_utc,
        updated_at_utc: now_utc,
    };
    db.tasks.push(task);
    save_or_exit(db, db_path);
    println!("Added task {}", id);
}

/// List tasks with optional filtering and sorting.
pub fn cmd_list(
    db: &Database,
    all: bool,
    list: Option<String>,
    tags: Vec<String>,
    due: Option<DueFilter>,
    tree: bool,
    sort: SortKey,
    limit: Option<usize>,
) {
    let tags = split_and_normalise_tags(&tags);
    let today = Local::now().date_naive();
    let (week_start, week_end) = start_end_of_this_week(today);
    let list = list.map(|l| crate::list::sanitize_list_name(&l));

    let mut filtered: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|t| {
            if !all && (t.completed || t.is_hidden(today)) {
                return false;
            }
            if let Some(ref l) = list {
                if t.list.as_deref() != Some(l.as_str()) {
                    return false;
                }
            }
            for tg in &tags {
                if !t.tags.contains(tg) {
                    return false;
                }
            }
            if let Some(df) = due {
                match df {
                    DueFilter::Today => {
                        if t.due != Some(today) {
                            return false;
                        }
                    }
                    DueFilter::ThisWeek => match t.due {
                        Some(d) if d >= week_start && d <= week_end => {}
                        _ => return false,
                    },
                    DueFilter::Overdue => match t.due {
                        Some(d) if d < today => {}
                        _ => return false,
                    },
                    DueFilter::None => {
                        if t.due.is_some() {
                            return false;
                        }
                    }
                }
            }
            true
        })
        .collect();

    match sort {
        SortKey::Due => filtered.sort_by_key(|t| (t.due.unwrap_or(NaiveDate::MAX), t.id)),
        SortKey::Priority => filtered.sort_by_key(|t| {
            let rank = match t.priority {
                Some(Priority::High) => 0,
                Some(Priority::Medium) => 1,
                Some(Priority::Low) => 2,
                None => 3,
            };
            (rank, t.due.unwrap_or(NaiveDate::MAX), t.id)
        }),
        SortKey::Id => filtered.sort_by_key(|t| t.id),
    }

    if tree {
        // Reorder depth first below the visible roots, carrying depths along.
        let included: HashSet<u64> = filtered.iter().map(|t| t.id).collect();
        let child_map = build_children_map(&db.tasks);
        let mut depths: HashMap<u64, usize> = HashMap::new();
        let mut ordered: Vec<&Task> = Vec::new();
        let roots: Vec<&Task> = filtered
            .iter()
            .filter(|t| match t.parent {
                Some(p) => !included.contains(&p),
                None => true,
            })
            .copied()
            .collect();
        let mut stack: Vec<(u64, usize)> = roots.iter().rev().map(|t| (t.id, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            let Some(task) = db.get(id) else { continue };
            depths.insert(id, depth);
            ordered.push(task);
            if let Some(children) = child_map.get(&id) {
                for &c in children.iter().rev() {
                    if included.contains(&c) {
                        stack.push((c, depth + 1));
                    }
                }
            }
        }
        if let Some(n) = limit {
            ordered.truncate(n);
        }
        print_table(&ordered, Some(&depths));
    } else {
        if let Some(n) = limit {
            filtered.truncate(n);
        }
        print_table(&filtered, None);
    }
}

/// View a single task with optional subtree and ancestor chain.
pub fn cmd_view(db: &Database, id: String, children: bool, parents: bool) {
    let task_id = resolve_or_exit(&id, db);
    let task = db.get(task_id).unwrap();
    let today = Local::now().date_naive();

    println!("ID:        {}", task.id);
    println!("Title:     {}", task.title);
    println!("Done:      {}", if task.completed { "yes" } else { "no" });
    println!("Priority:  {}", format_priority(task.priority));
    println!("Due:       {}", format_due_relative(task.due, today));
    if let Some(h) = task.hide_until {
        println!("Hidden:    until {}", h);
    }
    println!("List:      {}", task.list.as_deref().unwrap_or("-"));
    if let Some(remote) = &task.remote {
        println!(
            "Synced:    list {}{}",
            remote.list_id,
            if remote.parent > 0 { " (nested)" } else { "" }
        );
    }
    if !task.tags.is_empty() {
        println!("Tags:      {}", task.tags.join(", "));
    }
    if let Some(notes) = &task.notes {
        println!("Notes:     {}", notes);
    }

    if parents {
        let chain = collect_ancestors(task_id, db);
        if chain.is_empty() {
            println!("\nNo ancestors.");
        } else {
            println!("\nAncestors:");
            for (i, aid) in chain.iter().enumerate() {
                if let Some(a) = db.get(*aid) {
                    println!("{}#{} - {}", "  ".repeat(i + 1), a.id, a.title);
                }
            }
        }
    }

    if children {
        let views = subtask_views(db, task_id, today);
        if views.is_empty() {
            println!("\nNo subtasks.");
        } else {
            println!("\nSubtasks:");
            for v in &views {
                println!(
                    "{}[{}] #{} {}",
                    "  ".repeat(v.indent + 1),
                    if v.completed { "x" } else { " " },
                    v.id,
                    v.title
                );
            }
        }
    }
}

/// Print the subtask rows of a task exactly as its edit screen resolves them.
pub fn cmd_subtasks(db: &Database, id: String) {
    let task_id = resolve_or_exit(&id, db);
    let task = db.get(task_id).unwrap();
    let today = Local::now().date_naive();

    // The edit screen is reached through the task's own list grouping.
    let filter = task
        .list
        .as_deref()
        .and_then(|name| db.find_list(name))
        .map(Filter::for_list);
    let context = ParentContext::new(filter, task.remote.clone());
    let views = subtask_views(db, task_id, today);

    for row in build_rows(&context, &views, &[]) {
        match row {
            SubtaskRow::Blocked => {
                println!("(subtasks unavailable: synced lists do not nest further)")
            }
            SubtaskRow::Existing(v) => {
                let chip = if v.has_children {
                    if v.collapsed {
                        " [+]"
                    } else {
                        " [-]"
                    }
                } else {
                    ""
                };
                println!(
                    "{}[{}] #{} {}{}",
                    "  ".repeat(v.indent),
                    if v.completed { "x" } else { " " },
                    v.id,
                    v.title,
                    chip
                );
            }
            SubtaskRow::Draft { .. } => {}
            SubtaskRow::AddPrompt => println!("+ add subtask"),
        }
    }
}

/// Update fields on a task.
pub fn cmd_update(
    db: &mut Database,
    db_path: &Path,
    id: String,
    title: Option<String>,
    notes: Option<String>,
    list: Option<String>,
    due: Option<String>,
    hide_until: Option<String>,
    parent: Option<String>,
    priority: Option<Priority>,
    add_tags: Vec<String>,
    rm_tags: Vec<String>,
    clear_due: bool,
    clear_parent: bool,
) {
    let task_id = resolve_or_exit(&id, db);

    let parent_id = match parent {
        Some(parent_str) => {
            let pid = match resolve_task_identifier(&parent_str, db) {
                Ok(pid) => pid,
                Err(e) => {
                    eprintln!("Error resolving parent: {}", e);
                    std::process::exit(1);
                }
            };
            if pid == task_id {
                eprintln!("Task cannot be its own parent.");
                std::process::exit(1);
            }
            let child_map = build_children_map(&db.tasks);
            let mut descendants = HashSet::new();
            collect_descendants(task_id, &child_map, &mut descendants);
            if descendants.contains(&pid) {
                eprintln!("Task {} is a descendant of {}; that would create a cycle.", pid, task_id);
                std::process::exit(1);
            }
            Some(pid)
        }
        None => None,
    };

    let list = list.map(|l| {
        let name = crate::list::sanitize_list_name(&l);
        if db.find_list(&name).is_none() {
            db.lists.push(TaskList::new(&l));
        }
        name
    });

    let add_tags = split_and_normalise_tags(&add_tags);
    let rm_tags = split_and_normalise_tags(&rm_tags);
    let due = due.as_deref().and_then(parse_due_input);
    let hide_until = hide_until.as_deref().and_then(parse_due_input);

    let Some(task) = db.get_mut(task_id) else {
        eprintln!("Task {} not found", task_id);
        std::process::exit(1);
    };
    if let Some(t) = title {
        task.title = t;
    }
    if let Some(n) = notes {
        task.notes = Some(n);
    }
    if let Some(l) = list {
        task.list = Some(l);
    }
    if let Some(d) = due {
        task.due = Some(d);
    }
    if clear_due {
        task.due = None;
    }
    if let Some(h) = hide_until {
        task.hide_until = Some(h);
    }
    if let Some(p) = parent_id {
        task.parent = Some(p);
    }
    if clear_parent {
        task.parent = None;
    }
    if let Some(p) = priority {
        task.priority = Some(p);
    }
    for tag in add_tags {
        if !task.tags.contains(&tag) {
            task.tags.push(tag);
        }
    }
    task.tags.retain(|t| !rm_tags.contains(t));
    task.tags.sort();
    task.updated_at_utc = Utc::now().timestamp();

    save_or_exit(db, db_path);
    println!("Updated task {}", task_id);
}

/// Mark tasks done, by identifier or in bulk.
pub fn cmd_complete(
    db: &mut Database,
    db_path: &Path,
    id: Option<String>,
    recurse: bool,
    tag: Option<String>,
    list: Option<String>,
) {
    let now_utc = Utc::now().timestamp();
    let mut ids: HashSet<u64> = HashSet::new();

    if let Some(id) = id {
        let task_id = resolve_or_exit(&id, db);
        ids.insert(task_id);
        if recurse {
            let child_map = build_children_map(&db.tasks);
            collect_descendants(task_id, &child_map, &mut ids);
        }
    } else if tag.is_some() || list.is_some() {
        let tag = tag.map(|t| normalise_tag(&t));
        let list = list.map(|l| crate::list::sanitize_list_name(&l));
        for t in &db.tasks {
            let tag_ok = tag.as_ref().map_or(true, |tg| t.tags.contains(tg));
            let list_ok = list.as_ref().map_or(true, |l| t.list.as_deref() == Some(l.as_str()));
            if tag_ok && list_ok {
                ids.insert(t.id);
            }
        }
    } else {
        eprintln!("Provide a task ID/title or a bulk filter (--tag / --list).");
        std::process::exit(1);
    }

    let mut count = 0;
    for t in db.tasks.iter_mut() {
        if ids.contains(&t.id) && !t.completed {
            t.completed = true;
            t.updated_at_utc = now_utc;
            count += 1;
        }
    }
    save_or_exit(db, db_path);
    println!("Completed {} task(s)", count);
}

/// Reopen a completed task.
pub fn cmd_reopen(db: &mut Database, db_path: &Path, id: String) {
    let task_id = resolve_or_exit(&id, db);
    let Some(task) = db.get_mut(task_id) else {
        eprintln!("Task {} not found", task_id);
        std::process::exit(1);
    };
    task.completed = false;
    task.updated_at_utc = Utc::now().timestamp();
    save_or_exit(db, db_path);
    println!("Reopened task {}", task_id);
}

/// Delete tasks, by identifier or in bulk.
pub fn cmd_delete(
    db: &mut Database,
    db_path: &Path,
    id: Option<String>,
    cascade: bool,
    tag: Option<String>,
    list: Option<String>,
) {
    let mut ids: HashSet<u64> = HashSet::new();

    if let Some(id) = id {
        let task_id = resolve_or_exit(&id, db);
        let child_map = build_children_map(&db.tasks);
        let mut descendants = HashSet::new();
        collect_descendants(task_id, &child_map, &mut descendants);
        if !descendants.is_empty() && !cascade {
            eprintln!(
                "Task {} has {} descendant(s). Re-run with --cascade to delete the subtree.",
                task_id,
                descendants.len()
            );
            std::process::exit(1);
        }
        ids.insert(task_id);
        ids.extend(descendants);
    } else if tag.is_some() || list.is_some() {
        let tag = tag.map(|t| normalise_tag(&t));
        let list = list.map(|l| crate::list::sanitize_list_name(&l));
        for t in &db.tasks {
            let tag_ok = tag.as_ref().map_or(true, |tg| t.tags.contains(tg));
            let list_ok = list.as_ref().map_or(true, |l| t.list.as_deref() == Some(l.as_str()));
            if tag_ok && list_ok {
                ids.insert(t.id);
            }
        }
    } else {
        eprintln!("Provide a task ID/title or a bulk filter (--tag / --list).");
        std::process::exit(1);
    }

    let count = ids.len();
    db.remove_ids(&ids);
    save_or_exit(db, db_path);
    println!("Deleted {} task(s)", count);
}

/// Manage task lists.
pub fn cmd_lists(db: &mut Database, db_path: &Path, action: Option<ListAction>) {
    match action.unwrap_or(ListAction::List) {
        ListAction::List => {
            if db.lists.is_empty() {
                println!("No lists.");
                return;
            }
            for l in &db.lists {
                let count = db
                    .tasks
                    .iter()
                    .filter(|t| t.list.as_deref() == Some(l.name.as_str()))
                    .count();
                match &l.remote_id {
                    Some(remote) => {
                        println!("{:<20} {:>4} task(s)  synced:{}", l.display_name, count, remote)
                    }
                    None => println!("{:<20} {:>4} task(s)", l.display_name, count),
                }
            }
        }
        ListAction::Add { name } => {
            let list = TaskList::new(&name);
            if list.name.is_empty() {
                eprintln!("List name cannot be empty");
                std::process::exit(1);
            }
            if db.find_list(&list.name).is_some() {
                eprintln!("List '{}' already exists", name);
                std::process::exit(1);
            }
            println!("Created list '{}'", list.display_name);
            db.lists.push(list);
            save_or_exit(db, db_path);
        }
        ListAction::Link { remote_id, name } => {
            if db.find_list_by_remote(&remote_id).is_some() {
                eprintln!("A list is already linked to '{}'", remote_id);
                std::process::exit(1);
            }
            let list = TaskList::synced(&name, &remote_id);
            if list.name.is_empty() {
                eprintln!("List name cannot be empty");
                std::process::exit(1);
            }
            if db.find_list(&list.name).is_some() {
                eprintln!("List '{}' already exists", name);
                std::process::exit(1);
            }
            println!("Linked '{}' to synced list {}", list.display_name, remote_id);
            db.lists.push(list);
            save_or_exit(db, db_path);
        }
        ListAction::Rm { name } => {
            let key = crate::list::sanitize_list_name(&name);
            if db.find_list(&key).is_none() {
                eprintln!("List '{}' not found", name);
                std::process::exit(1);
            }
            db.lists.retain(|l| l.name != key);
            for t in db.tasks.iter_mut() {
                if t.list.as_deref() == Some(key.as_str()) {
                    t.list = None;
                }
            }
            save_or_exit(db, db_path);
            println!("Deleted list '{}' (its tasks were kept)", name);
        }
    }
}

/// List distinct tags and counts.
pub fn cmd_tags(db: &Database) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in &db.tasks {
        for tag in &t.tags {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }
    if counts.is_empty() {
        println!("No tags.");
        return;
    }
    let mut entries: Vec<_> = counts.into_iter().collect();
    entries.sort();
    for (tag, count) in entries {
        println!("{:<20} {}", tag, count);
    }
}

/// Export tasks to CSV format.
pub fn cmd_export(db: &Database, output: Option<String>, all: bool, list: Option<String>, tag: Option<String>) {
    let today = Local::now().date_naive();
    let list = list.map(|l| crate::list::sanitize_list_name(&l));
    let tag = tag.map(|t| normalise_tag(&t));
    let path = output.unwrap_or_else(|| "tasks.csv".to_string());

    let mut csv = String::from("id,title,completed,priority,due,hide_until,parent,list,tags,notes\n");
    let mut count = 0;
    for t in &db.tasks {
        if !all && (t.completed || t.is_hidden(today)) {
            continue;
        }
        if let Some(ref l) = list {
            if t.list.as_deref() != Some(l.as_str()) {
                continue;
            }
        }
        if let Some(ref tg) = tag {
            if !t.tags.contains(tg) {
                continue;
            }
        }
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{}\n",
            t.id,
            csv_escape(&t.title),
            t.completed,
            format_priority(t.priority),
            t.due.map(|d| d.to_string()).unwrap_or_default(),
            t.hide_until.map(|d| d.to_string()).unwrap_or_default(),
            t.parent.map(|p| p.to_string()).unwrap_or_default(),
            t.list.as_deref().unwrap_or(""),
            csv_escape(&t.tags.join(",")),
            csv_escape(t.notes.as_deref().unwrap_or("")),
        ));
        count += 1;
    }

    if let Err(e) = fs::write(&path, csv) {
        eprintln!("Failed to write {}: {}", path, e);
        std::process::exit(1);
    }
    println!("Exported {} task(s) to {}", count, path);
}

/// Quote a CSV field when it contains separators or quotes.
fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Create a timestamped copy of the database file next to it.
pub fn cmd_backup(db_path: &Path) {
    if !db_path.exists() {
        eprintln!("No database at {}", db_path.display());
        std::process::exit(1);
    }
    let stem = db_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("tasks");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = db_path.with_file_name(format!("{}_{}.json", stem, timestamp));
    match fs::copy(db_path, &backup_path) {
        Ok(_) => println!("Backed up to {}", backup_path.display()),
        Err(e) => {
            eprintln!("Backup failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "tt", &mut io::stdout());
}

fn resolve_or_exit(identifier: &str, db: &Database) -> u64 {
    match resolve_task_identifier(identifier, db) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn save_or_exit(db: &Database, db_path: &Path) {
    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
}
