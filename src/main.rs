//! # tt - To-do CLI
//!
//! A file-backed to-do manager with hierarchical subtasks and an optional
//! terminal user interface (TUI).
//!
//! ## Key Features
//!
//! - **Nested Subtasks**: Tasks fold into arbitrarily deep local hierarchies,
//!   with collapse/expand state kept per task
//! - **Synced-List Awareness**: Tasks linked into remote synced lists follow
//!   those lists' flat-hierarchy rules
//! - **Rich Metadata**: Priority, due dates, hide-until scheduling, tags,
//!   notes and lists
//! - **Multiple Interfaces**: Full CLI for automation + interactive TUI whose
//!   edit screen supports inline quick-add of subtasks
//! - **Local File Storage**: One JSON file with CSV export and backups
//!
//! ## Quick Start
//!
//! ```bash
//! # Launch the list menu
//! tt menu
//!
//! # Or launch the TUI directly
//! tt ui
//!
//! # Add tasks via CLI
//! tt add "Plan the trip" --list travel --due "next friday"
//! tt add "Book hotel" --parent "Plan the trip"
//!
//! # Inspect
//! tt list --tree
//! tt subtasks "Plan the trip"
//! ```
//!
//! Data is stored locally in `~/.tasktree/tasks.json`. We recommend you
//! source control that folder via `git init` and back it up periodically.

use std::path::PathBuf;

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod db;
pub mod fields;
pub mod list;
pub mod task;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod menu;
    pub mod run;
    pub mod subtasks;
    pub mod task_form;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use db::Database;

fn main() {
    let cli = Cli::parse();

    // Determine the database file to use.
    let db_path = cli.db.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let data_dir = PathBuf::from(home).join(".tasktree");
        if let Err(e) = std::fs::create_dir_all(&data_dir) {
            eprintln!("Failed to create data directory {}: {}", data_dir.display(), e);
            std::process::exit(1);
        }
        data_dir.join("tasks.json")
    });

    // Commands owning the whole terminal bypass the shared database load.
    match cli.command {
        Commands::Ui { list, tag, desaturate } => {
            cmd_ui(&db_path, list, tag, desaturate);
            return;
        }
        Commands::Menu { desaturate } => {
            cmd_menu(&db_path, desaturate);
            return;
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
            return;
        }
        Commands::Backup => {
            cmd_backup(&db_path);
            return;
        }
        _ => {}
    }

    let mut db = Database::load(&db_path);

    match cli.command {
        Commands::Ui { .. } => unreachable!("UI command handled above"),
        Commands::Menu { .. } => unreachable!("Menu command handled above"),
        Commands::Completions { .. } => unreachable!("Completions command handled above"),
        Commands::Backup => unreachable!("Backup command handled above"),

        Commands::Add {
            title,
            notes,
            list,
            tags,
            due,
            hide_until,
            parent,
            priority,
        } => cmd_add(
            &mut db, &db_path, title, notes, list, tags, due, hide_until, parent, priority,
        ),

        Commands::List {
            all,
            list,
            tags,
            due,
            tree,
            sort,
            limit,
        } => cmd_list(&db, all, list, tags, due, tree, sort, limit),

        Commands::View { id, children, parents } => cmd_view(&db, id, children, parents),

        Commands::Subtasks { id } => cmd_subtasks(&db, id),

        Commands::Update {
            id,
            title,
            notes,
            list,
            due,
            hide_until,
            parent,
            priority,
            add_tags,
            rm_tags,
            clear_due,
            clear_parent,
        } => cmd_update(
            &mut db, &db_path, id, title, notes, list, due, hide_until, parent, priority,
            add_tags, rm_tags, clear_due, clear_parent,
        ),

        Commands::Complete { id, recurse, tag, list } => {
            cmd_complete(&mut db, &db_path, id, recurse, tag, list)
        }

        Commands::Reopen { id } => cmd_reopen(&mut db, &db_path, id),

        Commands::Delete { id, cascade, tag, list } => {
            cmd_delete(&mut db, &db_path, id, cascade, tag, list)
        }

        Commands::Lists { action } => cmd_lists(&mut db, &db_path, action),

        Commands::Tags => cmd_tags(&db),

        Commands::Export { output, all, list, tag } => cmd_export(&db, output, all, list, tag),
    }
}
