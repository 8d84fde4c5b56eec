use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Simple, file-backed to-do manager.
/// Storage defaults to ~/.tasktree/tasks.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "tt", version, about = "To-do management CLI with nested subtasks")]
pub struct Cli {
    /// Path to the JSON database file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
