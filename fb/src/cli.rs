//! CLI argument parsing for the feedback inspection tool

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fb")]
#[command(author, version, about = "Inspect and append CodeLeap feedback ratings", long_about = None)]
pub struct Cli {
    /// Path to the feedback database (default: the platform data dir)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dump every feedback entry, newest first
    Dump,

    /// Show feedback for one learning plan, newest first
    Get {
        /// Plan identifier (the plan title)
        #[arg(required = true)]
        plan_id: String,
    },

    /// Append a rating
    Store {
        /// Plan identifier (the plan title)
        #[arg(long)]
        plan: String,

        /// Zero-based step index the rating targets
        #[arg(long)]
        step: Option<i64>,

        /// up or down
        #[arg(long)]
        rating: String,

        /// Free-form comment
        #[arg(long)]
        comment: Option<String>,

        /// User identifier (default: anonymous)
        #[arg(long)]
        user: Option<String>,
    },
}
