//! Command-line interface definitions

use clap::Parser;
use std::path::PathBuf;

/// CodeLeap - interactive AI coding tutor
#[derive(Parser, Debug)]
#[command(name = "cl")]
#[command(author, version, about = "Interactive AI coding tutor", long_about = None)]
pub struct Cli {
    /// Path to config file (default: .codeleap.yml, then ~/.config/codeleap/codeleap.yml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Learning mode to start in (hand-holding or challenge)
    #[arg(long)]
    pub mode: Option<String>,
}

/// Path to the session log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("codeleap")
        .join("logs")
        .join("codeleap.log")
}
