//! CodeLeap - interactive AI coding tutor
//!
//! Entry point: wires config, logging, the LLM-backed gateway, the
//! feedback store, and the interactive session loop.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use codeleap::cli::{Cli, get_log_path};
use codeleap::config::Config;
use codeleap::gateway::LlmGateway;
use codeleap::llm::create_client;
use codeleap::prompts::PromptLoader;
use codeleap::repl::{ReplSession, describe_state};
use codeleap::session::{LearningMode, Session};
use feedbackstore::FeedbackStore;

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    let log_dir = log_path.parent().unwrap_or(&PathBuf::from(".")).to_path_buf();

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = match cli_log_level.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    let mode = cli
        .mode
        .as_deref()
        .or(Some(config.session.default_mode.as_str()))
        .and_then(LearningMode::parse)
        .ok_or_else(|| {
            eyre::eyre!("Invalid learning mode. Use 'hand-holding' or 'challenge'.")
        })?;

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "LLM client initialized");

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let gateway = std::sync::Arc::new(LlmGateway::new(
        llm,
        PromptLoader::new(&cwd),
        config.llm.max_tokens,
    ));

    // Feedback is optional: a broken store degrades /rate, nothing else
    let store = match FeedbackStore::open(config.storage.feedback_db_path()) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "Feedback store unavailable");
            None
        }
    };

    let session = Session::new(gateway, mode, config.session.language.clone());
    debug!(state = %describe_state(session.state()), "session created");

    let mut repl = ReplSession::new(session, store);
    repl.run().await
}
