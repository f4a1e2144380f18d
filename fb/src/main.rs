use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;

use feedbackstore::cli::{Cli, Command};
use feedbackstore::{FeedbackRating, FeedbackStore, NewFeedback, Rating, default_db_path};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn print_rows(rows: &[FeedbackRating]) {
    println!("Feedback entries found: {}", rows.len());
    println!("-----------------------------");

    if rows.is_empty() {
        println!("No feedback entries found.");
        return;
    }

    for (i, row) in rows.iter().enumerate() {
        let rating = match row.rating {
            Rating::ThumbsUp => row.rating.to_string().green(),
            Rating::ThumbsDown => row.rating.to_string().red(),
        };
        println!("Entry #{}:", i + 1);
        println!("ID: {}", row.id);
        println!("Timestamp: {}", row.timestamp);
        println!("Plan ID: {}", row.plan_id.cyan());
        println!(
            "Step ID: {}",
            row.step_id
                .map(|s| s.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        );
        println!("Rating: {}", rating);
        println!("Comment: {}", row.comment.as_deref().unwrap_or("N/A"));
        println!("User ID: {}", row.user_id);
        println!("-----------------------------");
    }
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let db_path = cli.db.clone().unwrap_or_else(default_db_path);
    let store = FeedbackStore::open(&db_path).context("Failed to open feedback store")?;

    info!("feedback store at {}", db_path.display());

    match cli.command {
        Command::Dump => {
            let rows = store.all_feedback()?;
            print_rows(&rows);
        }
        Command::Get { plan_id } => {
            let rows = store.get_feedback(&plan_id)?;
            print_rows(&rows);
        }
        Command::Store {
            plan,
            step,
            rating,
            comment,
            user,
        } => {
            let rating = match rating.as_str() {
                "up" | "thumbs_up" => Rating::ThumbsUp,
                "down" | "thumbs_down" => Rating::ThumbsDown,
                other => bail!("Invalid rating '{}'. Use up or down.", other),
            };
            let id = store.store_feedback(NewFeedback {
                plan_id: plan,
                step_id: step,
                rating,
                comment,
                user_id: user,
            })?;
            println!("{} Stored feedback entry {}", "✓".green(), id);
        }
    }

    Ok(())
}
