//! FeedbackStore - append-only learning-plan feedback ratings
//!
//! A single SQLite table of thumbs-up/thumbs-down events keyed by plan
//! identifier and optional step index. Rows are inserted and read back,
//! never updated or deleted.

pub mod cli;
pub mod store;

pub use store::{FeedbackRating, FeedbackStore, NewFeedback, Rating, StoreError};

/// Database file name under the data directory
pub const DB_FILE: &str = "codeleap.db";

/// Default database path: `<data dir>/codeleap/codeleap.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("codeleap")
        .join(DB_FILE)
}
