//! SQLite-backed feedback rating store
//!
//! One table, append-only. Concurrent inserts across sessions are safe
//! because nothing is ever updated or deleted.

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, params};
use thiserror::Error;
use tracing::debug;

/// Errors from feedback store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to create store directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown rating value: {0}")]
    UnknownRating(String),
}

/// A thumbs-up or thumbs-down verdict on a plan or one of its steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    ThumbsUp,
    ThumbsDown,
}

impl Rating {
    /// The string stored in the rating column
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::ThumbsUp => "thumbs_up",
            Rating::ThumbsDown => "thumbs_down",
        }
    }

    /// Parse a stored rating string
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "thumbs_up" => Ok(Rating::ThumbsUp),
            "thumbs_down" => Ok(Rating::ThumbsDown),
            other => Err(StoreError::UnknownRating(other.to_string())),
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rating to append
#[derive(Debug, Clone)]
pub struct NewFeedback {
    /// Plan identifier (the plan title)
    pub plan_id: String,
    /// Zero-based step index, when the rating targets one step
    pub step_id: Option<i64>,
    pub rating: Rating,
    pub comment: Option<String>,
    /// Defaults to "anonymous" when absent
    pub user_id: Option<String>,
}

/// A persisted rating row
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRating {
    pub id: i64,
    /// ISO-8601 UTC timestamp
    pub timestamp: String,
    pub plan_id: String,
    pub step_id: Option<i64>,
    pub rating: Rating,
    pub comment: Option<String>,
    pub user_id: String,
}

const SELECT_COLUMNS: &str = "id, timestamp, plan_id, step_id, rating, comment, user_id";

/// Append-only feedback store over a single SQLite table
pub struct FeedbackStore {
    conn: Connection,
}

impl FeedbackStore {
    /// Open the store, creating the database file and schema if missing
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened feedback store");
        Self::init(conn)
    }

    /// Open an in-memory store (tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                plan_id TEXT NOT NULL,
                step_id INTEGER,
                rating TEXT NOT NULL,
                comment TEXT,
                user_id TEXT
            )",
        )?;
        Ok(Self { conn })
    }

    /// Append one rating row; returns the new row id
    pub fn store_feedback(&self, feedback: NewFeedback) -> Result<i64, StoreError> {
        let timestamp = Utc::now().to_rfc3339();
        let user_id = feedback.user_id.unwrap_or_else(|| "anonymous".to_string());
        let comment = feedback.comment.unwrap_or_default();

        debug!(plan_id = %feedback.plan_id, step_id = ?feedback.step_id, rating = %feedback.rating, "store_feedback: inserting");
        self.conn.execute(
            "INSERT INTO feedback (timestamp, plan_id, step_id, rating, comment, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                timestamp,
                feedback.plan_id,
                feedback.step_id,
                feedback.rating.as_str(),
                comment,
                user_id
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All ratings for one plan, newest first
    pub fn get_feedback(&self, plan_id: &str) -> Result<Vec<FeedbackRating>, StoreError> {
        debug!(%plan_id, "get_feedback: called");
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM feedback WHERE plan_id = ?1 ORDER BY timestamp DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![plan_id], row_to_rating)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Every rating in the store, newest first (inspection CLI)
    pub fn all_feedback(&self) -> Result<Vec<FeedbackRating>, StoreError> {
        debug!("all_feedback: called");
        let sql = format!("SELECT {SELECT_COLUMNS} FROM feedback ORDER BY timestamp DESC, id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_rating)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn row_to_rating(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeedbackRating> {
    let rating_str: String = row.get(4)?;
    let rating = Rating::parse(&rating_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let comment: Option<String> = row.get(5)?;
    let user_id: Option<String> = row.get(6)?;

    Ok(FeedbackRating {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        plan_id: row.get(2)?,
        step_id: row.get(3)?,
        rating,
        // Empty comments are stored as "" and read back as absent
        comment: comment.filter(|c| !c.is_empty()),
        user_id: user_id.unwrap_or_else(|| "anonymous".to_string()),
    })
}
