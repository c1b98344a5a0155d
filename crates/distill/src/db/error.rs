//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating directories or files.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// A stored value could not be mapped back into a domain type.
    #[error("Corrupt row in '{table}': {reason}")]
    CorruptRow { table: &'static str, reason: String },

    /// A write asked for a state no job can legally enter that way.
    #[error("Illegal transition to '{to}': {reason}")]
    IllegalTransition {
        to: crate::job::JobStatus,
        reason: &'static str,
    },

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// The handle was shut down with [`super::Database::close`].
    #[error("Database is closed")]
    Closed,

    /// The blocking task running the query did not complete.
    #[error("Database task failed: {0}")]
    TaskFailed(String),
}
