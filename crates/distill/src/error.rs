use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DistillError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),

    #[error("Content source error: {0}")]
    Content(#[from] crate::content::AcquireError),

    #[error("Summarizer error: {0}")]
    Summarize(#[from] crate::summary::SummarizeError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Missing required setting {key}: {reason}")]
    Missing { key: &'static str, reason: String },

    #[error("Could not determine a default database location (no home directory)")]
    NoDefaultDatabasePath,
}

/// Document text extraction failures.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to process PDF: {0}")]
    PdfProcessing(String),

    #[error("Failed to process office document: {0}")]
    OfficeProcessing(String),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Job store unavailable: {0}")]
    Store(#[from] crate::db::DatabaseError),

    #[error("Cache unavailable: {0}")]
    Cache(#[from] crate::cache::CacheError),

    #[error("Worker task panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, DistillError>;
