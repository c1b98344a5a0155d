pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod service;
pub mod store;
pub mod summary;
pub mod worker;

pub use app::App;
pub use cache::{key_for, CacheStore, Fingerprint};
pub use config::Settings;
pub use error::{DistillError, Result};
pub use job::{ClaimedJob, JobId, JobInput, JobOutcome, JobStatus};
pub use service::{ResultOutcome, Submission, SummaryRequest, SummaryService};
pub use store::{JobStore, SqliteJobStore};
pub use worker::{Worker, WorkerPool};
