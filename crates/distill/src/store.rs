//! The durable job queue.
//!
//! [`JobStore`] is the seam between the submission path / worker loop and
//! storage. [`SqliteJobStore`] is the production implementation; tests can
//! substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::db::{blocking, job_repo, Database, DatabaseError};
use crate::job::{ClaimedJob, JobId, JobInput, JobOutcome, JobStatus};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a new job in `todo`.
    async fn create(&self, input: &JobInput) -> Result<JobId, DatabaseError>;

    /// Inserts a job already in `success` holding `result`, with no
    /// processing time. Used for cache hits.
    async fn create_with_result(&self, input: &JobInput, result: &str)
        -> Result<JobId, DatabaseError>;

    /// Atomically claims the oldest `todo` job, moving it to `in_progress`.
    /// Concurrent callers never receive the same job.
    async fn claim_next(&self) -> Result<Option<ClaimedJob>, DatabaseError>;

    /// Moves a job to `status` along a legal edge of the state machine.
    /// Returns whether it applied.
    async fn set_status(&self, id: JobId, status: JobStatus) -> Result<bool, DatabaseError>;

    /// Terminal write of status, result and processing time. Returns
    /// whether it applied (`false` unless the job is `in_progress`).
    async fn set_result(
        &self,
        id: JobId,
        status: JobStatus,
        result: &str,
        processing_time_ms: Option<u64>,
    ) -> Result<bool, DatabaseError>;

    /// `None` means the id is unknown.
    async fn get_status(&self, id: JobId) -> Result<Option<JobStatus>, DatabaseError>;

    /// `None` means the id is unknown.
    async fn get_result(&self, id: JobId) -> Result<Option<JobOutcome>, DatabaseError>;

    /// Refreshes the claim timestamp of an `in_progress` job. Returns
    /// whether the job is still held.
    async fn renew_lease(&self, id: JobId) -> Result<bool, DatabaseError>;

    /// Returns jobs that have been `in_progress` for longer than
    /// `older_than` to `todo`. Returns how many were released.
    async fn reclaim_stale(&self, older_than: Duration) -> Result<usize, DatabaseError>;
}

/// [`JobStore`] backed by the shared SQLite database.
#[derive(Clone)]
pub struct SqliteJobStore {
    db: Database,
}

impl SqliteJobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, input: &JobInput) -> Result<JobId, DatabaseError> {
        let db = self.db.clone();
        let input = input.clone();
        let id = blocking(move || job_repo::insert_todo(&db, &input)).await?;
        log::info!("Created job {}", id);
        Ok(id)
    }

    async fn create_with_result(
        &self,
        input: &JobInput,
        result: &str,
    ) -> Result<JobId, DatabaseError> {
        let db = self.db.clone();
        let input = input.clone();
        let result = result.to_string();
        let id = blocking(move || job_repo::insert_with_result(&db, &input, &result)).await?;
        log::info!("Created job {} from cached result", id);
        Ok(id)
    }

    async fn claim_next(&self) -> Result<Option<ClaimedJob>, DatabaseError> {
        let db = self.db.clone();
        let claimed = blocking(move || job_repo::claim_next(&db)).await?;
        if let Some(ref job) = claimed {
            log::debug!("Claimed job {}", job.id);
        }
        Ok(claimed)
    }

    async fn set_status(&self, id: JobId, status: JobStatus) -> Result<bool, DatabaseError> {
        let db = self.db.clone();
        blocking(move || job_repo::update_status(&db, id, status)).await
    }

    async fn set_result(
        &self,
        id: JobId,
        status: JobStatus,
        result: &str,
        processing_time_ms: Option<u64>,
    ) -> Result<bool, DatabaseError> {
        let db = self.db.clone();
        let result = result.to_string();
        blocking(move || job_repo::update_result(&db, id, status, &result, processing_time_ms))
            .await
    }

    async fn get_status(&self, id: JobId) -> Result<Option<JobStatus>, DatabaseError> {
        let db = self.db.clone();
        blocking(move || job_repo::find_status(&db, id)).await
    }

    async fn get_result(&self, id: JobId) -> Result<Option<JobOutcome>, DatabaseError> {
        let db = self.db.clone();
        blocking(move || job_repo::find_outcome(&db, id)).await
    }

    async fn renew_lease(&self, id: JobId) -> Result<bool, DatabaseError> {
        let db = self.db.clone();
        blocking(move || job_repo::renew_lease(&db, id)).await
    }

    async fn reclaim_stale(&self, older_than: Duration) -> Result<usize, DatabaseError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(older_than).unwrap_or(chrono::Duration::MAX);
        let db = self.db.clone();
        let released = blocking(move || job_repo::reclaim_stale(&db, cutoff)).await?;
        if released > 0 {
            log::warn!(
                "Returned {} stale in_progress job(s) to todo (lease older than {:?})",
                released,
                older_than
            );
        }
        Ok(released)
    }
}
