//! The polling worker loop.

pub mod pool;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::watch;

use crate::error::WorkerError;
use crate::pipeline::{JobProcessor, ProcessOutcome};
use crate::store::JobStore;

pub use pool::{WorkerPool, WorkerPoolConfig};

/// Default idle delay between empty claims.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Per-loop counters, summed across a pool on shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub succeeded: u64,
    pub failed: u64,
    pub abandoned: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: ProcessOutcome) {
        match outcome {
            ProcessOutcome::Succeeded => self.succeeded += 1,
            ProcessOutcome::Failed => self.failed += 1,
            ProcessOutcome::Abandoned => self.abandoned += 1,
        }
    }

    pub fn merge(&mut self, other: WorkerStats) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.abandoned += other.abandoned;
    }

    pub fn processed(&self) -> u64 {
        self.succeeded + self.failed + self.abandoned
    }
}

/// One claim-process-sleep loop. Loops coordinate only through the
/// store's atomic claim, so any number may run against the same database
/// in one process or many.
pub struct Worker {
    id: usize,
    store: Arc<dyn JobStore>,
    processor: Arc<JobProcessor>,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(
        id: usize,
        store: Arc<dyn JobStore>,
        processor: Arc<JobProcessor>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            store,
            processor,
            poll_interval,
        }
    }

    /// Claims and processes at most one job. `None` means the queue was empty.
    pub async fn run_once(&self) -> Result<Option<ProcessOutcome>, WorkerError> {
        match self.store.claim_next().await? {
            Some(job) => {
                debug!("Worker {} claimed job {}", self.id, job.id);
                Ok(Some(self.processor.process(job).await?))
            }
            None => Ok(None),
        }
    }

    /// Runs until `shutdown` turns true (or its sender is dropped). A job
    /// in flight always reaches a terminal state first. Storage errors end
    /// the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<WorkerStats, WorkerError> {
        info!("Worker {} started", self.id);
        let mut stats = WorkerStats::default();

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Some(outcome) = self.run_once().await? {
                stats.record(outcome);
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(
            "Worker {} stopped after {} job(s) ({} succeeded, {} failed)",
            self.id,
            stats.processed(),
            stats.succeeded,
            stats.failed
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::content::{AcquireError, ContentSource, Fetcher, Scraper};
    use crate::db::Database;
    use crate::job::{JobInput, JobStatus};
    use crate::pipeline::AdmissionPolicy;
    use crate::store::SqliteJobStore;
    use crate::summary::ExtractiveSummarizer;
    use async_trait::async_trait;

    struct NoScraper;

    #[async_trait]
    impl Scraper for NoScraper {
        async fn scrape(&self, url: &str) -> Result<String, AcquireError> {
            Err(AcquireError::EmptyContent(url.to_string()))
        }
    }

    fn worker(store: Arc<SqliteJobStore>, word_limit: usize, poll: Duration) -> Worker {
        let fetcher = Fetcher::new(Duration::from_secs(5), 1024).unwrap();
        let processor = JobProcessor::new(
            store.clone(),
            Arc::new(MemoryCache::new(Duration::from_secs(60), 100)),
            Arc::new(ContentSource::new(fetcher, Arc::new(NoScraper))),
            Arc::new(ExtractiveSummarizer::default()),
            AdmissionPolicy::new(word_limit),
        );
        Worker::new(0, store, Arc::new(processor), poll)
    }

    fn store() -> Arc<SqliteJobStore> {
        Arc::new(SqliteJobStore::new(Database::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_run_once_on_empty_queue() {
        let worker = worker(store(), 100, DEFAULT_POLL_INTERVAL);
        assert!(worker.run_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_once_processes_oldest_job() {
        let store = store();
        let first = store.create(&JobInput::from_text("First one.")).await.unwrap();
        let second = store.create(&JobInput::from_text("Second one.")).await.unwrap();
        let worker = worker(store.clone(), 100, DEFAULT_POLL_INTERVAL);

        assert_eq!(
            worker.run_once().await.unwrap(),
            Some(ProcessOutcome::Succeeded)
        );
        assert_eq!(store.get_status(first).await.unwrap(), Some(JobStatus::Success));
        assert_eq!(store.get_status(second).await.unwrap(), Some(JobStatus::Todo));
    }

    #[tokio::test]
    async fn test_loop_survives_failures_and_stops_on_signal() {
        let store = store();
        let bad = store
            .create(&JobInput::from_text("far too many words here"))
            .await
            .unwrap();
        let good = store.create(&JobInput::from_text("Fine.")).await.unwrap();
        let worker = worker(store.clone(), 3, Duration::from_millis(10));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { worker.run(rx).await });

        for _ in 0..200 {
            if store.get_status(good).await.unwrap() == Some(JobStatus::Success) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(store.get_status(bad).await.unwrap(), Some(JobStatus::Failed));
    }

    #[tokio::test]
    async fn test_dropped_sender_stops_idle_loop() {
        let worker = worker(store(), 100, Duration::from_secs(3600));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { worker.run(rx).await });
        drop(tx);

        let stats = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(stats.processed(), 0);
    }

    #[tokio::test]
    async fn test_storage_error_ends_loop() {
        let store = store();
        let worker = worker(store.clone(), 100, Duration::from_millis(10));
        store.database().close().unwrap();

        let (_tx, rx) = watch::channel(false);
        assert!(matches!(
            worker.run(rx).await,
            Err(WorkerError::Store(_))
        ));
    }
}
