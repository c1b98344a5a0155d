use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info_span, Instrument};

use crate::cache::{key_for, CacheStore};
use crate::content::ContentSource;
use crate::error::WorkerError;
use crate::job::{ClaimedJob, JobStatus};
use crate::store::JobStore;
use crate::summary::Summarizer;

use super::admission::AdmissionPolicy;
use super::error::JobError;

/// How a claimed job left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Succeeded,
    Failed,
    /// The job was no longer ours to finish (already terminal).
    Abandoned,
}

/// Drives one claimed job to a terminal state.
pub struct JobProcessor {
    store: Arc<dyn JobStore>,
    cache: Arc<dyn CacheStore>,
    content: Arc<ContentSource>,
    summarizer: Arc<dyn Summarizer>,
    admission: AdmissionPolicy,
    lease_timeout: Option<Duration>,
}

impl JobProcessor {
    pub fn new(
        store: Arc<dyn JobStore>,
        cache: Arc<dyn CacheStore>,
        content: Arc<ContentSource>,
        summarizer: Arc<dyn Summarizer>,
        admission: AdmissionPolicy,
    ) -> Self {
        Self {
            store,
            cache,
            content,
            summarizer,
            admission,
            lease_timeout: None,
        }
    }

    /// Renews the job's lease every third of `lease_timeout` while it is
    /// processed, so lease recovery only releases jobs whose worker died.
    pub fn with_lease_timeout(mut self, lease_timeout: Option<Duration>) -> Self {
        self.lease_timeout = lease_timeout;
        self
    }

    /// Processes `job`. Every content, admission or summarization failure
    /// is recorded as `failed`; only storage errors are returned.
    pub async fn process(&self, job: ClaimedJob) -> Result<ProcessOutcome, WorkerError> {
        let span = info_span!("pipeline", job_id = %job.id);
        self.process_inner(job).instrument(span).await
    }

    async fn process_inner(&self, job: ClaimedJob) -> Result<ProcessOutcome, WorkerError> {
        let start = Instant::now();
        log::info!("Processing job {}", job.id);

        if !self.store.set_status(job.id, JobStatus::InProgress).await? {
            log::warn!("Job {} is already terminal, skipping", job.id);
            return Ok(ProcessOutcome::Abandoned);
        }

        match self.summarize_holding_lease(&job).await {
            Ok(summary) => {
                let elapsed = elapsed_ms(start);
                let finalize = info_span!("finalize", status = "success");
                let applied = self
                    .store
                    .set_result(job.id, JobStatus::Success, &summary, Some(elapsed))
                    .instrument(finalize.clone())
                    .await?;
                if !applied {
                    log::warn!(
                        "Job {} finished elsewhere; discarding summary computed in {}ms",
                        job.id,
                        elapsed
                    );
                    return Ok(ProcessOutcome::Abandoned);
                }

                let key = key_for(
                    job.input.url.as_deref(),
                    job.input.text.as_deref(),
                    job.input.custom_instructions.as_deref(),
                );
                self.cache.set(&key, &summary).instrument(finalize).await?;
                log::info!("Job {} completed successfully in {}ms", job.id, elapsed);
                Ok(ProcessOutcome::Succeeded)
            }
            Err(e) => {
                let elapsed = elapsed_ms(start);
                let message = e.to_string();
                log::error!("Job {} failed after {}ms: {}", job.id, elapsed, message);
                let applied = self
                    .store
                    .set_result(job.id, JobStatus::Failed, &message, Some(elapsed))
                    .instrument(info_span!("finalize", status = "failed"))
                    .await?;
                if !applied {
                    log::warn!("Job {} finished elsewhere; failure not recorded", job.id);
                    return Ok(ProcessOutcome::Abandoned);
                }
                Ok(ProcessOutcome::Failed)
            }
        }
    }

    async fn summarize_holding_lease(&self, job: &ClaimedJob) -> Result<String, JobError> {
        let Some(lease) = self.lease_timeout else {
            return self.summarize_job(job).await;
        };

        let work = self.summarize_job(job);
        tokio::pin!(work);
        let mut heartbeat = tokio::time::interval(lease / 3);
        heartbeat.tick().await;
        loop {
            tokio::select! {
                result = &mut work => return result,
                _ = heartbeat.tick() => match self.store.renew_lease(job.id).await {
                    Ok(true) => log::debug!("Renewed lease on job {}", job.id),
                    Ok(false) => log::warn!("Job {} is no longer held by this worker", job.id),
                    Err(e) => log::warn!("Failed to renew lease on job {}: {}", job.id, e),
                },
            }
        }
    }

    async fn summarize_job(&self, job: &ClaimedJob) -> Result<String, JobError> {
        let content = self
            .content
            .acquire(&job.input)
            .instrument(info_span!("acquire_content"))
            .await?;

        let words = {
            let _step = info_span!("admission").entered();
            self.admission.check(&content)?
        };
        log::info!("Content: {} characters, {} words", content.len(), words);

        let summary = self
            .summarizer
            .summarize(&content, job.input.custom_instructions.as_deref())
            .instrument(info_span!("summarize", engine = self.summarizer.name()))
            .await?;
        log::info!("Summary generated: {} characters", summary.len());
        Ok(summary)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
