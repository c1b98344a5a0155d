//! Submission and read paths shared by the HTTP API.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::cache::{key_for, CacheError, CacheStore};
use crate::content::classify::{path_extension, DOCUMENT_EXTENSIONS, PAGE_EXTENSIONS};
use crate::db::DatabaseError;
use crate::job::{JobId, JobInput, JobStatus};
use crate::store::JobStore;

/// A summarization request as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryRequest {
    pub url: Option<String>,
    pub text: Option<String>,
    pub custom_instructions: Option<String>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Either 'url' or 'text' must be provided")]
    MissingInput,

    #[error("Only one of 'url' or 'text' can be provided")]
    ConflictingInput,

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported file type '.{0}'")]
    UnsupportedExtension(String),
}

impl SummaryRequest {
    /// Checks that exactly one of `url` / `text` is present and that a URL
    /// is http(s) with a supported extension (if any). Blank fields count
    /// as absent.
    pub fn validate(self) -> Result<JobInput, ValidationError> {
        let url = non_blank(self.url);
        let text = non_blank(self.text);
        let custom_instructions = non_blank(self.custom_instructions);

        match (&url, &text) {
            (None, None) => return Err(ValidationError::MissingInput),
            (Some(_), Some(_)) => return Err(ValidationError::ConflictingInput),
            _ => {}
        }

        if let Some(ref raw) = url {
            let parsed = Url::parse(raw).map_err(|e| ValidationError::InvalidUrl {
                url: raw.clone(),
                reason: e.to_string(),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ValidationError::InvalidUrl {
                    url: raw.clone(),
                    reason: format!("unsupported scheme '{}'", parsed.scheme()),
                });
            }
            if let Some(ext) = path_extension(raw) {
                let ext_ref = ext.as_str();
                if !DOCUMENT_EXTENSIONS.contains(&ext_ref) && !PAGE_EXTENSIONS.contains(&ext_ref) {
                    return Err(ValidationError::UnsupportedExtension(ext));
                }
            }
        }

        Ok(JobInput {
            url,
            text,
            custom_instructions,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub job_id: JobId,
    pub is_cached: bool,
}

/// What the result read path found for a job id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultOutcome {
    Ready {
        result: String,
        processing_time_ms: Option<u64>,
    },
    /// Still `todo` or `in_progress`.
    NotComplete(JobStatus),
    /// Terminal `failed`. The stored error text is not exposed.
    Failed,
    NotFound,
    /// `success` without a stored result.
    MissingResult,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Job store error: {0}")]
    Store(#[from] DatabaseError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

pub struct SummaryService {
    store: Arc<dyn JobStore>,
    cache: Arc<dyn CacheStore>,
}

impl SummaryService {
    pub fn new(store: Arc<dyn JobStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self { store, cache }
    }

    /// Answers from the cache when possible (the job is created directly in
    /// `success`), otherwise queues a `todo` job.
    pub async fn submit(&self, input: &JobInput) -> Result<Submission, ServiceError> {
        let key = key_for(
            input.url.as_deref(),
            input.text.as_deref(),
            input.custom_instructions.as_deref(),
        );

        if let Some(cached) = self.cache.get(&key).await? {
            let job_id = self.store.create_with_result(input, &cached).await?;
            log::info!("Cache hit for job {} (key {})", job_id, key);
            return Ok(Submission {
                job_id,
                is_cached: true,
            });
        }

        let job_id = self.store.create(input).await?;
        log::info!("Queued job {} (key {})", job_id, key);
        Ok(Submission {
            job_id,
            is_cached: false,
        })
    }

    pub async fn status(&self, id: JobId) -> Result<Option<JobStatus>, ServiceError> {
        Ok(self.store.get_status(id).await?)
    }

    pub async fn result(&self, id: JobId) -> Result<ResultOutcome, ServiceError> {
        let Some(outcome) = self.store.get_result(id).await? else {
            return Ok(ResultOutcome::NotFound);
        };

        Ok(match outcome.status {
            JobStatus::Todo | JobStatus::InProgress => ResultOutcome::NotComplete(outcome.status),
            JobStatus::Failed => ResultOutcome::Failed,
            JobStatus::Success => match outcome.result {
                Some(result) => ResultOutcome::Ready {
                    result,
                    processing_time_ms: outcome.processing_time_ms,
                },
                None => ResultOutcome::MissingResult,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::Database;
    use crate::store::SqliteJobStore;
    use std::time::Duration;

    fn request(url: Option<&str>, text: Option<&str>) -> SummaryRequest {
        SummaryRequest {
            url: url.map(String::from),
            text: text.map(String::from),
            custom_instructions: None,
        }
    }

    fn service() -> (SummaryService, Arc<SqliteJobStore>, Arc<MemoryCache>) {
        let store = Arc::new(SqliteJobStore::new(Database::open_in_memory().unwrap()));
        let cache = Arc::new(MemoryCache::new(Duration::from_secs(60), 100));
        (
            SummaryService::new(store.clone(), cache.clone()),
            store,
            cache,
        )
    }

    #[test]
    fn test_validate_exactly_one_input() {
        assert_eq!(
            request(None, None).validate(),
            Err(ValidationError::MissingInput)
        );
        assert_eq!(
            request(Some("https://example.com"), Some("text")).validate(),
            Err(ValidationError::ConflictingInput)
        );
        assert_eq!(
            request(Some("  "), Some("text")).validate().unwrap(),
            JobInput::from_text("text")
        );
    }

    #[test]
    fn test_validate_url() {
        assert!(request(Some("https://example.com/report.pdf"), None).validate().is_ok());
        assert!(request(Some("https://example.com/index.html"), None).validate().is_ok());
        assert!(request(Some("https://example.com/blog/post"), None).validate().is_ok());
        assert_eq!(
            request(Some("https://example.com/a.exe"), None).validate(),
            Err(ValidationError::UnsupportedExtension("exe".to_string()))
        );
        assert!(matches!(
            request(Some("ftp://example.com/a.pdf"), None).validate(),
            Err(ValidationError::InvalidUrl { .. })
        ));
        assert!(matches!(
            request(Some("example.com"), None).validate(),
            Err(ValidationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validate_drops_blank_instructions() {
        let mut req = request(None, Some("text"));
        req.custom_instructions = Some("".to_string());
        assert!(req.validate().unwrap().custom_instructions.is_none());
    }

    #[tokio::test]
    async fn test_submit_queues_on_miss() {
        let (service, store, _) = service();
        let submission = service.submit(&JobInput::from_text("hello world")).await.unwrap();
        assert!(!submission.is_cached);
        assert_eq!(
            store.get_status(submission.job_id).await.unwrap(),
            Some(JobStatus::Todo)
        );
    }

    #[tokio::test]
    async fn test_submit_short_circuits_on_hit() {
        let (service, store, cache) = service();
        cache
            .set(&key_for(None, Some("hello world"), None), "cached summary")
            .await
            .unwrap();

        let submission = service.submit(&JobInput::from_text("hello world")).await.unwrap();
        assert!(submission.is_cached);
        assert_eq!(
            service.result(submission.job_id).await.unwrap(),
            ResultOutcome::Ready {
                result: "cached summary".to_string(),
                processing_time_ms: None,
            }
        );
        assert!(store.claim_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_paths() {
        let (service, store, _) = service();
        assert_eq!(service.status(JobId(9)).await.unwrap(), None);
        assert_eq!(service.result(JobId(9)).await.unwrap(), ResultOutcome::NotFound);

        let todo = service.submit(&JobInput::from_text("a")).await.unwrap().job_id;
        assert_eq!(
            service.result(todo).await.unwrap(),
            ResultOutcome::NotComplete(JobStatus::Todo)
        );

        store.claim_next().await.unwrap();
        store
            .set_result(todo, JobStatus::Failed, "scraper exploded", Some(3))
            .await
            .unwrap();
        assert_eq!(service.result(todo).await.unwrap(), ResultOutcome::Failed);
        assert_eq!(
            service.status(todo).await.unwrap(),
            Some(JobStatus::Failed)
        );
    }

    #[test]
    fn test_submission_serializes() {
        let json = serde_json::to_value(Submission {
            job_id: JobId(7),
            is_cached: true,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "job_id": 7, "is_cached": true }));
    }
}
