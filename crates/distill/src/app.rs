//! Builds the shared components from [`Settings`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};

use crate::cache::{CacheStore, MemoryCache, SqliteCache};
use crate::config::{CacheBackend, Settings, SummarizerKind};
use crate::content::{ContentSource, Fetcher, SpiderScraper};
use crate::db::{cache_repo, Database};
use crate::error::{ConfigError, Result};
use crate::pipeline::{AdmissionPolicy, JobProcessor};
use crate::service::SummaryService;
use crate::store::{JobStore, SqliteJobStore};
use crate::summary::{ExtractiveSummarizer, OpenAiSummarizer, Summarizer};
use crate::worker::WorkerPoolConfig;

const SUMMARIZE_TIMEOUT: Duration = Duration::from_secs(120);

/// Process-wide handles. `open` is the init step; `close` the shutdown.
pub struct App {
    pub db: Database,
    pub store: Arc<dyn JobStore>,
    pub cache: Arc<dyn CacheStore>,
}

impl App {
    pub fn open(settings: &Settings) -> Result<Self> {
        let db = Database::open(&settings.database_path)?;
        let store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::new(db.clone()));
        let cache: Arc<dyn CacheStore> = match settings.cache_backend {
            CacheBackend::Database => {
                let removed = cache_repo::purge_expired(&db, Utc::now())?;
                if removed > 0 {
                    log::info!("Purged {} expired cache entries", removed);
                }
                Arc::new(SqliteCache::new(db.clone(), settings.cache_ttl))
            }
            CacheBackend::Memory => Arc::new(MemoryCache::new(
                settings.cache_ttl,
                settings.cache_capacity,
            )),
        };

        Ok(Self { db, store, cache })
    }

    pub fn service(&self) -> Arc<SummaryService> {
        Arc::new(SummaryService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.cache),
        ))
    }

    pub fn processor(&self, settings: &Settings) -> Result<Arc<JobProcessor>> {
        let fetcher = Fetcher::new(settings.fetch_timeout, settings.file_size_limit)?;
        let content = ContentSource::new(
            fetcher,
            Arc::new(SpiderScraper::new(settings.scraper_bin.clone())),
        );

        Ok(Arc::new(JobProcessor::new(
            Arc::clone(&self.store),
            Arc::clone(&self.cache),
            Arc::new(content),
            build_summarizer(settings)?,
            AdmissionPolicy::new(settings.word_limit),
        )
        .with_lease_timeout(settings.lease_timeout)))
    }

    pub fn close(&self) -> Result<()> {
        self.db.close()?;
        Ok(())
    }
}

pub fn build_summarizer(settings: &Settings) -> Result<Arc<dyn Summarizer>> {
    match settings.summarizer {
        SummarizerKind::OpenAi => {
            let api_key = settings
                .openai_api_key
                .as_ref()
                .map(|key| SecretString::from(key.expose_secret().to_string()))
                .ok_or_else(|| ConfigError::Missing {
                    key: "OPENAI_API_KEY",
                    reason: "required when DISTILL_SUMMARIZER is 'openai'".to_string(),
                })?;
            let summarizer = OpenAiSummarizer::new(
                api_key,
                settings.openai_base_url.clone(),
                settings.openai_model.clone(),
                SUMMARIZE_TIMEOUT,
            )?;
            Ok(Arc::new(summarizer))
        }
        SummarizerKind::Extractive => Ok(Arc::new(ExtractiveSummarizer::default())),
    }
}

pub fn worker_pool_config(settings: &Settings) -> WorkerPoolConfig {
    WorkerPoolConfig {
        concurrency: settings.worker_concurrency,
        poll_interval: settings.poll_interval,
        lease_timeout: settings.lease_timeout,
    }
}
