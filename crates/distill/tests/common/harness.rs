//! Test harness for isolated end-to-end runs.
//!
//! Every harness owns its own temp directory and SQLite file, so tests can
//! run in parallel and open extra connections to the same database the way
//! separate API and worker processes would.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use distill::cache::{CacheStore, SqliteCache, DEFAULT_TTL};
use distill::content::{ContentSource, Fetcher, Scraper};
use distill::db::Database;
use distill::pipeline::{AdmissionPolicy, JobProcessor};
use distill::store::{JobStore, SqliteJobStore};
use distill::summary::Summarizer;
use distill::SummaryService;

use super::fakes::{EchoSummarizer, StaticScraper};

pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub db: Database,
    pub store: Arc<SqliteJobStore>,
    pub cache: Arc<SqliteCache>,
    pub word_limit: usize,
    pub file_size_limit: u64,
    pub scraper: Arc<dyn Scraper>,
    pub summarizer: Arc<dyn Summarizer>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("distill.db");
        let db = Database::open(&db_path).expect("Failed to open database");

        Self {
            store: Arc::new(SqliteJobStore::new(db.clone())),
            cache: Arc::new(SqliteCache::new(db.clone(), DEFAULT_TTL)),
            temp_dir,
            db_path,
            db,
            word_limit: 10_000,
            file_size_limit: 2 * 1024 * 1024,
            scraper: Arc::new(StaticScraper("<p>scraped page</p>")),
            summarizer: Arc::new(EchoSummarizer),
        }
    }

    pub fn with_word_limit(mut self, limit: usize) -> Self {
        self.word_limit = limit;
        self
    }

    pub fn with_file_size_limit(mut self, limit: u64) -> Self {
        self.file_size_limit = limit;
        self
    }

    pub fn store(&self) -> Arc<dyn JobStore> {
        self.store.clone()
    }

    pub fn cache(&self) -> Arc<dyn CacheStore> {
        self.cache.clone()
    }

    /// Opens a second connection to the same file, like another process.
    pub fn open_connection(&self) -> Database {
        Database::open(&self.db_path).expect("Failed to open second connection")
    }

    pub fn service(&self) -> Arc<SummaryService> {
        Arc::new(SummaryService::new(self.store(), self.cache()))
    }

    pub fn processor(&self) -> Arc<JobProcessor> {
        let fetcher = Fetcher::new(Duration::from_secs(5), self.file_size_limit)
            .expect("Failed to build fetcher");
        let content = Arc::new(ContentSource::new(fetcher, Arc::clone(&self.scraper)));
        Arc::new(JobProcessor::new(
            self.store(),
            self.cache(),
            content,
            Arc::clone(&self.summarizer),
            AdmissionPolicy::new(self.word_limit),
        ))
    }
}
