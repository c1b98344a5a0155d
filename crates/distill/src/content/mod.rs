//! Content acquisition: turns a job's `url` or `text` into plain text.
//!
//! Document URLs are downloaded under a byte ceiling, written to a
//! temporary file for extraction and removed again; other URLs are
//! scraped and reduced to text; `text` is used verbatim.

pub mod classify;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod scraper;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::error::ProcessError;
use crate::job::JobInput;

pub use classify::{classify, UrlKind};
pub use extract::{DocumentExtractor, ExtractorRegistry};
pub use fetch::Fetcher;
pub use scraper::{Scraper, SpiderScraper};

#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("file size {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("Failed to fetch document: {0}")]
    Fetch(#[source] reqwest::Error),

    #[error("Fetching {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to run scraper '{program}': {source}")]
    ScraperUnavailable {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scraping failed with code {}: {stderr}", exit_label(.code))]
    ScraperFailed { code: Option<i32>, stderr: String },

    #[error("No content extracted from {0}")]
    EmptyContent(String),

    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ProcessError),

    #[error("Job has neither a url nor text")]
    MissingInput,

    #[error("Temporary file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction task failed: {0}")]
    TaskFailed(String),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}

/// How far an Office document's XML may inflate past the download ceiling.
const EXPANSION_FACTOR: u64 = 32;

/// Acquires the text a job should be summarized from.
pub struct ContentSource {
    fetcher: Fetcher,
    scraper: Arc<dyn Scraper>,
    extractors: Arc<ExtractorRegistry>,
}

impl ContentSource {
    pub fn new(fetcher: Fetcher, scraper: Arc<dyn Scraper>) -> Self {
        let expanded_limit = fetcher.max_bytes().saturating_mul(EXPANSION_FACTOR);
        Self {
            fetcher,
            scraper,
            extractors: Arc::new(ExtractorRegistry::with_expanded_limit(expanded_limit)),
        }
    }

    pub async fn acquire(&self, input: &JobInput) -> Result<String, AcquireError> {
        match (&input.url, &input.text) {
            (Some(url), _) => match classify(url) {
                UrlKind::Document { extension } => self.acquire_document(url, &extension).await,
                UrlKind::WebPage => self.acquire_page(url).await,
            },
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => Err(AcquireError::MissingInput),
        }
    }

    async fn acquire_document(&self, url: &str, extension: &str) -> Result<String, AcquireError> {
        log::info!("Detected document URL ({}), downloading {}", extension, url);
        let bytes = self.fetcher.fetch(url).await?;

        let extractors = Arc::clone(&self.extractors);
        let suffix = format!(".{}", extension);
        let text = tokio::task::spawn_blocking(move || -> Result<String, AcquireError> {
            // Removed when dropped, on success and on every error path.
            let mut file = tempfile::Builder::new()
                .prefix("distill-")
                .suffix(&suffix)
                .tempfile()?;
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(extractors.extract(file.path())?)
        })
        .await
        .map_err(|e| AcquireError::TaskFailed(e.to_string()))??;

        if text.trim().is_empty() {
            return Err(AcquireError::EmptyContent(url.to_string()));
        }
        Ok(text)
    }

    async fn acquire_page(&self, url: &str) -> Result<String, AcquireError> {
        log::info!("Processing {} as a web page", url);
        let markup = self.scraper.scrape(url).await?;
        let text = html::html_to_text(&markup);
        log::info!("Extracted {} characters of text", text.len());
        if text.is_empty() {
            return Err(AcquireError::EmptyContent(url.to_string()));
        }
        Ok(text)
    }
}
