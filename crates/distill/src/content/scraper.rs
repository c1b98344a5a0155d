//! Web page scraping through an external command.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use super::AcquireError;

/// Returns the raw markup of a web page.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<String, AcquireError>;
}

/// Runs `spider --url <url> --budget "*,1" scrape --output-html` and takes
/// its stdout as the page markup.
pub struct SpiderScraper {
    program: PathBuf,
}

impl SpiderScraper {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Scraper for SpiderScraper {
    async fn scrape(&self, url: &str) -> Result<String, AcquireError> {
        log::info!("Scraping {}", url);

        let output = Command::new(&self.program)
            .args(["--url", url, "--budget", "*,1", "scrape", "--output-html"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AcquireError::ScraperUnavailable {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::error!(
                "Scraper exited with {:?} for {}: {}",
                output.status.code(),
                url,
                stderr
            );
            return Err(AcquireError::ScraperFailed {
                code: output.status.code(),
                stderr,
            });
        }

        let html = String::from_utf8_lossy(&output.stdout).into_owned();
        log::info!("Scraped {} characters", html.len());
        Ok(html)
    }
}
