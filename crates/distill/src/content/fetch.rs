//! HTTP download of direct document URLs under a byte ceiling.

use std::time::Duration;

use super::AcquireError;

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl Fetcher {
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self, AcquireError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("distill/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AcquireError::Fetch)?;
        Ok(Self { client, max_bytes })
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Downloads `url` into memory.
    ///
    /// A declared `Content-Length` over the ceiling is rejected before the
    /// body is read; otherwise the running total is checked per chunk so an
    /// undeclared or lying length cannot exceed it either.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, AcquireError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AcquireError::Fetch)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_bytes {
                return Err(AcquireError::TooLarge {
                    size: declared,
                    limit: self.max_bytes,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(AcquireError::Fetch)? {
            let size = (body.len() + chunk.len()) as u64;
            if size > self.max_bytes {
                return Err(AcquireError::TooLarge {
                    size,
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        log::info!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
