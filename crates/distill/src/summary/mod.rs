//! Summarization backends.

pub mod extractive;
pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

pub use extractive::ExtractiveSummarizer;
pub use openai::OpenAiSummarizer;

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("Summarization request timed out")]
    Timeout,

    #[error("Summarization request failed: {0}")]
    Request(String),

    #[error("Summarization API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Invalid summarization response: {0}")]
    InvalidResponse(String),

    #[error("Summarizer returned an empty summary")]
    Empty,
}

/// Turns acquired content plus optional instructions into a summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        content: &str,
        instructions: Option<&str>,
    ) -> Result<String, SummarizeError>;

    fn name(&self) -> &str;
}
