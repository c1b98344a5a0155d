//! Word-count ceiling applied to acquired content. The byte ceiling on
//! downloads is enforced while fetching.

use thiserror::Error;

pub const DEFAULT_WORD_LIMIT: usize = 10_000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("content has {count} words, exceeds limit of {limit} words")]
    TooManyWords { count: usize, limit: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct AdmissionPolicy {
    pub word_limit: usize,
}

impl AdmissionPolicy {
    pub fn new(word_limit: usize) -> Self {
        Self { word_limit }
    }

    /// Returns the word count when within the ceiling.
    pub fn check(&self, content: &str) -> Result<usize, AdmissionError> {
        let count = word_count(content);
        if count > self.word_limit {
            return Err(AdmissionError::TooManyWords {
                count,
                limit: self.word_limit,
            });
        }
        Ok(count)
    }
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_WORD_LIMIT)
    }
}

/// Whitespace-separated tokens.
pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}
