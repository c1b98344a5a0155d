use async_trait::async_trait;

use super::{SummarizeError, Summarizer};

const DEFAULT_SENTENCES: usize = 3;

/// Offline summarizer returning the leading sentences of the content.
/// Custom instructions are ignored.
pub struct ExtractiveSummarizer {
    sentences: usize,
}

impl ExtractiveSummarizer {
    pub fn new(sentences: usize) -> Self {
        Self {
            sentences: sentences.max(1),
        }
    }
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self::new(DEFAULT_SENTENCES)
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(
        &self,
        content: &str,
        _instructions: Option<&str>,
    ) -> Result<String, SummarizeError> {
        let words: Vec<&str> = content.split_whitespace().collect();
        if words.is_empty() {
            return Err(SummarizeError::Empty);
        }

        let mut summary = Vec::new();
        let mut sentences = 0;
        for word in words {
            summary.push(word);
            if word.ends_with(['.', '!', '?']) {
                sentences += 1;
                if sentences == self.sentences {
                    break;
                }
            }
        }

        Ok(summary.join(" "))
    }

    fn name(&self) -> &str {
        "extractive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_takes_leading_sentences() {
        let summarizer = ExtractiveSummarizer::new(2);
        let summary = summarizer
            .summarize("One fish.  Two fish!\nRed fish? Blue fish.", None)
            .await
            .unwrap();
        assert_eq!(summary, "One fish. Two fish!");
    }

    #[tokio::test]
    async fn test_text_without_terminator_is_kept_whole() {
        let summary = ExtractiveSummarizer::default()
            .summarize("hello world", Some("ignored"))
            .await
            .unwrap();
        assert_eq!(summary, "hello world");
    }

    #[tokio::test]
    async fn test_blank_content() {
        assert!(matches!(
            ExtractiveSummarizer::default().summarize("  \n ", None).await,
            Err(SummarizeError::Empty)
        ));
    }
}
