pub mod ooxml;
pub mod pdf;
pub mod text;

use std::path::Path;

use crate::error::ProcessError;

/// Extracts plain text from a local document.
pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ProcessError>;
    fn supports(&self, extension: &str) -> bool;
}

/// Routes a document to the first extractor supporting its extension.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn DocumentExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::with_expanded_limit(ooxml::DEFAULT_EXPANDED_LIMIT)
    }

    /// `max_expanded_bytes` bounds how much XML an Office archive may
    /// inflate to during extraction.
    pub fn with_expanded_limit(max_expanded_bytes: u64) -> Self {
        Self {
            extractors: vec![
                Box::new(text::TextExtractor::new()),
                Box::new(pdf::PdfExtractor::new()),
                Box::new(ooxml::OoxmlExtractor::with_limit(max_expanded_bytes)),
            ],
        }
    }

    pub fn extract(&self, path: &Path) -> Result<String, ProcessError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        for extractor in &self.extractors {
            if extractor.supports(&extension) {
                let _span = tracing::info_span!("extract", extension = %extension).entered();
                return extractor.extract(path);
            }
        }

        Err(ProcessError::UnsupportedFormat(extension))
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
