use std::path::Path;

use crate::content::extract::DocumentExtractor;
use crate::error::ProcessError;

pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor for TextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ProcessError> {
        let bytes = std::fs::read(path).map_err(|e| ProcessError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;

        // Served text files are not always UTF-8.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn supports(&self, extension: &str) -> bool {
        extension == "txt"
    }
}
