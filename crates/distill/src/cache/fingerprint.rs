//! Request fingerprints used as cache keys.

use std::fmt;

use sha2::{Digest, Sha256};

/// SHA-256 (lowercase hex) over the present request fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the cache key for a request.
///
/// Present fields are concatenated in the order `url`, `text`,
/// `instructions` with no separator; absent and empty fields contribute
/// nothing.
pub fn key_for(url: Option<&str>, text: Option<&str>, instructions: Option<&str>) -> Fingerprint {
    let mut hasher = Sha256::new();
    for part in [url, text, instructions].into_iter().flatten() {
        hasher.update(part.as_bytes());
    }
    Fingerprint(hex::encode(hasher.finalize()))
}
