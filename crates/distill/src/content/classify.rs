//! URL classification: direct document download or web page.

use url::Url;

/// Extensions (lowercase, no dot) that mark a URL as a direct document.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "pptx", "ppt", "docx", "doc", "txt", "xlsx", "xls"];

/// Extensions that are accepted at submission and scraped as web pages.
pub const PAGE_EXTENSIONS: &[&str] = &["html", "htm"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlKind {
    Document { extension: String },
    WebPage,
}

/// Classifies by the extension of the URL path. Query and fragment are
/// ignored; extensionless or unparseable URLs are web pages.
pub fn classify(url: &str) -> UrlKind {
    match path_extension(url) {
        Some(ext) if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) => {
            UrlKind::Document { extension: ext }
        }
        _ => UrlKind::WebPage,
    }
}

/// Lowercased extension of the last path segment, trailing slashes removed.
pub fn path_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path().to_lowercase();
    let name = path.trim_end_matches('/').rsplit('/').next()?;
    // A leading dot names a hidden file, not an extension.
    let (_, ext) = name.trim_start_matches('.').rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_string())
}
