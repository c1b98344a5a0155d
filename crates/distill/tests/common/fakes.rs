//! Test doubles for the network-facing seams.

#![allow(dead_code)]

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::body::Body;
use axum::routing::get;
use axum::Router;

use distill::content::{AcquireError, Scraper};
use distill::summary::{SummarizeError, Summarizer};

/// Returns the same markup for every URL.
pub struct StaticScraper(pub &'static str);

#[async_trait]
impl Scraper for StaticScraper {
    async fn scrape(&self, _url: &str) -> Result<String, AcquireError> {
        Ok(self.0.to_string())
    }
}

/// Summarizes by prefixing the content, so tests can see what went in.
pub struct EchoSummarizer;

#[async_trait]
impl Summarizer for EchoSummarizer {
    async fn summarize(
        &self,
        content: &str,
        instructions: Option<&str>,
    ) -> Result<String, SummarizeError> {
        Ok(match instructions {
            Some(i) => format!("summary[{}]: {}", i, content),
            None => format!("summary: {}", content),
        })
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Serves `body` at every path and returns the bound address.
pub async fn serve_bytes(body: Vec<u8>) -> SocketAddr {
    let app = Router::new().route(
        "/*file",
        get(move || {
            let body = body.clone();
            async move { body }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Serves `chunks` blocks of `size` bytes at every path, streamed without a
/// `Content-Length` header.
pub async fn serve_chunked(chunks: usize, size: usize) -> SocketAddr {
    let app = Router::new().route(
        "/*file",
        get(move || async move {
            let parts = (0..chunks).map(move |_| Ok::<_, std::io::Error>(vec![b'x'; size]));
            Body::from_stream(futures_util::stream::iter(parts))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A `.docx` whose single text run inflates to `run_len` bytes.
pub fn inflating_docx(run_len: usize) -> Vec<u8> {
    use std::io::Write;

    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    write!(
        zip,
        "<w:document><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
        "a".repeat(run_len)
    )
    .unwrap();
    zip.finish().unwrap().into_inner()
}
