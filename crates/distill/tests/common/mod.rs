//! Shared test utilities for distill integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a file-backed store, cache and processor in a temp dir
//! - Test doubles for the scraper and summarizer seams
//! - A tiny local HTTP server for document downloads

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::TestHarness;
