//! Settings read once from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::db::default_database_path;
use crate::error::ConfigError;
use crate::logging::LogFormat;
use crate::summary::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;
pub const DEFAULT_WORD_LIMIT: usize = 10_000;
pub const DEFAULT_FILE_SIZE_LIMIT: u64 = 2 * 1024 * 1024;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SCRAPER_BIN: &str = "spider";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Rows in the shared database, visible to every process.
    Database,
    /// Process-local moka cache.
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "database" | "sqlite" => Ok(CacheBackend::Database),
            "memory" => Ok(CacheBackend::Memory),
            other => Err(format!("expected 'database' or 'memory', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarizerKind {
    OpenAi,
    Extractive,
}

impl FromStr for SummarizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(SummarizerKind::OpenAi),
            "extractive" => Ok(SummarizerKind::Extractive),
            other => Err(format!("expected 'openai' or 'extractive', got '{}'", other)),
        }
    }
}

#[derive(Debug)]
pub struct Settings {
    pub database_path: PathBuf,
    pub cache_ttl: Duration,
    pub cache_backend: CacheBackend,
    pub cache_capacity: u64,
    pub word_limit: usize,
    pub file_size_limit: u64,
    pub poll_interval: Duration,
    pub lease_timeout: Option<Duration>,
    pub worker_concurrency: usize,
    pub fetch_timeout: Duration,
    pub scraper_bin: PathBuf,
    pub summarizer: SummarizerKind,
    pub openai_model: String,
    pub openai_base_url: String,
    pub openai_api_key: Option<SecretString>,
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Unset and blank values
    /// take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_path = match get("DISTILL_DATABASE_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_database_path().ok_or(ConfigError::NoDefaultDatabasePath)?,
        };

        let summarizer = parse_or(&get, "DISTILL_SUMMARIZER", SummarizerKind::OpenAi)?;
        // Checked when a worker builds its summarizer; the API never needs it.
        let openai_api_key = get("OPENAI_API_KEY").map(SecretString::from);

        let worker_concurrency = parse_or(&get, "DISTILL_WORKER_CONCURRENCY", 1usize)?;
        if worker_concurrency == 0 {
            return Err(invalid("DISTILL_WORKER_CONCURRENCY", "0", "must be at least 1"));
        }

        let poll_interval_ms = parse_or(&get, "DISTILL_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        if poll_interval_ms == 0 {
            return Err(invalid("DISTILL_POLL_INTERVAL_MS", "0", "must be positive"));
        }

        let lease_timeout = match get("DISTILL_LEASE_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = parse_value("DISTILL_LEASE_TIMEOUT_SECS", &raw)?;
                if secs == 0 {
                    return Err(invalid("DISTILL_LEASE_TIMEOUT_SECS", &raw, "must be positive"));
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            database_path,
            cache_ttl: Duration::from_secs(parse_or(
                &get,
                "DISTILL_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            cache_backend: parse_or(&get, "DISTILL_CACHE_BACKEND", CacheBackend::Database)?,
            cache_capacity: parse_or(&get, "DISTILL_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?,
            word_limit: parse_or(&get, "DISTILL_WORD_LIMIT", DEFAULT_WORD_LIMIT)?,
            file_size_limit: parse_or(&get, "DISTILL_FILE_SIZE_LIMIT", DEFAULT_FILE_SIZE_LIMIT)?,
            poll_interval: Duration::from_millis(poll_interval_ms),
            lease_timeout,
            worker_concurrency,
            fetch_timeout: Duration::from_secs(parse_or(
                &get,
                "DISTILL_FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            )?),
            scraper_bin: get("DISTILL_SCRAPER_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRAPER_BIN)),
            summarizer,
            openai_model: get("DISTILL_OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai_base_url: get("DISTILL_OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            openai_api_key,
            bind_addr: match get("DISTILL_BIND_ADDR") {
                Some(raw) => parse_value("DISTILL_BIND_ADDR", &raw)?,
                None => parse_value("DISTILL_BIND_ADDR", DEFAULT_BIND_ADDR)?,
            },
            log_format: parse_or(&get, "DISTILL_LOG_FORMAT", LogFormat::Pretty)?,
        })
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, raw, &e.to_string()))
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DISTILL_DATABASE_PATH", "/tmp/distill.db"),
        ])
        .unwrap();

        assert_eq!(s.database_path, PathBuf::from("/tmp/distill.db"));
        assert_eq!(s.cache_ttl, Duration::from_secs(3600));
        assert_eq!(s.cache_backend, CacheBackend::Database);
        assert_eq!(s.word_limit, 10_000);
        assert_eq!(s.file_size_limit, 2_097_152);
        assert_eq!(s.poll_interval, Duration::from_secs(2));
        assert_eq!(s.lease_timeout, None);
        assert_eq!(s.worker_concurrency, 1);
        assert_eq!(s.scraper_bin, PathBuf::from("spider"));
        assert_eq!(s.summarizer, SummarizerKind::OpenAi);
        assert_eq!(s.openai_model, "gpt-4o-mini");
        assert_eq!(s.bind_addr, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(s.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            ("DISTILL_SUMMARIZER", "extractive"),
            ("DISTILL_DATABASE_PATH", "/data/q.db"),
            ("DISTILL_CACHE_TTL_SECS", "60"),
            ("DISTILL_CACHE_BACKEND", "memory"),
            ("DISTILL_WORD_LIMIT", "500"),
            ("DISTILL_FILE_SIZE_LIMIT", "1024"),
            ("DISTILL_POLL_INTERVAL_MS", "250"),
            ("DISTILL_LEASE_TIMEOUT_SECS", "600"),
            ("DISTILL_WORKER_CONCURRENCY", "4"),
            ("DISTILL_BIND_ADDR", "0.0.0.0:9000"),
            ("DISTILL_LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(s.summarizer, SummarizerKind::Extractive);
        assert!(s.openai_api_key.is_none());
        assert_eq!(s.cache_ttl, Duration::from_secs(60));
        assert_eq!(s.cache_backend, CacheBackend::Memory);
        assert_eq!(s.word_limit, 500);
        assert_eq!(s.file_size_limit, 1024);
        assert_eq!(s.poll_interval, Duration::from_millis(250));
        assert_eq!(s.lease_timeout, Some(Duration::from_secs(600)));
        assert_eq!(s.worker_concurrency, 4);
        assert_eq!(s.bind_addr.port(), 9000);
        assert_eq!(s.log_format, LogFormat::Json);
    }

    #[test]
    fn test_openai_key_is_optional_at_load() {
        let settings = settings(&[("DISTILL_DATABASE_PATH", "/tmp/x.db")]).unwrap();
        assert_eq!(settings.summarizer, SummarizerKind::OpenAi);
        assert!(settings.openai_api_key.is_none());
    }

    #[test]
    fn test_invalid_number() {
        let result = settings(&[
            ("DISTILL_SUMMARIZER", "extractive"),
            ("DISTILL_DATABASE_PATH", "/tmp/x.db"),
            ("DISTILL_WORD_LIMIT", "lots"),
        ]);
        match result {
            Err(ConfigError::InvalidValue { key, value, .. }) => {
                assert_eq!(key, "DISTILL_WORD_LIMIT");
                assert_eq!(value, "lots");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_concurrency_and_lease_rejected() {
        let base = [
            ("DISTILL_SUMMARIZER", "extractive"),
            ("DISTILL_DATABASE_PATH", "/tmp/x.db"),
        ];
        let mut vars = base.to_vec();
        vars.push(("DISTILL_WORKER_CONCURRENCY", "0"));
        assert!(settings(&vars).is_err());

        let mut vars = base.to_vec();
        vars.push(("DISTILL_LEASE_TIMEOUT_SECS", "0"));
        assert!(settings(&vars).is_err());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let s = settings(&[
            ("DISTILL_SUMMARIZER", "extractive"),
            ("DISTILL_DATABASE_PATH", "/tmp/x.db"),
            ("DISTILL_CACHE_TTL_SECS", "  "),
        ])
        .unwrap();
        assert_eq!(s.cache_ttl, Duration::from_secs(3600));
    }

    // Tests that modify environment variables must run serially
    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("DISTILL_SUMMARIZER", "extractive");
        std::env::set_var("DISTILL_DATABASE_PATH", "/tmp/env.db");
        std::env::set_var("DISTILL_WORD_LIMIT", "42");

        let s = Settings::from_env().unwrap();
        assert_eq!(s.word_limit, 42);
        assert_eq!(s.database_path, PathBuf::from("/tmp/env.db"));

        std::env::remove_var("DISTILL_SUMMARIZER");
        std::env::remove_var("DISTILL_DATABASE_PATH");
        std::env::remove_var("DISTILL_WORD_LIMIT");
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_backend() {
        std::env::set_var("DISTILL_SUMMARIZER", "extractive");
        std::env::set_var("DISTILL_DATABASE_PATH", "/tmp/env.db");
        std::env::set_var("DISTILL_CACHE_BACKEND", "redis");

        assert!(matches!(
            Settings::from_env(),
            Err(ConfigError::InvalidValue {
                key: "DISTILL_CACHE_BACKEND",
                ..
            })
        ));

        std::env::remove_var("DISTILL_SUMMARIZER");
        std::env::remove_var("DISTILL_DATABASE_PATH");
        std::env::remove_var("DISTILL_CACHE_BACKEND");
    }
}
