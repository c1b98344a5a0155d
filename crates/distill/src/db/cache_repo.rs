//! Cache repository: key/value rows with an expiry in `cache_entries`.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{format_timestamp, Database, DatabaseError};

/// Returns the value for `key` if present and not expired at `now`.
pub fn get(db: &Database, key: &str, now: DateTime<Utc>) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let value = conn
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
                params![key, format_timestamp(now)],
                |r| r.get(0),
            )
            .optional()?;
        Ok(value)
    })
}

/// Inserts or overwrites `key`.
pub fn put(
    db: &Database,
    key: &str,
    value: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![key, value, format_timestamp(expires_at)],
        )?;
        Ok(())
    })
}

/// Deletes entries that expired at or before `now`. Returns how many were removed.
pub fn purge_expired(db: &Database, now: DateTime<Utc>) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE expires_at <= ?1",
            params![format_timestamp(now)],
        )?;
        Ok(removed)
    })
}
