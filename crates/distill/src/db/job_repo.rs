//! Job repository: queue operations on the `jobs` table.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};

use super::{format_timestamp, now_timestamp, Database, DatabaseError};
use crate::job::{ClaimedJob, JobId, JobInput, JobOutcome, JobStatus};

fn parse_status(s: &str) -> Result<JobStatus, DatabaseError> {
    s.parse().map_err(|e: crate::job::UnknownStatus| DatabaseError::CorruptRow {
        table: "jobs",
        reason: e.to_string(),
    })
}

/// `status IN (...)` over the states `next` may be entered from, or `None`
/// when no state leads there. Values come from [`JobStatus::as_str`].
fn source_guard(next: JobStatus) -> Option<String> {
    let sources = JobStatus::sources_of(next);
    if sources.is_empty() {
        return None;
    }
    let list = sources
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!("status IN ({})", list))
}

fn to_millis(ms: Option<u64>) -> Option<i64> {
    ms.map(|v| i64::try_from(v).unwrap_or(i64::MAX))
}

/// Inserts a new job in `todo`.
pub fn insert_todo(db: &Database, input: &JobInput) -> Result<JobId, DatabaseError> {
    insert(db, input, JobStatus::Todo, None)
}

/// Inserts a job that is already `success` with the given result. No
/// processing time is recorded.
pub fn insert_with_result(
    db: &Database,
    input: &JobInput,
    result: &str,
) -> Result<JobId, DatabaseError> {
    insert(db, input, JobStatus::Success, Some(result))
}

fn insert(
    db: &Database,
    input: &JobInput,
    status: JobStatus,
    result: Option<&str>,
) -> Result<JobId, DatabaseError> {
    db.with_conn(|conn| {
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO jobs (url, text, custom_instructions, status, result, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                input.url,
                input.text,
                input.custom_instructions,
                status.as_str(),
                result,
                now,
            ],
        )?;
        Ok(JobId(conn.last_insert_rowid()))
    })
}

/// Atomically moves the oldest `todo` job to `in_progress` and returns it.
///
/// The select and the update are one statement inside an immediate
/// transaction, so the write lock is held from selection to update and no
/// other connection (in this process or another) can claim the same row.
/// The `status = 'todo'` guard on the update makes the claim a
/// compare-and-swap even if the subquery were evaluated early.
pub fn claim_next(db: &Database) -> Result<Option<ClaimedJob>, DatabaseError> {
    db.with_conn(|conn| {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        let now = now_timestamp();
        let claimed = tx
            .query_row(
                "UPDATE jobs
                 SET status = ?2, updated_at = ?1, claimed_at = ?1
                 WHERE id = (
                     SELECT id FROM jobs
                     WHERE status = ?3
                     ORDER BY created_at, id
                     LIMIT 1
                 )
                 AND status = ?3
                 RETURNING id, url, text, custom_instructions",
                params![now, JobStatus::InProgress.as_str(), JobStatus::Todo.as_str()],
                |row| {
                    Ok(ClaimedJob {
                        id: JobId(row.get(0)?),
                        input: JobInput {
                            url: row.get(1)?,
                            text: row.get(2)?,
                            custom_instructions: row.get(3)?,
                        },
                    })
                },
            )
            .optional()?;
        tx.commit()?;
        Ok(claimed)
    })
}

/// Moves a job to `status` if its current state allows that edge. Returns
/// `false` when the row is missing or in a state that cannot reach `status`.
pub fn update_status(db: &Database, id: JobId, status: JobStatus) -> Result<bool, DatabaseError> {
    let Some(guard) = source_guard(status) else {
        return Err(DatabaseError::IllegalTransition {
            to: status,
            reason: "no state leads here",
        });
    };
    db.with_conn(|conn| {
        let changed = conn.execute(
            &format!(
                "UPDATE jobs SET status = ?2, updated_at = ?3 WHERE id = ?1 AND {}",
                guard
            ),
            params![id.0, status.as_str(), now_timestamp()],
        )?;
        Ok(changed == 1)
    })
}

/// Writes the terminal status, result and processing time of a job and
/// releases its lease. Only an `in_progress` job can finish; returns
/// `false` when the row is missing or in any other state.
pub fn update_result(
    db: &Database,
    id: JobId,
    status: JobStatus,
    result: &str,
    processing_time_ms: Option<u64>,
) -> Result<bool, DatabaseError> {
    if !status.is_terminal() {
        return Err(DatabaseError::IllegalTransition {
            to: status,
            reason: "results are only recorded with a terminal status",
        });
    }
    let Some(guard) = source_guard(status) else {
        return Err(DatabaseError::IllegalTransition {
            to: status,
            reason: "no state leads here",
        });
    };
    db.with_conn(|conn| {
        let changed = conn.execute(
            &format!(
                "UPDATE jobs
                 SET status = ?2, result = ?3, processing_time_ms = ?4, updated_at = ?5, claimed_at = NULL
                 WHERE id = ?1 AND {}",
                guard
            ),
            params![
                id.0,
                status.as_str(),
                result,
                to_millis(processing_time_ms),
                now_timestamp()
            ],
        )?;
        Ok(changed == 1)
    })
}

pub fn find_status(db: &Database, id: JobId) -> Result<Option<JobStatus>, DatabaseError> {
    let status: Option<String> = db.with_conn(|conn| {
        Ok(conn
            .query_row("SELECT status FROM jobs WHERE id = ?1", params![id.0], |r| r.get(0))
            .optional()?)
    })?;
    status.as_deref().map(parse_status).transpose()
}

pub fn find_outcome(db: &Database, id: JobId) -> Result<Option<JobOutcome>, DatabaseError> {
    let row: Option<(String, Option<String>, Option<i64>)> = db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT status, result, processing_time_ms FROM jobs WHERE id = ?1",
                params![id.0],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?)
    })?;

    row.map(|(status, result, ms)| {
        Ok(JobOutcome {
            status: parse_status(&status)?,
            result,
            processing_time_ms: ms.and_then(|v| u64::try_from(v).ok()),
        })
    })
    .transpose()
}

/// Refreshes the lease of an `in_progress` job so lease recovery leaves it
/// alone. Returns `false` once the job is no longer held.
pub fn renew_lease(db: &Database, id: JobId) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET claimed_at = ?2
             WHERE id = ?1 AND status = ?3 AND claimed_at IS NOT NULL",
            params![id.0, now_timestamp(), JobStatus::InProgress.as_str()],
        )?;
        Ok(changed == 1)
    })
}

/// Returns `in_progress` jobs claimed before `cutoff` to `todo`. This is
/// lease recovery, the one move outside [`JobStatus::can_transition_to`].
pub fn reclaim_stale(db: &Database, cutoff: DateTime<Utc>) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET status = ?3, claimed_at = NULL, updated_at = ?2
             WHERE status = ?4 AND claimed_at IS NOT NULL AND claimed_at < ?1",
            params![
                format_timestamp(cutoff),
                now_timestamp(),
                JobStatus::Todo.as_str(),
                JobStatus::InProgress.as_str()
            ],
        )?;
        Ok(changed)
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: JobStatus) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status.as_str()],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
