//! Job domain types and the job state machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier assigned by the job store at insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a job.
///
/// `Todo` is the normal initial state. `Success` is also a valid initial
/// state for jobs answered from the cache. `Success` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Todo,
    InProgress,
    Success,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Todo,
        JobStatus::InProgress,
        JobStatus::Success,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Todo => "todo",
            JobStatus::InProgress => "in_progress",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            JobStatus::Success | JobStatus::Failed => true,
            JobStatus::Todo | JobStatus::InProgress => false,
        }
    }

    /// Whether moving from `self` to `next` is a legal edge.
    ///
    /// `InProgress -> InProgress` is allowed so a worker may re-assert the
    /// state it already holds after claiming. `InProgress -> Todo` is only
    /// performed by lease recovery, never by a worker.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Todo, JobStatus::InProgress) => true,
            (JobStatus::InProgress, JobStatus::InProgress) => true,
            (JobStatus::InProgress, JobStatus::Success | JobStatus::Failed) => true,
            (JobStatus::InProgress, JobStatus::Todo) => false,
            (JobStatus::Todo, JobStatus::Todo | JobStatus::Success | JobStatus::Failed) => false,
            (JobStatus::Success | JobStatus::Failed, _) => false,
        }
    }

    /// States from which `next` may be entered, in declaration order.
    pub fn sources_of(next: JobStatus) -> Vec<JobStatus> {
        Self::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(next))
            .collect()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown job status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(JobStatus::Todo),
            "in_progress" => Ok(JobStatus::InProgress),
            "success" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// The persisted inputs of a job. Exactly one of `url` / `text` is set
/// for jobs created through the submission path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInput {
    pub url: Option<String>,
    pub text: Option<String>,
    pub custom_instructions: Option<String>,
}

impl JobInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.custom_instructions = Some(instructions.into());
        self
    }
}

/// A job handed to a worker by `claim_next`. Holding one is the lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedJob {
    pub id: JobId,
    pub input: JobInput,
}

/// Status and result fields of a job as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub status: JobStatus,
    pub result: Option<String>,
    pub processing_time_ms: Option<u64>,
}
