use thiserror::Error;

use crate::content::AcquireError;
use crate::summary::SummarizeError;

use super::admission::AdmissionError;

/// Any failure after a job is claimed. Its text becomes the job's `result`.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Acquisition(#[from] AcquireError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Summarization(#[from] SummarizeError),
}
