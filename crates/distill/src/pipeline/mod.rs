pub mod admission;
pub mod error;
pub mod runner;

pub use admission::{AdmissionError, AdmissionPolicy};
pub use error::JobError;
pub use runner::{JobProcessor, ProcessOutcome};
