use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A required solver input slot is missing or has the wrong channel count.
    #[error("{slot} needs to be initialised prior to calling {operation}")]
    NotConfigured {
        slot: &'static str,
        operation: &'static str,
    },

    /// Mismatched sampling shapes, vector lengths, or a missing channel.
    #[error("data shape mismatch: {0}")]
    DataShape(String),

    /// A scalar argument lies outside its documented range.
    #[error("{0}")]
    DomainRange(String),

    /// A database file could not be read or parsed.
    #[error("failed to load '{}': {reason}", path.display())]
    LoadFailure { path: PathBuf, reason: String },

    /// The IDT optimiser terminated without a successful step.
    #[error("the IDT fit terminated without a successful step")]
    SolveFailed,

    /// A camera or illuminant search returned no matching candidate.
    #[error("no match found for {0}")]
    Unmatched(String),
}

impl Error {
    pub(crate) fn load_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::LoadFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
