use sigaudit_runtime::{BackendError, ExpansionError};
use sigaudit_types::{AuditorError, InvalidTarget, TargetKind, TimeRangeError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Caller input rejected before any backend call.
    #[error("Invalid parameter '{parameter}': {reason}")]
    Validation {
        parameter: &'static str,
        reason: String,
    },

    /// The lookup worked, nothing matched and no later page is left.
    #[error("No {} matched [{}] in this page of results", .kind.as_str(), .patterns.join(", "))]
    NoMatches {
        kind: TargetKind,
        patterns: Vec<String>,
        names_in_page: Vec<String>,
        /// Name-only targets without a candidate.
        unresolved: Vec<String>,
    },

    #[error(transparent)]
    Expansion(#[from] ExpansionError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Session not found or expired: {0}")]
    SessionNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(parameter: &'static str, reason: impl Into<String>) -> Self {
        Error::Validation {
            parameter,
            reason: reason.into(),
        }
    }
}

impl From<InvalidTarget> for Error {
    fn from(err: InvalidTarget) -> Self {
        Error::validation("targets", err.to_string())
    }
}

impl From<AuditorError> for Error {
    fn from(err: AuditorError) -> Self {
        Error::validation("auditors", err.to_string())
    }
}

impl From<TimeRangeError> for Error {
    fn from(err: TimeRangeError) -> Self {
        Error::validation("time_range", err.to_string())
    }
}
