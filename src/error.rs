// src/error.rs

use log::error;
use thiserror::Error;

/// Everything a scheduling operation can fail with.
///
/// All variants except `StoreUnavailable` are caller errors: they are
/// reported as-is and never leave a partial mutation behind.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no progress record found for user {user_id}: {what}")]
    NotFound { user_id: i64, what: String },

    #[error("user {user_id} is already tracking problem {problem_id}")]
    AlreadyTracked { user_id: i64, problem_id: i64 },

    #[error("problem {0} does not exist in the catalog")]
    ProblemNotFound(i64),

    #[error("invalid outcome '{0}', expected Solved or Struggling")]
    InvalidOutcome(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl SchedulerError {
    /// Short machine-readable name used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulerError::NotFound { .. } => "NotFound",
            SchedulerError::AlreadyTracked { .. } => "AlreadyTracked",
            SchedulerError::ProblemNotFound(_) => "ProblemNotFound",
            SchedulerError::InvalidOutcome(_) => "InvalidOutcome",
            SchedulerError::InvalidRequest(_) => "InvalidRequest",
            SchedulerError::StoreUnavailable(_) => "StoreUnavailable",
        }
    }

    pub fn is_caller_error(&self) -> bool {
        !matches!(self, SchedulerError::StoreUnavailable(_))
    }
}

impl From<rusqlite::Error> for SchedulerError {
    fn from(e: rusqlite::Error) -> Self {
        error!("[DB] Store failure: {}", e);
        SchedulerError::StoreUnavailable(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for SchedulerError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        error!("[DB] Connection lock poisoned");
        SchedulerError::StoreUnavailable("database connection lock poisoned".to_string())
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
