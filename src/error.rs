//! Error types for Elidune circulation

use thiserror::Error;

/// Numeric error codes, stable across releases for API and audit consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    BadValue = 18,
    NoSuchData = 20,
    NoAction = 30,
    InvalidTransition = 31,
    Conflict = 32,
    Configuration = 33,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The decision table found nothing to do; not a failure for the caller
    #[error("No circulation action performed: {0}")]
    NoActionPerformed(String),

    #[error("Action denied: {}", .0.join("; "))]
    ActionDenied(Vec<String>),

    /// Action undefined for the current loan states; an integration bug
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Item aggregate changed between read and write; re-read and retry
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NoActionPerformed(_) => ErrorCode::NoAction,
            AppError::ActionDenied(_) => ErrorCode::NotAuthorized,
            AppError::InvalidTransition(_) => ErrorCode::InvalidTransition,
            AppError::ConcurrencyConflict(_) => ErrorCode::Conflict,
            AppError::Configuration(_) => ErrorCode::Configuration,
            AppError::NotFound(_) => ErrorCode::NoSuchData,
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }

    /// Only a version conflict is worth retrying as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ConcurrencyConflict(_))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Configuration(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
