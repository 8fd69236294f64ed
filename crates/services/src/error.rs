//! Shared error types for the services crate.

use thiserror::Error;

use campus_core::ValidationError;
use campus_core::model::QuizAttemptError;
use campus_core::quiz_session::QuizSessionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::advisor::AdvisorConfigError;

/// Errors emitted by the AI advisor client. Callers always recover from these
/// with a canned fallback.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdvisorError {
    #[error("advisor is not configured")]
    Disabled,
    #[error("advisor returned an empty response")]
    EmptyResponse,
    #[error("advisor request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("advisor response could not be used: {0}")]
    Malformed(String),
}

/// Errors emitted by the learning, gamification and quiz services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Quiz(#[from] QuizSessionError),
    #[error("quiz has not reached its results yet")]
    QuizInProgress,
    #[error(transparent)]
    Attempt(#[from] QuizAttemptError),
}

impl ServiceError {
    /// Map a storage miss onto a named `NotFound`.
    pub(crate) fn missing(what: &'static str) -> impl FnOnce(StorageError) -> Self {
        move |err| match err {
            StorageError::NotFound => Self::NotFound(what),
            other => Self::Storage(other),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    AdvisorConfig(#[from] AdvisorConfigError),
}
