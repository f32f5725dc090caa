//! Failure taxonomy for a job's lifecycle.
//!
//! User cancellation is not represented here: it is a normal terminal
//! state (`JobState::Cancelled`), reported through
//! [`SessionObserver::on_cancelled`](crate::events::SessionObserver::on_cancelled).

use crate::api::OptimizerApiError;

/// The job could not be submitted. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to start optimization job: {message}")]
pub struct StartError {
    pub message: String,
}

/// A progress poll failed. Ends the poll loop; never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to read optimization progress: {message}")]
pub struct ProgressError {
    pub message: String,
}

/// The result could not be retrieved within the retry budget.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to fetch optimization result after {attempts} attempts: {last_error}")]
pub struct FetchError {
    pub attempts: u32,
    pub last_error: String,
}

impl From<OptimizerApiError> for StartError {
    fn from(e: OptimizerApiError) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}

impl From<OptimizerApiError> for ProgressError {
    fn from(e: OptimizerApiError) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}

/// Any failure that ends a session in `JobState::Failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Start(#[from] StartError),

    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
