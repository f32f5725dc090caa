//! Fixed-delay retrieval of a finished job's result.
//!
//! The optimizer can report a job complete slightly before its result
//! artifact is readable. [`ResultFetcher::fetch`] absorbs that window
//! by retrying a bounded number of times with a constant delay. Any
//! transport error, non-2xx status, or undecodable payload counts as a
//! retryable failure.

use std::sync::Arc;
use std::time::Duration;

use clinker_core::normalize::{self, NormalizeError};
use clinker_core::scenario::ResultSet;
use clinker_core::types::JobHandle;
use tokio_util::sync::CancellationToken;

use crate::api::OptimizerApiError;
use crate::endpoints::ResultEndpoint;
use crate::error::FetchError;

/// Default number of fetch attempts before giving up.
pub const MAX_RETRIES: u32 = 5;

/// Default delay between fetch attempts.
pub const RETRY_DELAY: Duration = Duration::from_millis(3000);

/// Retry budget for result retrieval. No jitter, no growth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            delay: RETRY_DELAY,
        }
    }
}

/// Why a single attempt failed.
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Api(#[from] OptimizerApiError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

pub struct ResultFetcher {
    endpoint: Arc<dyn ResultEndpoint>,
    config: RetryConfig,
}

impl ResultFetcher {
    pub fn new(endpoint: Arc<dyn ResultEndpoint>, config: RetryConfig) -> Self {
        Self { endpoint, config }
    }

    /// Fetch and normalize the result of `handle`.
    ///
    /// Returns `Ok(None)` if `cancel` fires before a result is accepted;
    /// a response that arrives after cancellation is discarded.
    pub async fn fetch(
        &self,
        handle: &JobHandle,
        cancel: &CancellationToken,
    ) -> Result<Option<ResultSet>, FetchError> {
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(None),
                    _ = tokio::time::sleep(self.config.delay) => {}
                }
            }
            if cancel.is_cancelled() {
                return Ok(None);
            }

            let outcome = self.attempt(handle).await;

            if cancel.is_cancelled() {
                tracing::debug!(
                    task_id = handle.task_id(),
                    attempt,
                    "Discarding result fetched after cancellation",
                );
                return Ok(None);
            }

            match outcome {
                Ok(results) => {
                    tracing::info!(
                        task_id = handle.task_id(),
                        attempt,
                        scenarios = results.len(),
                        "Optimization result fetched",
                    );
                    return Ok(Some(results));
                }
                Err(e) => {
                    tracing::warn!(
                        task_id = handle.task_id(),
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "Result fetch attempt {attempt} failed",
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(FetchError {
            attempts: self.config.max_attempts,
            last_error,
        })
    }

    async fn attempt(&self, handle: &JobHandle) -> Result<ResultSet, AttemptError> {
        let payload = self.endpoint.get_result(handle).await?;
        Ok(normalize::normalize(payload)?)
    }
}
