//! Timer-driven progress polling for a running job.
//!
//! [`ProgressPoller::run`] waits one interval, issues a single progress
//! request, reports the outcome, and only then schedules the next wait.
//! Ticks therefore never overlap, however slow the endpoint is.
//!
//! The loop ends on the first of:
//! - terminal progress (final stage label at exactly `1.0`),
//! - a failed poll, which is reported and not retried,
//! - cancellation, which is silent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clinker_core::stage::{is_terminal, ProgressSnapshot};
use clinker_core::types::JobHandle;
use tokio_util::sync::CancellationToken;

use crate::endpoints::ProgressEndpoint;
use crate::error::ProgressError;

/// Default time between the end of one poll and the start of the next.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Receives the results of each poll tick, in completion order.
#[async_trait]
pub trait PollListener: Send + Sync {
    /// Called for every successful reading, including the terminal one.
    async fn on_progress(&self, snapshot: ProgressSnapshot);

    /// Called once when a poll fails; no further callbacks follow.
    async fn on_error(&self, error: ProgressError);
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The final stage completed; this snapshot was the last one delivered.
    Terminal(ProgressSnapshot),
    Failed(ProgressError),
    Cancelled,
}

pub struct ProgressPoller {
    endpoint: Arc<dyn ProgressEndpoint>,
    interval: Duration,
    final_stage_marker: String,
}

impl ProgressPoller {
    pub fn new(
        endpoint: Arc<dyn ProgressEndpoint>,
        interval: Duration,
        final_stage_marker: impl Into<String>,
    ) -> Self {
        Self {
            endpoint,
            interval,
            final_stage_marker: final_stage_marker.into(),
        }
    }

    /// Poll `handle` until terminal progress, failure, or cancellation.
    ///
    /// An in-flight request is allowed to finish after `cancel` fires,
    /// but its response is dropped without reaching `listener`.
    pub async fn run(
        &self,
        handle: &JobHandle,
        cancel: &CancellationToken,
        listener: &dyn PollListener,
    ) -> PollOutcome {
        let mut tick = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = tokio::time::sleep(self.interval) => {}
            }
            tick += 1;

            let result = self.endpoint.get_progress(handle).await;

            if cancel.is_cancelled() {
                tracing::debug!(
                    task_id = handle.task_id(),
                    tick,
                    "Discarding progress received after cancellation",
                );
                return PollOutcome::Cancelled;
            }

            match result {
                Ok(snapshot) => {
                    let terminal = is_terminal(&snapshot, &self.final_stage_marker);
                    tracing::debug!(
                        task_id = handle.task_id(),
                        tick,
                        stage = %snapshot.stage_description,
                        fraction = snapshot.fraction,
                        "Progress",
                    );
                    listener.on_progress(snapshot.clone()).await;
                    if terminal {
                        tracing::info!(task_id = handle.task_id(), tick, "Optimization finished");
                        return PollOutcome::Terminal(snapshot);
                    }
                }
                Err(e) => {
                    tracing::error!(task_id = handle.task_id(), tick, error = %e, "Polling error");
                    let error = ProgressError::from(e);
                    listener.on_error(error.clone()).await;
                    return PollOutcome::Failed(error);
                }
            }
        }
    }
}
