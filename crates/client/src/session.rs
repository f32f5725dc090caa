//! Lifecycle façade for one optimization job at a time.
//!
//! [`TaskSession`] drives a job through
//! `Starting -> Running -> Fetching -> Ready`, landing in `Failed` or
//! `Cancelled` when something goes wrong or the caller gives up. Each
//! start spawns a background task tagged with a generation number;
//! every state change and callback is checked against the current
//! generation under the state lock, so a retired task can never touch
//! the session again.

use std::sync::Arc;

use async_trait::async_trait;
use clinker_core::busy::{BusyCounter, BusyGuard};
use clinker_core::compare::{compare, ComparisonRow, MetricGroup};
use clinker_core::scenario::ResultSet;
use clinker_core::stage::{ProgressSnapshot, StageTracker};
use clinker_core::types::{JobHandle, JobState};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::endpoints::{Endpoints, JobParameters};
use crate::error::{ProgressError, SessionError, StartError};
use crate::events::SessionObserver;
use crate::fetcher::ResultFetcher;
use crate::poller::{PollListener, PollOutcome, ProgressPoller};

/// Owns at most one job and its in-memory results.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct TaskSession {
    inner: Arc<RwLock<SessionInner>>,
    endpoints: Endpoints,
    config: ClientConfig,
    busy: BusyCounter,
}

/// Mutable session state, guarded by one lock.
struct SessionInner {
    generation: u64,
    state: JobState,
    handle: Option<JobHandle>,
    tracker: StageTracker,
    results: Option<ResultSet>,
    observer: Option<Arc<dyn SessionObserver>>,
    cancel: CancellationToken,
    /// Held while the current job is in flight.
    busy: Option<BusyGuard>,
    /// Background tasks not yet joined, including retired ones.
    tasks: Vec<JoinHandle<()>>,
}

impl SessionInner {
    /// Cancel the in-flight job, if any, and notify its observer.
    fn retire(&mut self) -> bool {
        self.cancel.cancel();
        if !self.state.is_in_flight() {
            return false;
        }
        self.state = JobState::Cancelled;
        self.busy = None;
        if let Some(observer) = &self.observer {
            observer.on_cancelled();
        }
        true
    }
}

impl TaskSession {
    pub fn new(endpoints: Endpoints, config: ClientConfig) -> Self {
        Self::with_busy_counter(endpoints, config, BusyCounter::new())
    }

    /// Create a session that reports in-flight work on a shared counter.
    pub fn with_busy_counter(endpoints: Endpoints, config: ClientConfig, busy: BusyCounter) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionInner {
                generation: 0,
                state: JobState::Idle,
                handle: None,
                tracker: StageTracker::new(),
                results: None,
                observer: None,
                cancel: CancellationToken::new(),
                busy: None,
                tasks: Vec::new(),
            })),
            endpoints,
            config,
            busy,
        }
    }

    /// Start a job, retiring any job still in flight.
    ///
    /// Returns once the job is scheduled; progress and the outcome are
    /// reported to `observer`.
    pub async fn start(
        &self,
        handle: JobHandle,
        parameters: JobParameters,
        observer: Arc<dyn SessionObserver>,
    ) {
        let mut inner = self.inner.write().await;

        if inner.retire() {
            tracing::info!(
                task_id = inner.handle.as_ref().map(JobHandle::task_id),
                "Retired in-flight job before starting a new one",
            );
        }

        inner.generation += 1;
        inner.state = JobState::Starting;
        inner.handle = Some(handle.clone());
        inner.tracker.reset();
        inner.results = None;
        inner.observer = Some(observer.clone());
        inner.cancel = CancellationToken::new();
        inner.busy = Some(self.busy.enter());

        let run = JobRun {
            inner: Arc::clone(&self.inner),
            generation: inner.generation,
            observer,
        };
        let ctx = RunContext {
            handle,
            parameters,
            endpoints: self.endpoints.clone(),
            config: self.config.clone(),
            cancel: inner.cancel.clone(),
        };

        tracing::info!(
            uid = ctx.handle.uid(),
            task_id = ctx.handle.task_id(),
            company_id = ctx.handle.company_id(),
            generation = run.generation,
            "Starting optimization job",
        );

        inner.tasks.retain(|task| !task.is_finished());
        inner.tasks.push(tokio::spawn(drive(run, ctx)));
    }

    /// Cancel the current job. Returns whether a job was in flight.
    ///
    /// Cancellation is cooperative: an outstanding request completes in
    /// the background but its response is discarded.
    pub async fn cancel(&self) -> bool {
        let mut inner = self.inner.write().await;
        let cancelled = inner.retire();
        if cancelled {
            tracing::info!(
                task_id = inner.handle.as_ref().map(JobHandle::task_id),
                "Optimization job cancelled",
            );
        }
        cancelled
    }

    /// Cancel any job and discard all session state.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.retire();
        inner.generation += 1;
        inner.state = JobState::Idle;
        inner.handle = None;
        inner.tracker.reset();
        inner.results = None;
        inner.observer = None;
        inner.busy = None;
    }

    /// Wait for every background task started so far to exit.
    ///
    /// Retired tasks are included: a cancelled job's task lingers until
    /// its outstanding request returns.
    pub async fn wait(&self) {
        let tasks = std::mem::take(&mut self.inner.write().await.tasks);
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Session task panicked");
            }
        }
    }

    pub async fn state(&self) -> JobState {
        self.inner.read().await.state
    }

    pub async fn handle(&self) -> Option<JobHandle> {
        self.inner.read().await.handle.clone()
    }

    /// The latest (clamped) progress reading.
    pub async fn current_stage(&self) -> ProgressSnapshot {
        self.inner.read().await.tracker.current()
    }

    /// The stored results, once the session is `Ready`.
    pub async fn results(&self) -> Option<ResultSet> {
        self.inner.read().await.results.clone()
    }

    /// Compare the stored results, if any.
    pub async fn compare(&self, group: MetricGroup, amplify: bool) -> Option<Vec<ComparisonRow>> {
        let inner = self.inner.read().await;
        inner
            .results
            .as_ref()
            .map(|results| compare(results, group, amplify))
    }

    pub fn busy(&self) -> &BusyCounter {
        &self.busy
    }
}

// ---- background job ----

/// Everything the background task needs besides session state.
struct RunContext {
    handle: JobHandle,
    parameters: JobParameters,
    endpoints: Endpoints,
    config: ClientConfig,
    cancel: CancellationToken,
}

/// Generation-scoped access to session state for one job.
struct JobRun {
    inner: Arc<RwLock<SessionInner>>,
    generation: u64,
    observer: Arc<dyn SessionObserver>,
}

impl JobRun {
    /// Move `from -> to` if this job is still current and in `from`.
    async fn transition(&self, from: JobState, to: JobState) -> bool {
        let mut inner = self.inner.write().await;
        if inner.generation != self.generation || inner.state != from {
            return false;
        }
        inner.state = to;
        tracing::debug!(generation = self.generation, %from, %to, "Session transition");
        true
    }

    async fn fail(&self, error: SessionError) {
        let mut inner = self.inner.write().await;
        if inner.generation != self.generation || !inner.state.is_in_flight() {
            return;
        }
        tracing::error!(generation = self.generation, error = %error, "Optimization job failed");
        inner.state = JobState::Failed;
        inner.busy = None;
        self.observer.on_error(&error);
    }

    async fn complete(&self, results: ResultSet) {
        let mut inner = self.inner.write().await;
        if inner.generation != self.generation || inner.state != JobState::Fetching {
            return;
        }
        tracing::info!(
            generation = self.generation,
            scenarios = results.len(),
            "Optimization result ready",
        );
        inner.state = JobState::Ready;
        inner.busy = None;
        self.observer.on_result(&results);
        inner.results = Some(results);
    }
}

#[async_trait]
impl PollListener for JobRun {
    async fn on_progress(&self, snapshot: ProgressSnapshot) {
        let mut inner = self.inner.write().await;
        if inner.generation != self.generation || inner.state != JobState::Running {
            return;
        }
        if !snapshot.is_in_range() {
            tracing::warn!(
                stage = %snapshot.stage_description,
                fraction = snapshot.fraction,
                "Clamping out-of-range progress fraction",
            );
        }
        inner.tracker.update(snapshot);
        let current = inner.tracker.current();
        self.observer.on_stage(&current);
    }

    async fn on_error(&self, error: ProgressError) {
        self.fail(error.into()).await;
    }
}

/// Run one job from start request to a terminal state.
async fn drive(run: JobRun, ctx: RunContext) {
    let started = ctx
        .endpoints
        .start
        .start(&ctx.handle, &ctx.parameters)
        .await;
    if ctx.cancel.is_cancelled() {
        return;
    }
    if let Err(e) = started {
        run.fail(StartError::from(e).into()).await;
        return;
    }
    if !run.transition(JobState::Starting, JobState::Running).await {
        return;
    }

    let poller = ProgressPoller::new(
        ctx.endpoints.progress.clone(),
        ctx.config.poll_interval,
        ctx.config.final_stage_marker.clone(),
    );
    match poller.run(&ctx.handle, &ctx.cancel, &run).await {
        PollOutcome::Terminal(_) => {}
        // Failures were already reported through `on_error`.
        PollOutcome::Failed(_) | PollOutcome::Cancelled => return,
    }
    if !run.transition(JobState::Running, JobState::Fetching).await {
        return;
    }

    let fetcher = ResultFetcher::new(ctx.endpoints.result.clone(), ctx.config.retry.clone());
    match fetcher.fetch(&ctx.handle, &ctx.cancel).await {
        Ok(Some(results)) => run.complete(results).await,
        Ok(None) => {}
        Err(e) => run.fail(e.into()).await,
    }
}
