//! Shared test doubles for the session integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clinker_client::api::OptimizerApiError;
use clinker_client::endpoints::{
    Endpoints, JobParameters, JobStartEndpoint, ProgressEndpoint, ResultEndpoint,
};
use clinker_client::events::SessionEvent;
use clinker_core::stage::ProgressSnapshot;
use clinker_core::types::JobHandle;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Notify};

pub type Reading = Result<ProgressSnapshot, OptimizerApiError>;

/// Stage reported once a job's progress script runs out.
pub const STILL_RUNNING: &str = "Stage 1: Sampling raw meal";

/// Scripted optimizer. Progress is scripted per task id; a task whose
/// script is exhausted keeps reporting [`STILL_RUNNING`].
#[derive(Default)]
pub struct FakeOptimizer {
    start_failure: Mutex<Option<OptimizerApiError>>,
    progress: Mutex<HashMap<String, VecDeque<Reading>>>,
    results: Mutex<VecDeque<Result<Value, OptimizerApiError>>>,
    /// Progress calls for which a gate is armed block until released.
    gate: Mutex<Option<Gate>>,
    pub start_calls: AtomicU32,
    pub progress_calls: AtomicU32,
    pub result_calls: AtomicU32,
    pub started_parameters: Mutex<Vec<JobParameters>>,
}

pub struct Gate {
    pub entered: Arc<Notify>,
    release: oneshot::Receiver<Reading>,
}

impl FakeOptimizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_start(&self, error: OptimizerApiError) {
        *self.start_failure.lock().unwrap() = Some(error);
    }

    pub fn script_progress(&self, task_id: &str, readings: Vec<Reading>) {
        self.progress
            .lock()
            .unwrap()
            .insert(task_id.to_string(), readings.into());
    }

    pub fn script_results(&self, results: Vec<Result<Value, OptimizerApiError>>) {
        self.results.lock().unwrap().extend(results);
    }

    /// Make the next progress call block until the returned sender fires.
    pub fn gate_progress(&self) -> (Arc<Notify>, oneshot::Sender<Reading>) {
        let (tx, rx) = oneshot::channel();
        let entered = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Gate {
            entered: entered.clone(),
            release: rx,
        });
        (entered, tx)
    }

    pub fn endpoints(self: &Arc<Self>) -> Endpoints {
        Endpoints::shared(self.clone())
    }
}

#[async_trait]
impl JobStartEndpoint for FakeOptimizer {
    async fn start(
        &self,
        _handle: &JobHandle,
        parameters: &JobParameters,
    ) -> Result<(), OptimizerApiError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.started_parameters
            .lock()
            .unwrap()
            .push(parameters.clone());
        match self.start_failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProgressEndpoint for FakeOptimizer {
    async fn get_progress(&self, handle: &JobHandle) -> Reading {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            return gate.release.await.expect("gate sender kept alive");
        }

        self.progress
            .lock()
            .unwrap()
            .get_mut(handle.task_id())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(ProgressSnapshot::new(STILL_RUNNING, 0.5)))
    }
}

#[async_trait]
impl ResultEndpoint for FakeOptimizer {
    async fn get_result(&self, _handle: &JobHandle) -> Result<Value, OptimizerApiError> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(not_ready()))
    }
}

pub fn not_ready() -> OptimizerApiError {
    OptimizerApiError::ApiError {
        status: 404,
        message: "result not ready".into(),
    }
}

pub fn reading(stage: &str, fraction: f64) -> Reading {
    Ok(ProgressSnapshot::new(stage, fraction))
}

pub fn handle(task_id: &str) -> JobHandle {
    JobHandle::new("u-100", task_id, "plant-7").unwrap()
}

pub fn parameters() -> JobParameters {
    [("kiln_feed", "210"), ("target_kh", "0.92")]
        .into_iter()
        .collect()
}

fn scenario(kh: f64, s28: f64, cao: f64) -> Value {
    json!({
        "ratios": {"KH": kh, "N": 2.6, "P": 1.5},
        "strength_1d": 14.2,
        "strength_3d": 29.8,
        "strength_28d": s28,
        "chemical_props": {"CaO": cao, "SiO₂": 21.3, "Fe₂O₃": 3.4}
    })
}

/// Three-scenario optimization result inside the usual envelope.
pub fn optimization_payload() -> Value {
    json!({
        "code": 0,
        "data": {
            "Default": scenario(0.90, 56.0, 64.8),
            "optimum": scenario(0.92, 58.7, 65.4),
            "improvement": scenario(0.88, 57.1, 64.1)
        }
    })
}

/// Drain every event already delivered to `rx`.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
