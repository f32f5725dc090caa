//! Abstract contracts for the three remote collaborators of a job.
//!
//! [`OptimizerApi`](crate::api::OptimizerApi) implements all three over
//! HTTP; tests substitute scripted doubles.

use std::sync::Arc;

use async_trait::async_trait;
use clinker_core::stage::ProgressSnapshot;
use clinker_core::types::JobHandle;

use crate::api::OptimizerApiError;

/// Submits a job with its input parameters.
#[async_trait]
pub trait JobStartEndpoint: Send + Sync {
    async fn start(
        &self,
        handle: &JobHandle,
        parameters: &JobParameters,
    ) -> Result<(), OptimizerApiError>;
}

/// Reads the current progress of a job.
#[async_trait]
pub trait ProgressEndpoint: Send + Sync {
    async fn get_progress(&self, handle: &JobHandle) -> Result<ProgressSnapshot, OptimizerApiError>;
}

/// Reads the raw result payload of a finished job.
#[async_trait]
pub trait ResultEndpoint: Send + Sync {
    async fn get_result(&self, handle: &JobHandle) -> Result<serde_json::Value, OptimizerApiError>;
}

/// The endpoint set a session talks to.
#[derive(Clone)]
pub struct Endpoints {
    pub start: Arc<dyn JobStartEndpoint>,
    pub progress: Arc<dyn ProgressEndpoint>,
    pub result: Arc<dyn ResultEndpoint>,
}

impl Endpoints {
    /// Use one shared implementation for all three endpoints.
    pub fn shared<E>(endpoints: Arc<E>) -> Self
    where
        E: JobStartEndpoint + ProgressEndpoint + ResultEndpoint + 'static,
    {
        Self {
            start: endpoints.clone(),
            progress: endpoints.clone(),
            result: endpoints,
        }
    }
}

/// Named input parameters for a job, sent in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobParameters(Vec<(String, String)>);

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Repeated names are sent repeatedly.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for JobParameters {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        )
    }
}
