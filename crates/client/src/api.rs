//! REST API client for the optimizer HTTP endpoints.
//!
//! Wraps job start, progress polling and result retrieval using
//! [`reqwest`]. Every request carries the job identifiers as query
//! parameters and asks for JSON.

use async_trait::async_trait;
use clinker_core::stage::ProgressSnapshot;
use clinker_core::types::JobHandle;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::endpoints::{JobParameters, JobStartEndpoint, ProgressEndpoint, ResultEndpoint};

const START_PATH: &str = "/cement/opt/start";
const PROGRESS_PATH: &str = "/cement/opt/progress";
const RESULT_PATH: &str = "/cement/opt/result";

/// HTTP client for one optimizer API base URL.
pub struct OptimizerApi {
    client: reqwest::Client,
    api_url: String,
}

/// Body of the progress endpoint: `{"data": {"desc": ..., "progress": ...}}`.
#[derive(Debug, Deserialize)]
struct ProgressEnvelope {
    data: ProgressData,
}

#[derive(Debug, Deserialize)]
struct ProgressData {
    #[serde(default)]
    desc: String,
    progress: f64,
}

/// Error body the optimizer sends alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Errors from the optimizer REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum OptimizerApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The optimizer returned a non-2xx status code.
    #[error("Optimizer API error ({status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Server-supplied `message`, or the raw body when there is none.
        message: String,
    },

    /// The body was not the JSON the endpoint promises.
    #[error("Failed to parse JSON response: {0}")]
    Decode(String),
}

impl OptimizerApi {
    /// Create a new API client.
    ///
    /// * `api_url` - Base URL including the version prefix, e.g.
    ///   `http://host:8181/api/v2`.
    pub fn new(api_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Submit a job. Sends `POST /cement/opt/start` with the parameters
    /// as multipart text fields and returns the acknowledgement body.
    pub async fn start_optimization(
        &self,
        handle: &JobHandle,
        parameters: &JobParameters,
    ) -> Result<serde_json::Value, OptimizerApiError> {
        let form = parameters
            .iter()
            .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                form.text(name.to_string(), value.to_string())
            });

        let response = self
            .client
            .post(self.url(START_PATH))
            .query(&handle.query_pairs()[..])
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Read the current progress. Sends `GET /cement/opt/progress`.
    pub async fn check_progress(
        &self,
        handle: &JobHandle,
    ) -> Result<ProgressSnapshot, OptimizerApiError> {
        let response = self.get(PROGRESS_PATH, handle).await?;
        let envelope: ProgressEnvelope = Self::parse_response(response).await?;
        Ok(ProgressSnapshot::new(
            envelope.data.desc,
            envelope.data.progress,
        ))
    }

    /// Retrieve the raw result payload. Sends `GET /cement/opt/result`.
    ///
    /// The payload shape is not interpreted here; see
    /// [`clinker_core::normalize`].
    pub async fn fetch_result(
        &self,
        handle: &JobHandle,
    ) -> Result<serde_json::Value, OptimizerApiError> {
        let response = self.get(RESULT_PATH, handle).await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn get(
        &self,
        path: &str,
        handle: &JobHandle,
    ) -> Result<reqwest::Response, OptimizerApiError> {
        Ok(self
            .client
            .get(self.url(path))
            .query(&handle.query_pairs()[..])
            .header(ACCEPT, "application/json")
            .send()
            .await?)
    }

    /// Read the body and decode it as JSON, turning non-2xx statuses
    /// into [`OptimizerApiError::ApiError`].
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, OptimizerApiError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(OptimizerApiError::ApiError {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| OptimizerApiError::Decode(e.to_string()))
    }
}

/// Prefer the server's `message` field; fall back to the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
        }) => message,
        _ if body.is_empty() => "Unknown Error".to_string(),
        _ => body.to_string(),
    }
}

#[async_trait]
impl JobStartEndpoint for OptimizerApi {
    async fn start(
        &self,
        handle: &JobHandle,
        parameters: &JobParameters,
    ) -> Result<(), OptimizerApiError> {
        self.start_optimization(handle, parameters).await.map(|_| ())
    }
}

#[async_trait]
impl ProgressEndpoint for OptimizerApi {
    async fn get_progress(&self, handle: &JobHandle) -> Result<ProgressSnapshot, OptimizerApiError> {
        self.check_progress(handle).await
    }
}

#[async_trait]
impl ResultEndpoint for OptimizerApi {
    async fn get_result(&self, handle: &JobHandle) -> Result<serde_json::Value, OptimizerApiError> {
        self.fetch_result(handle).await
    }
}
