//! Job identity and lifecycle state shared by every layer.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ---------------------------------------------------------------------------
// JobHandle
// ---------------------------------------------------------------------------

/// Caller-supplied identifiers for one optimization job.
///
/// The values are opaque to this crate and are sent verbatim on every
/// remote call. A handle is immutable once constructed, and
/// deserializing one goes through the same checks as [`JobHandle::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawJobHandle")]
pub struct JobHandle {
    uid: String,
    task_id: String,
    company_id: String,
}

/// Unvalidated wire form of a [`JobHandle`].
#[derive(Deserialize)]
struct RawJobHandle {
    uid: String,
    task_id: String,
    company_id: String,
}

impl TryFrom<RawJobHandle> for JobHandle {
    type Error = CoreError;

    fn try_from(raw: RawJobHandle) -> Result<Self, Self::Error> {
        Self::new(raw.uid, raw.task_id, raw.company_id)
    }
}

impl JobHandle {
    /// Build a handle, rejecting blank identifiers.
    ///
    /// Identifiers are stored exactly as given (no trimming); only the
    /// blank check looks at trimmed content.
    pub fn new(
        uid: impl Into<String>,
        task_id: impl Into<String>,
        company_id: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let handle = Self {
            uid: uid.into(),
            task_id: task_id.into(),
            company_id: company_id.into(),
        };
        for (name, value) in handle.query_pairs() {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "Job identifier '{name}' must not be empty"
                )));
            }
        }
        Ok(handle)
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    /// Query-string pairs in the order the optimizer API expects them.
    pub fn query_pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("uid", self.uid.as_str()),
            ("taskId", self.task_id.as_str()),
            ("companyId", self.company_id.as_str()),
        ]
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.company_id, self.uid, self.task_id)
    }
}

// ---------------------------------------------------------------------------
// JobState
// ---------------------------------------------------------------------------

/// Lifecycle state of a task session.
///
/// `Ready`, `Failed` and `Cancelled` are terminal; a session leaves
/// them only through an explicit reset or a new start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Idle,
    Starting,
    Running,
    Fetching,
    Ready,
    Failed,
    Cancelled,
}

impl JobState {
    /// String representation for display and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Fetching => "fetching",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether a remote operation may still be outstanding in this state.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Fetching)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
