//! Session callbacks and the events they carry.
//!
//! The presentation layer implements [`SessionObserver`] directly, or
//! hands the session an unbounded channel sender and consumes
//! [`SessionEvent`]s from the receiver.

use chrono::Utc;
use clinker_core::scenario::ResultSet;
use clinker_core::stage::ProgressSnapshot;
use clinker_core::types::Timestamp;
use tokio::sync::mpsc;

use crate::error::SessionError;

/// Callbacks for one job's lifecycle.
///
/// Exactly one of `on_result`, `on_error` or `on_cancelled` is delivered
/// per job, after every `on_stage` for that job. Callbacks run while
/// the session's state lock is held and must not block.
pub trait SessionObserver: Send + Sync {
    /// A new progress reading, with the fraction already clamped.
    fn on_stage(&self, snapshot: &ProgressSnapshot);

    /// The job finished and its result is stored in the session.
    fn on_result(&self, results: &ResultSet);

    /// The job failed; the session is now `Failed`.
    fn on_error(&self, error: &SessionError);

    /// The job was cancelled or retired by a newer job.
    fn on_cancelled(&self) {}
}

/// A lifecycle event, as delivered through a channel observer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Stage {
        snapshot: ProgressSnapshot,
        at: Timestamp,
    },

    Ready {
        results: ResultSet,
        at: Timestamp,
    },

    Failed {
        error: SessionError,
        at: Timestamp,
    },

    Cancelled {
        at: Timestamp,
    },
}

impl SessionEvent {
    /// Whether no further events follow this one for the same job.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Stage { .. })
    }
}

/// Forwards callbacks as [`SessionEvent`]s. A closed receiver is ignored.
impl SessionObserver for mpsc::UnboundedSender<SessionEvent> {
    fn on_stage(&self, snapshot: &ProgressSnapshot) {
        let _ = self.send(SessionEvent::Stage {
            snapshot: snapshot.clone(),
            at: Utc::now(),
        });
    }

    fn on_result(&self, results: &ResultSet) {
        let _ = self.send(SessionEvent::Ready {
            results: results.clone(),
            at: Utc::now(),
        });
    }

    fn on_error(&self, error: &SessionError) {
        let _ = self.send(SessionEvent::Failed {
            error: error.clone(),
            at: Utc::now(),
        });
    }

    fn on_cancelled(&self) {
        let _ = self.send(SessionEvent::Cancelled { at: Utc::now() });
    }
}
