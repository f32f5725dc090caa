//! Progress snapshots, terminal detection, and the per-job stage tracker.
//!
//! The optimizer reports a free-text stage description plus a fraction
//! for that stage. The job is finished only when the final stage label
//! is reported together with a fraction of exactly `1.0`; intermediate
//! stages may also reach `1.0` before the next stage begins.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Stage label the optimizer reports while running its last stage.
pub const FINAL_STAGE_MARKER: &str = "Stage 3: Finding lower KH ratios";

/// Label shown when the optimizer has not reported a stage yet.
pub const DEFAULT_STAGE_LABEL: &str = "Waiting for optimizer";

// ---------------------------------------------------------------------------
// ProgressSnapshot
// ---------------------------------------------------------------------------

/// One progress reading, produced once per poll tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub stage_description: String,
    pub fraction: f64,
}

impl ProgressSnapshot {
    pub fn new(stage_description: impl Into<String>, fraction: f64) -> Self {
        Self {
            stage_description: stage_description.into(),
            fraction,
        }
    }

    /// Stage text for display, substituting [`DEFAULT_STAGE_LABEL`] when empty.
    pub fn display_stage(&self) -> &str {
        if self.stage_description.trim().is_empty() {
            DEFAULT_STAGE_LABEL
        } else {
            &self.stage_description
        }
    }

    /// Clamped fraction as a whole percentage, for progress bars.
    pub fn percent(&self) -> u8 {
        (clamp_fraction(self.fraction) * 100.0).round() as u8
    }

    /// Whether the raw fraction already lies in `0.0..=1.0`.
    pub fn is_in_range(&self) -> bool {
        (0.0..=1.0).contains(&self.fraction)
    }
}

/// Clamp a fraction into `0.0..=1.0`. NaN readings clamp to `0.0`.
pub fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

/// Whether `snapshot` marks the end of the job.
///
/// Requires an exact label match and a raw fraction exactly equal to
/// `1.0`. The optimizer emits the final `1.0` discretely, so exact
/// comparison is correct here.
#[allow(clippy::float_cmp)]
pub fn is_terminal(snapshot: &ProgressSnapshot, final_stage_marker: &str) -> bool {
    snapshot.stage_description == final_stage_marker && snapshot.fraction == 1.0
}

// ---------------------------------------------------------------------------
// StageTracker
// ---------------------------------------------------------------------------

/// Holds the latest progress reading for one job.
///
/// Readings are accepted as-is apart from clamping the fraction. A
/// lower fraction than the previous reading simply replaces it.
#[derive(Debug, Clone, Default)]
pub struct StageTracker {
    current: ProgressSnapshot,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, snapshot: ProgressSnapshot) {
        self.current = ProgressSnapshot {
            fraction: clamp_fraction(snapshot.fraction),
            stage_description: snapshot.stage_description,
        };
    }

    pub fn current(&self) -> ProgressSnapshot {
        self.current.clone()
    }

    /// Forget the last reading.
    pub fn reset(&mut self) {
        self.current = ProgressSnapshot::default();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
