//! Canonical scenario model every backend response is normalized into.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Metric keys
// ---------------------------------------------------------------------------

pub const KEY_KH: &str = "KH";
pub const KEY_N: &str = "N";
pub const KEY_P: &str = "P";
pub const KEY_STRENGTH_1D: &str = "1d";
pub const KEY_STRENGTH_3D: &str = "3d";
pub const KEY_STRENGTH_28D: &str = "28d";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Clinker ratio values: lime saturation factor (KH), silica modulus (N)
/// and alumina modulus (P).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ratios {
    #[serde(rename = "KH")]
    pub kh: f64,
    #[serde(rename = "N")]
    pub n: f64,
    #[serde(rename = "P")]
    pub p: f64,
}

/// Compressive strength predictions in MPa at 1, 3 and 28 days.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Strength {
    #[serde(rename = "1d")]
    pub day_1: f64,
    #[serde(rename = "3d")]
    pub day_3: f64,
    #[serde(rename = "28d")]
    pub day_28: f64,
}

/// One optimization scenario in canonical form.
///
/// `chemical` keys vary between scenarios and backend versions; readers
/// must treat a missing key as `0.0` when comparing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub id: u32,
    pub ratios: Ratios,
    pub strength: Strength,
    pub chemical: BTreeMap<String, f64>,
}

impl ScenarioResult {
    /// Value of a ratio, strength, or chemical metric by key.
    ///
    /// Unknown chemical keys yield `0.0`.
    pub fn metric(&self, key: &str) -> f64 {
        match key {
            KEY_KH => self.ratios.kh,
            KEY_N => self.ratios.n,
            KEY_P => self.ratios.p,
            KEY_STRENGTH_1D => self.strength.day_1,
            KEY_STRENGTH_3D => self.strength.day_3,
            KEY_STRENGTH_28D => self.strength.day_28,
            other => self.chemical.get(other).copied().unwrap_or(0.0),
        }
    }
}

/// Ordered, non-empty list of scenarios.
///
/// Position 0 is conventionally the baseline; the order is otherwise
/// whatever the source payload produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSet(Vec<ScenarioResult>);

impl ResultSet {
    pub fn new(scenarios: Vec<ScenarioResult>) -> Result<Self, CoreError> {
        if scenarios.is_empty() {
            return Err(CoreError::Validation(
                "A result set must contain at least one scenario".to_string(),
            ));
        }
        Ok(Self(scenarios))
    }

    /// Construct from a vector the caller has already proven non-empty.
    pub(crate) fn from_non_empty(scenarios: Vec<ScenarioResult>) -> Self {
        debug_assert!(!scenarios.is_empty());
        Self(scenarios)
    }

    pub fn scenarios(&self) -> &[ScenarioResult] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn baseline(&self) -> &ScenarioResult {
        &self.0[0]
    }

    pub fn get(&self, id: u32) -> Option<&ScenarioResult> {
        self.0.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScenarioResult> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ScenarioResult;
    type IntoIter = std::slice::Iter<'a, ScenarioResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Selection history
// ---------------------------------------------------------------------------

/// Tracks which scenario is selected and which one was selected before.
///
/// The `(previous, current)` pair feeds delta computation when the user
/// switches between scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSelection {
    current: u32,
    previous: Option<u32>,
}

impl ScenarioSelection {
    /// Start with the baseline scenario selected and no history.
    pub fn new(results: &ResultSet) -> Self {
        Self {
            current: results.baseline().id,
            previous: None,
        }
    }

    /// Select scenario `id`, falling back to the baseline for unknown ids.
    pub fn select(&mut self, results: &ResultSet, id: u32) {
        let next = results.get(id).map_or(results.baseline().id, |s| s.id);
        self.previous = Some(self.current);
        self.current = next;
    }

    pub fn current_id(&self) -> u32 {
        self.current
    }

    pub fn previous_id(&self) -> Option<u32> {
        self.previous
    }

    /// Resolve the `(previous, current)` scenarios, if there is a previous one.
    pub fn pair<'a>(
        &self,
        results: &'a ResultSet,
    ) -> Option<(&'a ScenarioResult, &'a ScenarioResult)> {
        let previous = results.get(self.previous?)?;
        let current = results.get(self.current)?;
        Some((previous, current))
    }
}
