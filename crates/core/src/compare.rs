//! Scenario comparison: aligned metric rows, deltas, and chart helpers.
//!
//! All functions are pure and may be called any time a [`ResultSet`]
//! exists.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::scenario::{
    ResultSet, ScenarioResult, KEY_KH, KEY_N, KEY_P, KEY_STRENGTH_1D, KEY_STRENGTH_28D,
    KEY_STRENGTH_3D,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Offset added before taking `log10` so zero concentrations stay finite.
pub const LOG_SCALE_OFFSET: f64 = 0.01;

const RATIO_KEYS: &[&str] = &[KEY_KH, KEY_N, KEY_P];
const STRENGTH_KEYS: &[&str] = &[KEY_STRENGTH_1D, KEY_STRENGTH_3D, KEY_STRENGTH_28D];
const MAJOR_CHEMICAL_KEYS: &[&str] = &["SiO₂", "Al₂O₃", "Fe₂O₃", "CaO", "MgO"];
const MINOR_CHEMICAL_KEYS: &[&str] = &["SO₃", "f-CaO", "Na₂O", "K₂O", "Cl⁻"];

// ---------------------------------------------------------------------------
// Metric groups
// ---------------------------------------------------------------------------

/// A fixed, ordered set of metric keys compared together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricGroup {
    Ratios,
    Strength,
    MajorChemical,
    MinorChemical,
}

impl MetricGroup {
    pub const ALL: [MetricGroup; 4] = [
        Self::Ratios,
        Self::Strength,
        Self::MajorChemical,
        Self::MinorChemical,
    ];

    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            Self::Ratios => RATIO_KEYS,
            Self::Strength => STRENGTH_KEYS,
            Self::MajorChemical => MAJOR_CHEMICAL_KEYS,
            Self::MinorChemical => MINOR_CHEMICAL_KEYS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ratios => "ratios",
            Self::Strength => "strength",
            Self::MajorChemical => "majorChemical",
            Self::MinorChemical => "minorChemical",
        }
    }
}

impl std::fmt::Display for MetricGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetricGroup {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown metric group: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Comparison rows
// ---------------------------------------------------------------------------

/// One metric across every scenario, in result-set order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub metric: String,
    /// Display values; min-max normalized when amplification is on.
    pub values: Vec<f64>,
    /// The unmodified values.
    pub raw: Vec<f64>,
}

/// Min-max normalize `values` into `0.0..=1.0`.
///
/// When every value is equal there is no difference to show, so every
/// output is `0.0`.
#[allow(clippy::float_cmp)]
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if values.is_empty() || span == 0.0 || !span.is_finite() {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / span).collect()
}

/// Build one row per key of `group`.
///
/// Missing chemical keys read as `0.0`. With `amplify`, each row is
/// normalized on its own, never across rows.
pub fn compare(results: &ResultSet, group: MetricGroup, amplify: bool) -> Vec<ComparisonRow> {
    group
        .keys()
        .iter()
        .map(|key| {
            let raw: Vec<f64> = results.iter().map(|s| s.metric(key)).collect();
            let values = if amplify {
                min_max_normalize(&raw)
            } else {
                raw.clone()
            };
            ComparisonRow {
                metric: (*key).to_string(),
                values,
                raw,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Deltas
// ---------------------------------------------------------------------------

/// Direction of change from a previous scenario to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaDirection {
    Increase,
    Decrease,
    NoChange,
}

impl DeltaDirection {
    /// Classify a difference. Exact zero is its own category.
    pub fn classify(difference: f64) -> Self {
        if difference > 0.0 {
            Self::Increase
        } else if difference < 0.0 {
            Self::Decrease
        } else {
            Self::NoChange
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDelta {
    pub metric: String,
    pub previous: f64,
    pub current: f64,
    /// `current - previous`.
    pub difference: f64,
    pub direction: DeltaDirection,
}

impl MetricDelta {
    fn between(metric: &str, previous: f64, current: f64) -> Self {
        let difference = current - previous;
        Self {
            metric: metric.to_string(),
            previous,
            current,
            difference,
            direction: DeltaDirection::classify(difference),
        }
    }
}

/// Per-key deltas for one metric group.
pub fn compute_delta(
    previous: &ScenarioResult,
    current: &ScenarioResult,
    group: MetricGroup,
) -> Vec<MetricDelta> {
    group
        .keys()
        .iter()
        .map(|key| MetricDelta::between(key, previous.metric(key), current.metric(key)))
        .collect()
}

/// Chemical deltas over the union of both scenarios' keys.
///
/// A key present on only one side compares against `0.0` and still
/// appears in the output.
pub fn chemical_difference(
    previous: &ScenarioResult,
    current: &ScenarioResult,
) -> Vec<MetricDelta> {
    let keys: BTreeSet<&String> = previous.chemical.keys().chain(current.chemical.keys()).collect();
    keys.into_iter()
        .map(|key| MetricDelta::between(key, previous.metric(key), current.metric(key)))
        .collect()
}

// ---------------------------------------------------------------------------
// Chart helpers
// ---------------------------------------------------------------------------

/// `log10(value + LOG_SCALE_OFFSET)`.
pub fn log_scale(value: f64) -> f64 {
    (value + LOG_SCALE_OFFSET).log10()
}

/// `(name, value)` pairs for a chemical bar chart, in key order.
pub fn chart_series(chemical: &BTreeMap<String, f64>, log: bool) -> Vec<(String, f64)> {
    chemical
        .iter()
        .map(|(name, &value)| {
            let value = if log { log_scale(value) } else { value };
            (name.clone(), value)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{Ratios, Strength};

    fn scenario(id: u32, kh: f64, n: f64, chemical: &[(&str, f64)]) -> ScenarioResult {
        ScenarioResult {
            id,
            ratios: Ratios { kh, n, p: 1.45 },
            strength: Strength {
                day_1: 15.5,
                day_3: 31.4,
                day_28: 58.0 + f64::from(id),
            },
            chemical: chemical
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
        }
    }

    fn three() -> ResultSet {
        ResultSet::new(vec![
            scenario(1, 0.92, 2.35, &[("CaO", 64.59), ("MgO", 2.54)]),
            scenario(2, 0.90, 2.40, &[("CaO", 64.21)]),
            scenario(3, 0.94, 2.30, &[("CaO", 64.97), ("MgO", 2.52)]),
        ])
        .unwrap()
    }

    // -- compare --------------------------------------------------------------

    #[test]
    fn raw_ratios_are_unmodified() {
        let rows = compare(&three(), MetricGroup::Ratios, false);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].metric, "KH");
        assert_eq!(rows[0].values, vec![0.92, 0.90, 0.94]);
        assert_eq!(rows[0].values, rows[0].raw);
        assert_eq!(rows[1].values, vec![2.35, 2.40, 2.30]);
    }

    #[test]
    fn amplify_normalizes_within_each_row() {
        let rows = compare(&three(), MetricGroup::Ratios, true);
        let kh = &rows[0].values;
        assert!((kh[0] - 0.5).abs() < 1e-9);
        assert_eq!(kh[1], 0.0);
        assert_eq!(kh[2], 1.0);
        assert_eq!(rows[0].raw, vec![0.92, 0.90, 0.94]);
    }

    #[test]
    fn amplify_identical_values_yields_zeros() {
        let results = ResultSet::new(vec![
            scenario(1, 0.92, 2.35, &[]),
            scenario(2, 0.92, 2.40, &[]),
            scenario(3, 0.92, 2.30, &[]),
        ])
        .unwrap();
        let rows = compare(&results, MetricGroup::Ratios, true);
        assert_eq!(rows[0].values, vec![0.0, 0.0, 0.0]);
        assert!(rows[0].values.iter().all(|v| v.is_finite()));
        assert_eq!(rows[0].raw, vec![0.92, 0.92, 0.92]);
    }

    #[test]
    fn missing_chemical_keys_default_to_zero() {
        let rows = compare(&three(), MetricGroup::MajorChemical, false);
        let mgo = rows.iter().find(|r| r.metric == "MgO").unwrap();
        assert_eq!(mgo.raw, vec![2.54, 0.0, 2.52]);
        let sio2 = rows.iter().find(|r| r.metric == "SiO₂").unwrap();
        assert_eq!(sio2.raw, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn groups_have_fixed_key_order() {
        assert_eq!(MetricGroup::Strength.keys(), &["1d", "3d", "28d"]);
        assert_eq!(MetricGroup::MinorChemical.keys().len(), 5);
    }

    #[test]
    fn group_parses_from_wire_name() {
        assert_eq!("majorChemical".parse::<MetricGroup>().unwrap(), MetricGroup::MajorChemical);
        assert!("chemistry".parse::<MetricGroup>().is_err());
    }

    #[test]
    fn normalize_empty_slice() {
        assert!(min_max_normalize(&[]).is_empty());
    }

    // -- deltas ---------------------------------------------------------------

    #[test]
    fn delta_classifies_each_direction() {
        let results = three();
        let deltas = compute_delta(
            results.get(1).unwrap(),
            results.get(2).unwrap(),
            MetricGroup::Ratios,
        );
        assert_eq!(deltas[0].direction, DeltaDirection::Decrease);
        assert_eq!(deltas[1].direction, DeltaDirection::Increase);
        assert_eq!(deltas[2].direction, DeltaDirection::NoChange);
        assert_eq!(deltas[2].difference, 0.0);
    }

    #[test]
    fn zero_is_not_folded_into_decrease() {
        assert_eq!(DeltaDirection::classify(0.0), DeltaDirection::NoChange);
        assert_eq!(DeltaDirection::classify(-0.0), DeltaDirection::NoChange);
        assert_eq!(DeltaDirection::classify(-1e-12), DeltaDirection::Decrease);
    }

    #[test]
    fn chemical_difference_covers_key_union() {
        let results = three();
        let diff = chemical_difference(results.get(1).unwrap(), results.get(2).unwrap());
        let keys: Vec<_> = diff.iter().map(|d| d.metric.as_str()).collect();
        assert_eq!(keys, vec!["CaO", "MgO"]);
        let mgo = &diff[1];
        assert_eq!(mgo.current, 0.0);
        assert_eq!(mgo.direction, DeltaDirection::Decrease);
    }

    // -- charts ---------------------------------------------------------------

    #[test]
    fn log_scale_keeps_zero_finite() {
        assert!((log_scale(0.0) - (-2.0)).abs() < 1e-12);
        let series = chart_series(&three().baseline().chemical, true);
        assert_eq!(series[0].0, "CaO");
        assert!((series[0].1 - 64.6f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn linear_series_passes_values_through() {
        let series = chart_series(&three().baseline().chemical, false);
        assert_eq!(series, vec![("CaO".to_string(), 64.59), ("MgO".to_string(), 2.54)]);
    }
}
