//! Decoding of optimizer result payloads into a canonical [`ResultSet`].
//!
//! The result endpoint answers in one of two incompatible shapes:
//!
//! - **Optimization** (`opt`): a map of named scenarios (`Default`,
//!   `optimum`, `improvement`), each with `ratios`, `strength_1d`,
//!   `strength_3d`, `strength_28d` and `chemical_props`.
//! - **Prediction**: a single object with
//!   `strength_result.predictions{1d,3d,28d}` and a flat
//!   `features_result` chemical map, without ratios.
//!
//! The shape is chosen by probing for a discriminating field, then one
//! of two dedicated decoders runs. Decoding is all-or-nothing: a
//! payload that fails anywhere yields no scenarios at all.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::scenario::{Ratios, ResultSet, ScenarioResult, Strength};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Envelope field some responses wrap the payload in.
pub const ENVELOPE_FIELD: &str = "data";

/// Field whose presence identifies an optimization payload.
pub const OPTIMIZATION_PROBE_FIELD: &str = "Default";

/// Field whose presence identifies a prediction payload.
pub const PREDICTION_PROBE_FIELD: &str = "strength_result";

/// Scenario names of an optimization payload, in result order.
pub const OPTIMIZATION_SCENARIO_ORDER: [&str; 3] = ["Default", "optimum", "improvement"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Result payload is not a JSON object")]
    NotAnObject,

    #[error("Unrecognized result payload shape (fields: {fields})")]
    UnrecognizedShape { fields: String },

    #[error("Malformed optimization scenario '{scenario}': {source}")]
    MalformedScenario {
        scenario: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed prediction payload: {0}")]
    MalformedPrediction(#[source] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Which decoder a payload needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Optimization,
    Prediction,
}

/// One named scenario in an optimization payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OptimizationScenario {
    pub ratios: Ratios,
    pub strength_1d: f64,
    pub strength_3d: f64,
    pub strength_28d: f64,
    #[serde(default)]
    pub chemical_props: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StrengthResult {
    pub predictions: Strength,
}

/// The single-object prediction payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionPayload {
    pub strength_result: StrengthResult,
    #[serde(default)]
    pub features_result: BTreeMap<String, f64>,
}

/// A decoded payload, tagged by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResultPayload {
    /// Named scenarios in [`OPTIMIZATION_SCENARIO_ORDER`], absent names skipped.
    Optimization(Vec<(String, OptimizationScenario)>),
    Prediction(PredictionPayload),
}

// ---------------------------------------------------------------------------
// Probing and decoding
// ---------------------------------------------------------------------------

/// Strip the optional `{"data": {...}}` envelope.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut obj) if obj.get(ENVELOPE_FIELD).is_some_and(Value::is_object) => {
            obj.remove(ENVELOPE_FIELD).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Pick the decoder for a payload object by probing its fields.
pub fn probe_shape(obj: &Map<String, Value>) -> Result<PayloadShape, NormalizeError> {
    if obj.contains_key(OPTIMIZATION_PROBE_FIELD) {
        Ok(PayloadShape::Optimization)
    } else if obj.contains_key(PREDICTION_PROBE_FIELD) {
        Ok(PayloadShape::Prediction)
    } else {
        let fields = obj.keys().cloned().collect::<Vec<_>>().join(", ");
        Err(NormalizeError::UnrecognizedShape { fields })
    }
}

/// Decode the named scenarios of an optimization payload.
///
/// Fields other than the known scenario names are ignored.
pub fn decode_optimization(
    obj: &Map<String, Value>,
) -> Result<Vec<(String, OptimizationScenario)>, NormalizeError> {
    OPTIMIZATION_SCENARIO_ORDER
        .iter()
        .filter_map(|name| obj.get(*name).map(|raw| (*name, raw)))
        .map(|(name, raw)| {
            OptimizationScenario::deserialize(raw)
                .map(|scenario| (name.to_string(), scenario))
                .map_err(|source| NormalizeError::MalformedScenario {
                    scenario: name.to_string(),
                    source,
                })
        })
        .collect()
}

/// Decode a prediction payload.
pub fn decode_prediction(obj: &Map<String, Value>) -> Result<PredictionPayload, NormalizeError> {
    PredictionPayload::deserialize(Value::Object(obj.clone()))
        .map_err(NormalizeError::MalformedPrediction)
}

/// Unwrap, probe and decode a raw response body.
pub fn decode_payload(value: Value) -> Result<RawResultPayload, NormalizeError> {
    let payload = unwrap_envelope(value);
    let obj = payload.as_object().ok_or(NormalizeError::NotAnObject)?;
    match probe_shape(obj)? {
        PayloadShape::Optimization => decode_optimization(obj).map(RawResultPayload::Optimization),
        PayloadShape::Prediction => decode_prediction(obj).map(RawResultPayload::Prediction),
    }
}

impl RawResultPayload {
    pub fn shape(&self) -> PayloadShape {
        match self {
            Self::Optimization(_) => PayloadShape::Optimization,
            Self::Prediction(_) => PayloadShape::Prediction,
        }
    }

    /// Map the decoded payload onto canonical scenarios numbered from 1.
    pub fn into_result_set(self) -> ResultSet {
        let scenarios = match self {
            Self::Optimization(named) => named
                .into_iter()
                .zip(1u32..)
                .map(|((_, s), id)| ScenarioResult {
                    id,
                    ratios: s.ratios,
                    strength: Strength {
                        day_1: s.strength_1d,
                        day_3: s.strength_3d,
                        day_28: s.strength_28d,
                    },
                    chemical: s.chemical_props,
                })
                .collect(),
            Self::Prediction(p) => vec![ScenarioResult {
                id: 1,
                ratios: Ratios::default(),
                strength: p.strength_result.predictions,
                chemical: p.features_result,
            }],
        };
        // The probe guarantees `Default` exists for optimization payloads,
        // so there is always at least one scenario.
        ResultSet::from_non_empty(scenarios)
    }
}

/// Decode a raw response body all the way to a [`ResultSet`].
pub fn normalize(value: Value) -> Result<ResultSet, NormalizeError> {
    decode_payload(value).map(RawResultPayload::into_result_set)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn opt_scenario(kh: f64, s28: f64) -> Value {
        json!({
            "ratios": {"KH": kh, "N": 2.4, "P": 1.5},
            "strength_1d": 15.1,
            "strength_3d": 31.2,
            "strength_28d": s28,
            "chemical_props": {"CaO": 64.2, "SiO₂": 22.0}
        })
    }

    // -- optimization shape ---------------------------------------------------

    #[test]
    fn optimization_payload_keeps_fixed_order_and_ids() {
        // Keys deliberately out of order in the source object.
        let payload = json!({
            "improvement": opt_scenario(0.94, 58.3),
            "Default": opt_scenario(0.92, 58.7),
            "optimum": opt_scenario(0.90, 59.2),
        });

        let results = normalize(payload).unwrap();
        assert_eq!(results.len(), 3);
        let ids: Vec<_> = results.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let kh: Vec<_> = results.iter().map(|s| s.ratios.kh).collect();
        assert_eq!(kh, vec![0.92, 0.90, 0.94]);
        assert_eq!(results.baseline().strength.day_28, 58.7);
        assert_eq!(results.baseline().chemical["CaO"], 64.2);
    }

    #[test]
    fn optimization_payload_inside_envelope() {
        let payload = json!({"code": 0, "data": {"Default": opt_scenario(0.92, 58.7)}});
        let results = normalize(payload).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.baseline().id, 1);
    }

    #[test]
    fn missing_named_scenario_is_skipped_and_ids_stay_sequential() {
        let payload = json!({
            "Default": opt_scenario(0.92, 58.7),
            "improvement": opt_scenario(0.94, 58.3),
            "notes": "ignored",
        });
        let results = normalize(payload).unwrap();
        let ids: Vec<_> = results.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(results.get(2).unwrap().ratios.kh, 0.94);
    }

    #[test]
    fn malformed_scenario_fails_the_whole_payload() {
        let payload = json!({
            "Default": opt_scenario(0.92, 58.7),
            "optimum": {"ratios": {"KH": 0.9}},
        });
        assert_matches!(
            normalize(payload),
            Err(NormalizeError::MalformedScenario { scenario, .. }) if scenario == "optimum"
        );
    }

    // -- prediction shape -----------------------------------------------------

    #[test]
    fn prediction_payload_becomes_single_scenario_without_ratios() {
        let payload = json!({
            "strength_result": {"predictions": {"1d": 14.0, "3d": 30.5, "28d": 57.9}},
            "features_result": {"CaO": 65.0, "MgO": 2.5}
        });
        let results = normalize(payload).unwrap();
        assert_eq!(results.len(), 1);
        let only = results.baseline();
        assert_eq!(only.id, 1);
        assert_eq!(only.ratios, Ratios::default());
        assert_eq!(only.strength.day_3, 30.5);
        assert_eq!(only.chemical.len(), 2);
    }

    #[test]
    fn prediction_without_predictions_is_malformed() {
        let payload = json!({"strength_result": {}, "features_result": {}});
        assert_matches!(normalize(payload), Err(NormalizeError::MalformedPrediction(_)));
    }

    // -- probing --------------------------------------------------------------

    #[test]
    fn probe_prefers_optimization_field() {
        let obj = json!({"Default": {}, "strength_result": {}});
        assert_eq!(
            probe_shape(obj.as_object().unwrap()).unwrap(),
            PayloadShape::Optimization
        );
    }

    #[test]
    fn unknown_shape_reports_fields() {
        let payload = json!({"status": "completed"});
        assert_matches!(
            normalize(payload),
            Err(NormalizeError::UnrecognizedShape { fields }) if fields == "status"
        );
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert_matches!(normalize(json!([1, 2])), Err(NormalizeError::NotAnObject));
        assert_matches!(normalize(json!({"data": null})), Err(NormalizeError::UnrecognizedShape { .. }));
    }

    #[test]
    fn decoded_payload_reports_its_shape() {
        let payload = json!({"strength_result": {"predictions": {"1d": 1.0, "3d": 2.0, "28d": 3.0}}});
        assert_eq!(decode_payload(payload).unwrap().shape(), PayloadShape::Prediction);
    }
}
