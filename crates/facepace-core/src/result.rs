//! Assembled per-request result

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use facepace_signals::{EstimateTier, HrvOutcome, OcularDynamicsResult};

use crate::annotator::Annotation;

/// Heart rate as shown to the user alongside the cascade's raw value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateReading {
    /// Display value after the product clamp
    pub display_bpm: f64,
    /// Cascade output, `0` when estimation failed
    pub raw_bpm: f64,
    pub clamped: bool,
    pub tier: EstimateTier,
}

/// Annotated functional age against the calendar age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalAge {
    pub functional_age: u32,
    /// `functional_age - chronological_age`
    pub age_difference: i64,
    /// "N years younger" / "N years older" / "the same"
    pub biological_age_difference: String,
}

impl FunctionalAge {
    pub fn new(functional_age: u32, chronological_age: u32) -> Self {
        let age_difference = functional_age as i64 - chronological_age as i64;
        let biological_age_difference = match age_difference {
            0 => "the same".to_string(),
            d if d < 0 => format!("{} years younger", -d),
            d => format!("{} years older", d),
        };
        Self {
            functional_age,
            age_difference,
            biological_age_difference,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricResult {
    pub image_url: String,
    pub chronological_age: u32,
    pub heart_rate: HeartRateReading,
    pub hrv: HrvOutcome,
    pub ocular: OcularDynamicsResult,
    pub annotation: Annotation,
    pub functional_age: FunctionalAge,
}

impl BiometricResult {
    /// Flatten into a single-level record for storage. HR and HRV are plain
    /// numbers (`null` when HRV was not computable), ocular sections stay
    /// nested objects, annotation fields are copied as-is.
    pub fn to_flat_map(&self) -> Map<String, Value> {
        let mut map = Map::new();

        map.insert("image_url".into(), Value::from(self.image_url.clone()));
        map.insert("chronological_age".into(), Value::from(self.chronological_age));

        map.insert("heart_rate".into(), Value::from(self.heart_rate.display_bpm));
        map.insert("heart_rate_raw".into(), Value::from(self.heart_rate.raw_bpm));
        map.insert("heart_rate_clamped".into(), Value::from(self.heart_rate.clamped));
        map.insert("heart_rate_tier".into(), to_value(&self.heart_rate.tier));

        let metrics = self.hrv.metrics();
        map.insert(
            "hrv_status".into(),
            Value::from(if metrics.is_some() { "computed" } else { "insufficient_data" }),
        );
        map.insert("sdnn".into(), metrics.map(|m| m.sdnn).into());
        map.insert("rmssd".into(), metrics.map(|m| m.rmssd).into());
        map.insert("nn50".into(), metrics.map(|m| m.nn50 as u64).into());
        map.insert("pnn50".into(), metrics.map(|m| m.pnn50).into());

        map.insert("pupil_dynamics".into(), to_value(&self.ocular.pupil_dynamics));
        map.insert("eye_movements".into(), to_value(&self.ocular.eye_movements));
        map.insert("gaze_dispersion".into(), to_value(&self.ocular.gaze_dispersion));
        map.insert(
            "pupil_response_time".into(),
            to_value(&self.ocular.pupil_response_time),
        );
        map.insert("total_frames".into(), Value::from(self.ocular.total_frames as u64));

        let a = &self.annotation;
        map.insert("age".into(), Value::from(a.age));
        map.insert("age_explanation".into(), Value::from(a.age_explanation.clone()));
        map.insert("acne_score".into(), Value::from(a.acne_score));
        map.insert("acne_explanation".into(), Value::from(a.acne_explanation.clone()));
        map.insert("eye_bag_score".into(), Value::from(a.eye_bag_score));
        map.insert(
            "eye_bag_explanation".into(),
            Value::from(a.eye_bag_explanation.clone()),
        );
        map.insert("cognitive_health".into(), Value::from(a.cognitive_health.clone()));

        map.insert(
            "functional_age".into(),
            Value::from(self.functional_age.functional_age),
        );
        map.insert(
            "age_difference".into(),
            Value::from(self.functional_age.age_difference),
        );
        map.insert(
            "biological_age_difference".into(),
            Value::from(self.functional_age.biological_age_difference.clone()),
        );

        map
    }
}

// Serialization of these plain data types cannot fail; fall back to null.
fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use facepace_signals::physio::metrics_from_intervals;

    fn annotation(age: u32) -> Annotation {
        Annotation {
            age,
            age_explanation: "a".to_string(),
            acne_score: 3,
            acne_explanation: "b".to_string(),
            eye_bag_score: 6,
            eye_bag_explanation: "c".to_string(),
            cognitive_health: "d".to_string(),
        }
    }

    fn result(hrv: HrvOutcome) -> BiometricResult {
        BiometricResult {
            image_url: "https://example.com/face.jpg".to_string(),
            chronological_age: 40,
            heart_rate: HeartRateReading {
                display_bpm: 98.0,
                raw_bpm: 121.4,
                clamped: true,
                tier: EstimateTier::Spectral,
            },
            hrv,
            ocular: OcularDynamicsResult::empty(0),
            annotation: annotation(35),
            functional_age: FunctionalAge::new(35, 40),
        }
    }

    #[test]
    fn test_functional_age_text() {
        assert_eq!(FunctionalAge::new(35, 40).biological_age_difference, "5 years younger");
        assert_eq!(FunctionalAge::new(47, 40).biological_age_difference, "7 years older");
        assert_eq!(FunctionalAge::new(40, 40).biological_age_difference, "the same");
        assert_eq!(FunctionalAge::new(35, 40).age_difference, -5);
    }

    #[test]
    fn test_flat_map_with_hrv() {
        let metrics = metrics_from_intervals(&[800.0, 800.0, 800.0], 4);
        let map = result(HrvOutcome::Computed(metrics)).to_flat_map();

        assert_eq!(map["heart_rate"], 98.0);
        assert_eq!(map["heart_rate_raw"], 121.4);
        assert_eq!(map["heart_rate_clamped"], true);
        assert_eq!(map["heart_rate_tier"], "spectral");
        assert_eq!(map["hrv_status"], "computed");
        assert_eq!(map["nn50"], 0);
        assert_eq!(map["sdnn"], 0.0);
        assert_eq!(map["acne_score"], 3);
        assert_eq!(map["age_difference"], -5);
        assert_eq!(map["biological_age_difference"], "5 years younger");
        assert!(map["pupil_dynamics"].is_null());
        assert_eq!(map["total_frames"], 0);
    }

    #[test]
    fn test_flat_map_insufficient_hrv_is_null() {
        let map = result(HrvOutcome::InsufficientData { beats: 1 }).to_flat_map();
        assert_eq!(map["hrv_status"], "insufficient_data");
        assert!(map["sdnn"].is_null());
        assert!(map["pnn50"].is_null());
    }

    #[test]
    fn test_flat_map_values_are_flat_or_section_objects() {
        let map = result(HrvOutcome::InsufficientData { beats: 0 }).to_flat_map();
        let nested = ["pupil_dynamics", "eye_movements", "gaze_dispersion", "pupil_response_time"];
        for (key, value) in &map {
            if !nested.contains(&key.as_str()) {
                assert!(!value.is_object() && !value.is_array(), "{key} is nested");
            }
        }
    }
}
