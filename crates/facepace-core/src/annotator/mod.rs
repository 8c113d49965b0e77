//! Semantic annotation of a face image
//!
//! After the numeric estimates are in, the orchestrator sends them together
//! with the face image reference to a vision-language model and merges its
//! scored text fields into the result. The annotator is a trait so the
//! hosted model can be swapped for a local one or a mock.
//!
//! # Providers
//!
//! - [`MockAnnotator`]: deterministic, no network
//! - `MistralAnnotator` (feature `annotator-http`): OpenAI-compatible chat
//!   completions with an image part

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod providers;

pub use providers::mock::MockAnnotator;

#[cfg(feature = "annotator-http")]
pub use providers::mistral::MistralAnnotator;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotatorError {
    /// Provider cannot be reached or refused the request
    #[error("annotator not available: {0}")]
    Unavailable(String),
    #[error("annotator timeout after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
    /// Response arrived but is not a well-formed annotation
    #[error("malformed annotation: {0}")]
    Parse(String),
}

/// Numeric context sent along with the face image.
///
/// HRV and ocular fields are `None` when the corresponding estimate was not
/// available for this recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRequest {
    pub image_url: String,
    pub chronological_age: u32,
    pub heart_rate: f64,
    pub sdnn: Option<f64>,
    pub rmssd: Option<f64>,
    pub nn50: Option<usize>,
    pub pnn50: Option<f64>,
    pub pupil_variability: Option<f64>,
    pub gaze_dispersion: Option<f64>,
    pub estimated_saccades: Option<usize>,
}

impl AnnotationRequest {
    /// Instruction text for a vision-language model.
    pub fn prompt(&self) -> String {
        fn fmt_opt<T: std::fmt::Display>(v: &Option<T>) -> String {
            v.as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unavailable".to_string())
        }

        format!(
            "You are assessing the apparent age of the person in this photo. \
             Their calendar age is {age}. Physiological measurements from a short face video:\n\
             - heart_rate: {hr:.1} bpm\n\
             - sdnn: {sdnn} ms\n\
             - rmssd: {rmssd} ms\n\
             - nn50: {nn50}\n\
             - pnn50: {pnn50} %\n\
             - pupil_variability: {pupil} %\n\
             - gaze_dispersion: {gaze} px\n\
             - estimated_saccades: {saccades}\n\n\
             Respond with a single JSON object with exactly these keys: \
             \"age\" (integer estimate of functional age), \"age_explanation\" (string), \
             \"acne_score\" (integer 1-10), \"acne_explanation\" (string), \
             \"eye_bag_score\" (integer 1-10), \"eye_bag_explanation\" (string), \
             \"cognitive_health\" (string).",
            age = self.chronological_age,
            hr = self.heart_rate,
            sdnn = fmt_opt(&self.sdnn.map(|v| format!("{v:.2}"))),
            rmssd = fmt_opt(&self.rmssd.map(|v| format!("{v:.2}"))),
            nn50 = fmt_opt(&self.nn50),
            pnn50 = fmt_opt(&self.pnn50.map(|v| format!("{v:.2}"))),
            pupil = fmt_opt(&self.pupil_variability.map(|v| format!("{v:.2}"))),
            gaze = fmt_opt(&self.gaze_dispersion.map(|v| format!("{v:.2}"))),
            saccades = fmt_opt(&self.estimated_saccades),
        )
    }
}

/// Scored text fields returned by the annotator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Estimated functional age in years
    pub age: u32,
    pub age_explanation: String,
    /// 1..=10
    pub acne_score: u8,
    pub acne_explanation: String,
    /// 1..=10
    pub eye_bag_score: u8,
    pub eye_bag_explanation: String,
    pub cognitive_health: String,
}

/// Semantic annotation backend.
pub trait SemanticAnnotator: Send + Sync {
    fn annotate(&self, request: &AnnotationRequest) -> Result<Annotation, AnnotatorError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Parse model output into an [`Annotation`].
///
/// Accepts a bare JSON object or one wrapped in a fenced code block. Numeric
/// fields may be JSON numbers or numeric strings; scores must be in `1..=10`.
pub fn parse_annotation(text: &str) -> Result<Annotation, AnnotatorError> {
    let json = strip_code_fence(text);
    let value: Value =
        serde_json::from_str(json).map_err(|e| AnnotatorError::Parse(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| AnnotatorError::Parse("expected a JSON object".to_string()))?;

    let age = integer_field(obj, "age")?;
    if !(0..=150).contains(&age) {
        return Err(AnnotatorError::Parse(format!("age {age} out of range")));
    }

    Ok(Annotation {
        age: age as u32,
        age_explanation: text_field(obj, "age_explanation")?,
        acne_score: score_field(obj, "acne_score")?,
        acne_explanation: text_field(obj, "acne_explanation")?,
        eye_bag_score: score_field(obj, "eye_bag_score")?,
        eye_bag_explanation: text_field(obj, "eye_bag_explanation")?,
        cognitive_health: text_field(obj, "cognitive_health")?,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn text_field(obj: &serde_json::Map<String, Value>, key: &str) -> Result<String, AnnotatorError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(AnnotatorError::Parse(format!("field {key} is not text"))),
        None => Err(AnnotatorError::Parse(format!("missing field {key}"))),
    }
}

fn integer_field(obj: &serde_json::Map<String, Value>, key: &str) -> Result<i64, AnnotatorError> {
    let value = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
        None => return Err(AnnotatorError::Parse(format!("missing field {key}"))),
    };
    value
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i64)
        .ok_or_else(|| AnnotatorError::Parse(format!("field {key} is not a number")))
}

fn score_field(obj: &serde_json::Map<String, Value>, key: &str) -> Result<u8, AnnotatorError> {
    let score = integer_field(obj, key)?;
    if !(1..=10).contains(&score) {
        return Err(AnnotatorError::Parse(format!("{key} {score} outside 1..=10")));
    }
    Ok(score as u8)
}
