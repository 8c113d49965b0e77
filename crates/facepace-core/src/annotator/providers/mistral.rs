//! Mistral (OpenAI-compatible) vision annotator
//!
//! Sends the prompt and the face image reference as a two-part user message
//! to `{base_url}/chat/completions` with JSON output requested. Any endpoint
//! speaking the same protocol works (self-hosted vLLM, other vendors).
//!
//! The API key is never part of the configuration file; it is read from the
//! environment variable named by `AnnotatorConfig::api_key_env`.
//!
//! # Example
//! ```rust,ignore
//! use facepace_core::annotator::MistralAnnotator;
//! use facepace_core::config::AnnotatorConfig;
//!
//! // Reads $MISTRAL_API_KEY
//! let annotator = MistralAnnotator::from_config(&AnnotatorConfig::default())?;
//! ```

use std::time::Duration;

use crate::annotator::{
    parse_annotation, Annotation, AnnotationRequest, AnnotatorError, SemanticAnnotator,
};
use crate::config::AnnotatorConfig;

/// OpenAI-compatible chat-completions annotator.
pub struct MistralAnnotator {
    /// Base URL for API (e.g., "https://api.mistral.ai/v1")
    base_url: String,

    /// Bearer token (can be empty for local servers)
    api_key: String,

    model_name: String,

    timeout: Duration,
}

impl std::fmt::Debug for MistralAnnotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralAnnotator")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl MistralAnnotator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model_name: model.into(),
            timeout: Duration::from_secs(290),
        }
    }

    /// Build from configuration, taking the key from the configured
    /// environment variable.
    pub fn from_config(config: &AnnotatorConfig) -> Result<Self, AnnotatorError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            AnnotatorError::Unavailable(format!(
                "environment variable {} is not set",
                config.api_key_env
            ))
        })?;
        if api_key.trim().is_empty() {
            return Err(AnnotatorError::Unavailable(format!(
                "environment variable {} is empty",
                config.api_key_env
            )));
        }

        Ok(Self::new(&config.base_url, api_key, &config.model)
            .with_timeout(Duration::from_secs(config.timeout_secs)))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model_name
    }

    fn request_body(&self, request: &AnnotationRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.model_name,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        {"type": "text", "text": request.prompt()},
                        {"type": "image_url", "image_url": request.image_url},
                    ]
                }
            ],
            "response_format": {"type": "json_object"},
        })
    }

    fn do_chat(&self, request: &AnnotationRequest) -> Result<String, AnnotatorError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut req = ureq::post(&url).timeout(self.timeout);
        if !self.api_key.is_empty() {
            req = req.set("Authorization", &format!("Bearer {}", self.api_key));
        }

        let response = req
            .set("Content-Type", "application/json")
            .send_json(self.request_body(request))
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => {
                    let body = resp.into_string().unwrap_or_default();
                    AnnotatorError::Unavailable(format!("API error {}: {}", code, body))
                }
                ureq::Error::Transport(t) => {
                    let msg = t.to_string();
                    if msg.contains("timeout") || msg.contains("timed out") {
                        AnnotatorError::Timeout {
                            elapsed_ms: self.timeout.as_millis() as u64,
                        }
                    } else {
                        AnnotatorError::Unavailable(format!("Transport error: {}", msg))
                    }
                }
            })?;

        let json: serde_json::Value = response
            .into_json()
            .map_err(|e| AnnotatorError::Parse(e.to_string()))?;

        message_content(&json)
    }
}

/// Content of the first choice in a chat-completions response.
fn message_content(json: &serde_json::Value) -> Result<String, AnnotatorError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| AnnotatorError::Parse("Missing content in response".to_string()))
}

impl SemanticAnnotator for MistralAnnotator {
    fn annotate(&self, request: &AnnotationRequest) -> Result<Annotation, AnnotatorError> {
        let content = self.do_chat(request)?;
        tracing::debug!(model = %self.model_name, bytes = content.len(), "annotation received");
        parse_annotation(&content)
    }

    fn name(&self) -> &'static str {
        "mistral"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AnnotationRequest {
        AnnotationRequest {
            image_url: "https://example.com/face.jpg".to_string(),
            chronological_age: 28,
            heart_rate: 64.0,
            sdnn: Some(50.0),
            rmssd: Some(40.0),
            nn50: Some(3),
            pnn50: Some(10.0),
            pupil_variability: Some(4.0),
            gaze_dispersion: Some(2.5),
            estimated_saccades: Some(1),
        }
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = AnnotatorConfig {
            api_key_env: "FACEPACE_TEST_UNSET_ANNOTATOR_KEY".to_string(),
            ..AnnotatorConfig::default()
        };
        assert!(matches!(
            MistralAnnotator::from_config(&config),
            Err(AnnotatorError::Unavailable(_))
        ));
    }

    #[test]
    fn test_from_config_reads_env() {
        std::env::set_var("FACEPACE_TEST_ANNOTATOR_KEY", "test-key");
        let config = AnnotatorConfig {
            api_key_env: "FACEPACE_TEST_ANNOTATOR_KEY".to_string(),
            base_url: "http://localhost:8000/v1/".to_string(),
            timeout_secs: 15,
            ..AnnotatorConfig::default()
        };
        let annotator = MistralAnnotator::from_config(&config).unwrap();
        std::env::remove_var("FACEPACE_TEST_ANNOTATOR_KEY");

        assert_eq!(annotator.base_url, "http://localhost:8000/v1");
        assert_eq!(annotator.model(), "pixtral-12b");
        assert_eq!(annotator.timeout, Duration::from_secs(15));
        assert!(!format!("{annotator:?}").contains("test-key"));
    }

    #[test]
    fn test_request_body_shape() {
        let annotator = MistralAnnotator::new("http://localhost/v1", "", "pixtral-12b");
        let body = annotator.request_body(&request());

        assert_eq!(body["model"], "pixtral-12b");
        assert_eq!(body["response_format"]["type"], "json_object");
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["image_url"], "https://example.com/face.jpg");
    }

    #[test]
    fn test_message_content() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"age\": 30}"}}]
        });
        assert_eq!(message_content(&json).unwrap(), "{\"age\": 30}");
        assert!(matches!(
            message_content(&serde_json::json!({"choices": []})),
            Err(AnnotatorError::Parse(_))
        ));
    }
}
