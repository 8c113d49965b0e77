//! Mock annotator.
//!
//! Returns deterministic annotations without any network access. The reply can
//! be raw model text, which is run through the regular parser, so malformed
//! responses can be exercised end to end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::annotator::{
    parse_annotation, Annotation, AnnotationRequest, AnnotatorError, SemanticAnnotator,
};

#[derive(Debug, Clone)]
enum Reply {
    /// Functional age equal to the calendar age, neutral scores
    Echo,
    Fixed(Annotation),
    Raw(String),
}

/// Mock annotator for testing.
#[derive(Debug)]
pub struct MockAnnotator {
    reply: Reply,

    /// Simulated error returned instead of the reply
    simulate_error: RwLock<Option<AnnotatorError>>,

    /// Call counter for testing
    call_count: AtomicUsize,

    /// Most recent request
    last_request: RwLock<Option<AnnotationRequest>>,
}

impl Default for MockAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnnotator {
    pub fn new() -> Self {
        Self::with_reply(Reply::Echo)
    }

    /// Always return this annotation.
    pub fn with_annotation(annotation: Annotation) -> Self {
        Self::with_reply(Reply::Fixed(annotation))
    }

    /// Reply with raw model text, parsed as a real response would be.
    pub fn with_response_text(text: impl Into<String>) -> Self {
        Self::with_reply(Reply::Raw(text.into()))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            simulate_error: RwLock::new(None),
            call_count: AtomicUsize::new(0),
            last_request: RwLock::new(None),
        }
    }

    /// Fail every call with this error until cleared.
    pub fn simulate_error(&self, error: AnnotatorError) {
        *self
            .simulate_error
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    pub fn clear_error(&self) {
        *self
            .simulate_error
            .write()
            .unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<AnnotationRequest> {
        self.last_request
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl SemanticAnnotator for MockAnnotator {
    fn annotate(&self, request: &AnnotationRequest) -> Result<Annotation, AnnotatorError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_request.write().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        if let Some(error) = self
            .simulate_error
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(error);
        }

        match &self.reply {
            Reply::Echo => Ok(Annotation {
                age: request.chronological_age,
                age_explanation: "Mock estimate matches calendar age".to_string(),
                acne_score: 5,
                acne_explanation: "Mock acne assessment".to_string(),
                eye_bag_score: 5,
                eye_bag_explanation: "Mock eye bag assessment".to_string(),
                cognitive_health: "Mock cognitive assessment".to_string(),
            }),
            Reply::Fixed(annotation) => Ok(annotation.clone()),
            Reply::Raw(text) => parse_annotation(text),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
