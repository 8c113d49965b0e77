//! Annotator implementations
//!
//! Available providers:
//! - `MockAnnotator` - Always available, for tests and offline runs
//! - `MistralAnnotator` - OpenAI-compatible vision chat API (feature: annotator-http)

pub mod mock;

#[cfg(feature = "annotator-http")]
pub mod mistral;

// Re-exports
pub use mock::MockAnnotator;

#[cfg(feature = "annotator-http")]
pub use mistral::MistralAnnotator;
