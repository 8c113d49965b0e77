//! # facepace-core
//!
//! Request orchestration for FacePace biometric estimation.
//!
//! This crate wires the estimators from `facepace-signals` to the outside
//! world:
//! - **Sources**: pulse waveform and decoded frames for a video reference
//! - **Orchestrator**: parallel HR/HRV and ocular tasks, display clamp, assembly
//! - **Annotator**: vision-language scoring of the face image
//! - **Sink**: persistence of flat result records
//! - **Config**: TOML + `FACEPACE_*` environment overrides
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use facepace_core::{
//!     EstimationRequest, FacepaceConfig, FrameSequence, MockAnnotator, NullSink,
//!     Orchestrator, RecordedPulseSource, VideoRef,
//! };
//!
//! let orchestrator = Orchestrator::new(
//!     &FacepaceConfig::default(),
//!     Arc::new(RecordedPulseSource::new()),
//!     Arc::new(FrameSequence::new(frames, 30.0)),
//!     Arc::new(MockAnnotator::new()),
//!     Arc::new(NullSink),
//! )?;
//!
//! let request = EstimationRequest::new(VideoRef::new("pulse.json"), "https://…/face.jpg", 34);
//! let result = orchestrator.run(&request)?;
//! println!("{}", serde_json::to_string_pretty(&result.to_flat_map())?);
//! ```

pub mod annotator;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod result;
pub mod sink;
pub mod source;

pub use annotator::{Annotation, AnnotationRequest, AnnotatorError, MockAnnotator, SemanticAnnotator};
#[cfg(feature = "annotator-http")]
pub use annotator::MistralAnnotator;
pub use config::{ConfigError, FacepaceConfig};
pub use error::{FacepaceError, Result};
pub use orchestrator::{display_heart_rate, EstimationRequest, Orchestrator};
pub use result::{BiometricResult, FunctionalAge, HeartRateReading};
pub use sink::{JsonLinesSink, MemorySink, NullSink, ResultSink, SinkError};
pub use source::{
    FrameSequence, FrameSource, PulseRecording, PulseSignalSource, RecordedPulseSource,
    SourceError, VideoMetadata, VideoRef,
};
