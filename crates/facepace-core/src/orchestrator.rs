//! Estimation orchestrator
//!
//! One request flows through:
//! 1. request validation
//! 2. pulse extraction
//! 3. two parallel tasks on a fixed worker pool:
//!    - A: filter policy, heart-rate cascade, HRV
//!    - B: frame decode, ocular dynamics
//! 4. semantic annotation with the numeric results
//! 5. display clamp, assembly, persistence
//!
//! Task failures (including panics) become sentinels: `0 BPM / Failed`,
//! `HrvOutcome::InsufficientData`, an empty ocular record. Frames that fail
//! to decode only cost the ocular section. Only structural problems abort a
//! request: bad input, an unavailable pulse source, or an annotator that
//! fails or answers with something unparseable.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use facepace_signals::{
    FilterPolicy, HeartRateCascade, HeartRateEstimate, HrvCalculator, HrvOutcome,
    OcularDynamicsResult, OcularPipeline,
};

use crate::annotator::{AnnotationRequest, SemanticAnnotator};
use crate::config::{ConfigError, FacepaceConfig, OrchestratorConfig};
use crate::error::{FacepaceError, Result};
use crate::result::{BiometricResult, FunctionalAge, HeartRateReading};
use crate::sink::ResultSink;
use crate::source::{FrameSource, PulseSignalSource, VideoRef};

/// Accepted calendar ages
pub const AGE_RANGE: std::ops::RangeInclusive<u32> = 1..=120;

/// Incoming analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationRequest {
    pub video: VideoRef,
    pub image_url: String,
    pub chronological_age: Option<u32>,
}

impl EstimationRequest {
    pub fn new(video: VideoRef, image_url: impl Into<String>, chronological_age: u32) -> Self {
        Self {
            video,
            image_url: image_url.into(),
            chronological_age: Some(chronological_age),
        }
    }

    /// Check required fields; returns the calendar age.
    pub fn validate(&self) -> Result<u32> {
        if self.video.is_empty() {
            return Err(FacepaceError::InvalidRequest("missing video reference".into()));
        }
        if self.image_url.trim().is_empty() {
            return Err(FacepaceError::InvalidRequest("missing image reference".into()));
        }
        let age = self
            .chronological_age
            .ok_or_else(|| FacepaceError::InvalidRequest("missing age".into()))?;
        if !AGE_RANGE.contains(&age) {
            return Err(FacepaceError::InvalidRequest(format!(
                "age {age} outside {}..={}",
                AGE_RANGE.start(),
                AGE_RANGE.end()
            )));
        }
        Ok(age)
    }
}

/// Map the cascade value to the product display range.
///
/// Returns `(display_bpm, clamped)`.
pub fn display_heart_rate(raw_bpm: f64, config: &OrchestratorConfig) -> (f64, bool) {
    if raw_bpm < config.display_min_bpm {
        (config.display_floor_bpm, true)
    } else if raw_bpm > config.display_max_bpm {
        (config.display_ceiling_bpm, true)
    } else {
        (raw_bpm, false)
    }
}

struct PulseOutcome {
    heart_rate: HeartRateEstimate,
    hrv: HrvOutcome,
}

pub struct Orchestrator {
    pulse_source: Arc<dyn PulseSignalSource>,
    frame_source: Arc<dyn FrameSource>,
    annotator: Arc<dyn SemanticAnnotator>,
    sink: Arc<dyn ResultSink>,
    cascade: HeartRateCascade,
    hrv: HrvCalculator,
    ocular: OcularPipeline,
    config: OrchestratorConfig,
    pool: rayon::ThreadPool,
}

impl Orchestrator {
    pub fn new(
        config: &FacepaceConfig,
        pulse_source: Arc<dyn PulseSignalSource>,
        frame_source: Arc<dyn FrameSource>,
        annotator: Arc<dyn SemanticAnnotator>,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.orchestrator.worker_threads)
            .thread_name(|i| format!("facepace-worker-{i}"))
            .build()
            .map_err(|e| ConfigError::Validation(format!("worker pool: {e}")))?;

        Ok(Self {
            pulse_source,
            frame_source,
            annotator,
            sink,
            cascade: HeartRateCascade::new(),
            hrv: HrvCalculator::new(),
            ocular: OcularPipeline::with_config(config.ocular.clone()),
            config: config.orchestrator.clone(),
            pool,
        })
    }

    /// Replace the heart-rate cascade (custom stages or filter factory).
    pub fn with_cascade(mut self, cascade: HeartRateCascade) -> Self {
        self.cascade = cascade;
        self
    }

    /// Decode frames and segment them. A decode failure yields an empty record.
    fn ocular_dynamics(&self, video: &VideoRef) -> OcularDynamicsResult {
        match self.frame_source.frames(video) {
            Ok((frames, meta)) => self.ocular.analyze(&frames, meta.fps),
            Err(e) => {
                tracing::warn!(video = %video, error = %e, "frame decode failed, skipping ocular dynamics");
                OcularDynamicsResult::empty(0)
            }
        }
    }

    pub fn run(&self, request: &EstimationRequest) -> Result<BiometricResult> {
        let chronological_age = request.validate()?;
        tracing::info!(video = %request.video, "estimation started");

        let (waveform, pulse_meta) = self.pulse_source.extract(&request.video)?;

        let (pulse, ocular) = self.pool.join(
            || {
                catch_unwind(AssertUnwindSafe(|| {
                    let policy =
                        FilterPolicy::select(pulse_meta.fps, pulse_meta.width, pulse_meta.height);
                    tracing::debug!(regime = ?policy.regime, cutoff_hz = policy.cutoff_hz, "filter policy selected");
                    PulseOutcome {
                        heart_rate: self.cascade.estimate(&waveform, &policy, pulse_meta.fps),
                        hrv: self.hrv.compute(&waveform),
                    }
                }))
            },
            || catch_unwind(AssertUnwindSafe(|| self.ocular_dynamics(&request.video))),
        );

        let pulse = pulse.unwrap_or_else(|_| {
            tracing::warn!("heart-rate task panicked, using sentinel");
            PulseOutcome {
                heart_rate: HeartRateEstimate::failed(),
                hrv: HrvOutcome::InsufficientData { beats: 0 },
            }
        });
        let ocular = ocular.unwrap_or_else(|_| {
            tracing::warn!("ocular task panicked, using empty record");
            OcularDynamicsResult::empty(0)
        });

        if pulse.heart_rate.is_failed() {
            tracing::warn!("heart rate could not be determined");
        }
        if ocular.is_empty() {
            tracing::warn!(frames = ocular.total_frames, "no ocular observations");
        }

        let annotation_request = AnnotationRequest {
            image_url: request.image_url.clone(),
            chronological_age,
            heart_rate: pulse.heart_rate.bpm,
            sdnn: pulse.hrv.metrics().map(|m| m.sdnn),
            rmssd: pulse.hrv.metrics().map(|m| m.rmssd),
            nn50: pulse.hrv.metrics().map(|m| m.nn50),
            pnn50: pulse.hrv.metrics().map(|m| m.pnn50),
            pupil_variability: ocular
                .pupil_dynamics
                .as_ref()
                .map(|p| p.coefficient_of_variation),
            gaze_dispersion: ocular.gaze_dispersion.as_ref().map(|g| g.total),
            estimated_saccades: ocular.eye_movements.as_ref().map(|m| m.estimated_saccades),
        };
        let annotation = self.annotator.annotate(&annotation_request).map_err(|e| {
            tracing::warn!(annotator = self.annotator.name(), error = %e, "annotation failed");
            FacepaceError::from(e)
        })?;

        let (display_bpm, clamped) = display_heart_rate(pulse.heart_rate.bpm, &self.config);
        let functional_age = FunctionalAge::new(annotation.age, chronological_age);

        let result = BiometricResult {
            image_url: request.image_url.clone(),
            chronological_age,
            heart_rate: HeartRateReading {
                display_bpm,
                raw_bpm: pulse.heart_rate.bpm,
                clamped,
                tier: pulse.heart_rate.tier,
            },
            hrv: pulse.hrv,
            ocular,
            annotation,
            functional_age,
        };

        if let Err(e) = self.sink.store(&result.to_flat_map()) {
            tracing::warn!(error = %e, "failed to persist result");
        }

        tracing::info!(
            video = %request.video,
            heart_rate = display_bpm,
            tier = ?result.heart_rate.tier,
            functional_age = result.functional_age.functional_age,
            "estimation finished"
        );
        Ok(result)
    }
}
