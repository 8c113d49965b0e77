use std::f64::consts::PI;
use std::sync::Arc;

use approx::assert_relative_eq;
use facepace_core::annotator::AnnotatorError;
use facepace_core::sink::SinkError;
use facepace_core::source::SourceError;
use facepace_core::{
    EstimationRequest, FacepaceConfig, FacepaceError, FrameSequence, FrameSource, MemorySink,
    MockAnnotator, Orchestrator, PulseSignalSource, ResultSink, VideoMetadata, VideoRef,
};
use facepace_signals::heart_rate::{ConditionedPulse, HeartRateEstimator};
use facepace_signals::{EstimateTier, Frame, HeartRateCascade, PulseWaveform, SignalResult};

/// 1 Hz sine at 60 fps, 1080p
struct SinePulse;

impl PulseSignalSource for SinePulse {
    fn extract(&self, _video: &VideoRef) -> Result<(PulseWaveform, VideoMetadata), SourceError> {
        let fps = 60.0;
        let values = (0..1800)
            .map(|i| (2.0 * PI * i as f64 / fps).sin())
            .collect();
        let waveform = PulseWaveform::uniform(values, fps)?;
        Ok((
            waveform,
            VideoMetadata {
                fps,
                width: 1920,
                height: 1080,
            },
        ))
    }
}

struct MissingVideo;

impl PulseSignalSource for MissingVideo {
    fn extract(&self, video: &VideoRef) -> Result<(PulseWaveform, VideoMetadata), SourceError> {
        Err(SourceError::NotFound(video.to_string()))
    }
}

/// Frame decoder that gives up partway through the clip
struct CorruptFrames;

impl FrameSource for CorruptFrames {
    fn frames(&self, _video: &VideoRef) -> Result<(Vec<Frame>, VideoMetadata), SourceError> {
        Err(SourceError::Decode("frame 17 corrupt".to_string()))
    }
}

struct BrokenSink;

impl ResultSink for BrokenSink {
    fn store(&self, _record: &serde_json::Map<String, serde_json::Value>) -> Result<(), SinkError> {
        Err(SinkError::Rejected("read-only".to_string()))
    }
}

struct PanickingStage;

impl HeartRateEstimator for PanickingStage {
    fn tier(&self) -> EstimateTier {
        EstimateTier::Primary
    }

    fn estimate(&self, _pulse: &ConditionedPulse) -> SignalResult<f64> {
        panic!("estimator exploded");
    }
}

/// Frames with one eye whose pupil drifts right by a pixel per frame
fn eye_frames(n: u32) -> Vec<Frame> {
    (0..n)
        .map(|i| {
            let mut frame = Frame::filled(160, 120, [200, 200, 200]);
            frame.fill_rect(50, 35, 50, 50, [60, 60, 60]);
            frame.fill_rect(60 + i, 55, 10, 10, [10, 10, 10]);
            frame
        })
        .collect()
}

fn request() -> EstimationRequest {
    EstimationRequest::new(VideoRef::new("clip.mp4"), "https://example.com/face.jpg", 40)
}

fn orchestrator(
    pulse: Arc<dyn PulseSignalSource>,
    frames: Vec<Frame>,
    annotator: Arc<MockAnnotator>,
    sink: Arc<dyn ResultSink>,
) -> Orchestrator {
    Orchestrator::new(
        &FacepaceConfig::default(),
        pulse,
        Arc::new(FrameSequence::new(frames, 30.0)),
        annotator,
        sink,
    )
    .expect("orchestrator")
}

#[test]
fn test_full_run() {
    let annotator = Arc::new(MockAnnotator::new());
    let sink = Arc::new(MemorySink::new());
    let orch = orchestrator(Arc::new(SinePulse), eye_frames(10), annotator.clone(), sink.clone());

    let result = orch.run(&request()).expect("result");

    assert!(!result.heart_rate.clamped);
    assert!(
        (result.heart_rate.display_bpm - 60.0).abs() < 3.0,
        "got {}",
        result.heart_rate.display_bpm
    );
    assert_eq!(result.heart_rate.display_bpm, result.heart_rate.raw_bpm);
    assert!(result.hrv.metrics().is_some());

    let gaze = result.ocular.gaze_dispersion.as_ref().expect("gaze");
    assert_relative_eq!(gaze.horizontal, (99.0f64 / 12.0).sqrt(), epsilon = 1e-9);
    assert_eq!(result.ocular.total_frames, 10);

    assert_eq!(result.functional_age.biological_age_difference, "the same");

    // Annotator saw both task outputs
    let sent = annotator.last_request().expect("annotation request");
    assert_eq!(sent.heart_rate, result.heart_rate.raw_bpm);
    assert!(sent.sdnn.is_some());
    assert!(sent.gaze_dispersion.is_some());

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["chronological_age"], 40);
    assert!(records[0]["gaze_dispersion"].is_object());
}

#[test]
fn test_no_frames_still_completes() {
    let sink = Arc::new(MemorySink::new());
    let orch = orchestrator(
        Arc::new(SinePulse),
        Vec::new(),
        Arc::new(MockAnnotator::new()),
        sink.clone(),
    );

    let result = orch.run(&request()).expect("result");

    assert!(result.ocular.is_empty());
    assert_eq!(result.ocular.total_frames, 0);
    assert_ne!(result.heart_rate.tier, EstimateTier::Failed);
    assert!(result.hrv.metrics().is_some());

    let record = &sink.records()[0];
    assert!(record["pupil_dynamics"].is_null());
    assert!(record["eye_movements"].is_null());
}

#[test]
fn test_panicking_task_becomes_sentinel() {
    let orch = orchestrator(
        Arc::new(SinePulse),
        eye_frames(4),
        Arc::new(MockAnnotator::new()),
        Arc::new(MemorySink::new()),
    )
    .with_cascade(HeartRateCascade::new().with_stages(vec![Box::new(PanickingStage)]));

    let result = orch.run(&request()).expect("result");

    assert_eq!(result.heart_rate.raw_bpm, 0.0);
    assert_eq!(result.heart_rate.tier, EstimateTier::Failed);
    assert_eq!(result.heart_rate.display_bpm, 45.0);
    assert!(result.heart_rate.clamped);
    assert!(result.hrv.metrics().is_none());
    // The ocular task is unaffected
    assert!(result.ocular.gaze_dispersion.is_some());
}

#[test]
fn test_source_unavailable_aborts() {
    let annotator = Arc::new(MockAnnotator::new());
    let orch = orchestrator(
        Arc::new(MissingVideo),
        eye_frames(2),
        annotator.clone(),
        Arc::new(MemorySink::new()),
    );

    assert!(matches!(
        orch.run(&request()),
        Err(FacepaceError::SourceUnavailable(_))
    ));
    assert_eq!(annotator.call_count(), 0);
}

#[test]
fn test_frame_decode_failure_keeps_pulse_results() {
    let annotator = Arc::new(MockAnnotator::new());
    let sink = Arc::new(MemorySink::new());
    let orch = Orchestrator::new(
        &FacepaceConfig::default(),
        Arc::new(SinePulse),
        Arc::new(CorruptFrames),
        annotator.clone(),
        sink.clone(),
    )
    .expect("orchestrator");

    let result = orch.run(&request()).expect("result");

    assert_ne!(result.heart_rate.tier, EstimateTier::Failed);
    assert!(
        (result.heart_rate.raw_bpm - 60.0).abs() < 3.0,
        "got {}",
        result.heart_rate.raw_bpm
    );
    assert!(result.hrv.metrics().is_some());
    assert!(result.ocular.is_empty());
    assert_eq!(result.ocular.total_frames, 0);

    assert_eq!(annotator.call_count(), 1);
    assert!(annotator.last_request().expect("annotation request").gaze_dispersion.is_none());
    assert_eq!(sink.records().len(), 1);
}

#[test]
fn test_invalid_request_rejected() {
    let orch = orchestrator(
        Arc::new(SinePulse),
        eye_frames(2),
        Arc::new(MockAnnotator::new()),
        Arc::new(MemorySink::new()),
    );
    let request = EstimationRequest::new(VideoRef::new("clip.mp4"), "", 40);
    assert!(matches!(
        orch.run(&request),
        Err(FacepaceError::InvalidRequest(_))
    ));
}

#[test]
fn test_annotation_parse_failure_is_request_error() {
    let sink = Arc::new(MemorySink::new());
    let orch = orchestrator(
        Arc::new(SinePulse),
        eye_frames(2),
        Arc::new(MockAnnotator::with_response_text("Looks about thirty.")),
        sink.clone(),
    );

    assert!(matches!(
        orch.run(&request()),
        Err(FacepaceError::AnnotationParse(_))
    ));
    assert!(sink.is_empty());
}

#[test]
fn test_annotator_timeout_is_unavailable() {
    let annotator = Arc::new(MockAnnotator::new());
    annotator.simulate_error(AnnotatorError::Timeout { elapsed_ms: 290_000 });
    let orch = orchestrator(
        Arc::new(SinePulse),
        eye_frames(2),
        annotator,
        Arc::new(MemorySink::new()),
    );

    assert!(matches!(
        orch.run(&request()),
        Err(FacepaceError::AnnotatorUnavailable(_))
    ));
}

#[test]
fn test_sink_failure_is_not_fatal() {
    let orch = orchestrator(
        Arc::new(SinePulse),
        eye_frames(2),
        Arc::new(MockAnnotator::new()),
        Arc::new(BrokenSink),
    );
    assert!(orch.run(&request()).is_ok());
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = FacepaceConfig::default();
    config.orchestrator.worker_threads = 0;
    let result = Orchestrator::new(
        &config,
        Arc::new(SinePulse),
        Arc::new(FrameSequence::new(Vec::new(), 30.0)),
        Arc::new(MockAnnotator::new()),
        Arc::new(MemorySink::new()),
    );
    assert!(matches!(result, Err(FacepaceError::Config(_))));
}
