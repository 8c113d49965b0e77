//! Video-derived inputs
//!
//! Decoding video and extracting the raw pulse waveform happen outside this
//! crate. The orchestrator only sees two independent sources keyed by a
//! [`VideoRef`]: one yielding the pulse waveform, one yielding decoded frames.
//! Each call performs its own decode so the two estimation tasks never share
//! a frame iterator.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use facepace_signals::{Frame, PulseWaveform, SignalError};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("video not found: {0}")]
    NotFound(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed recording: {0}")]
    Format(#[from] serde_json::Error),
    #[error("invalid signal: {0}")]
    Signal(#[from] SignalError),
}

/// Opaque reference to a video resource (URL or path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoRef(pub String);

impl VideoRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for VideoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stream properties reported by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

/// Yields the raw pulse waveform for a video.
pub trait PulseSignalSource: Send + Sync {
    fn extract(&self, video: &VideoRef) -> Result<(PulseWaveform, VideoMetadata), SourceError>;
}

/// Yields the decoded frames of a video.
pub trait FrameSource: Send + Sync {
    fn frames(&self, video: &VideoRef) -> Result<(Vec<Frame>, VideoMetadata), SourceError>;
}

/// On-disk pulse recording: `{ "fps", "width", "height", "values", "times"? }`.
///
/// When `times` is omitted samples are assumed uniform at `fps`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseRecording {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<Vec<f64>>,
}

impl PulseRecording {
    pub fn metadata(&self) -> VideoMetadata {
        VideoMetadata {
            fps: self.fps,
            width: self.width,
            height: self.height,
        }
    }

    pub fn to_waveform(&self) -> Result<PulseWaveform, SourceError> {
        let waveform = match &self.times {
            Some(times) => PulseWaveform::new(self.values.clone(), times.clone())?,
            None => PulseWaveform::uniform(self.values.clone(), self.fps)?,
        };
        Ok(waveform)
    }
}

/// Pulse source backed by JSON recordings.
///
/// The video reference is resolved as a file path, relative to `root` when
/// one is set.
#[derive(Debug, Clone, Default)]
pub struct RecordedPulseSource {
    root: Option<PathBuf>,
}

impl RecordedPulseSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, video: &VideoRef) -> PathBuf {
        match &self.root {
            Some(root) => root.join(video.as_str()),
            None => PathBuf::from(video.as_str()),
        }
    }

    pub fn load(path: &Path) -> Result<PulseRecording, SourceError> {
        if !path.exists() {
            return Err(SourceError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl PulseSignalSource for RecordedPulseSource {
    fn extract(&self, video: &VideoRef) -> Result<(PulseWaveform, VideoMetadata), SourceError> {
        let recording = Self::load(&self.resolve(video))?;
        let waveform = recording.to_waveform()?;
        tracing::debug!(video = %video, samples = waveform.len(), fps = recording.fps, "pulse recording loaded");
        Ok((waveform, recording.metadata()))
    }
}

/// Frame source over an already-decoded frame sequence. Every call hands out
/// its own copy.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<Frame>,
    fps: f64,
}

impl FrameSequence {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Self {
        Self { frames, fps }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn metadata(&self) -> VideoMetadata {
        let (width, height) = self
            .frames
            .first()
            .map(|f| (f.width, f.height))
            .unwrap_or((0, 0));
        VideoMetadata {
            fps: self.fps,
            width,
            height,
        }
    }

    /// Load every image in a directory, sorted by file name, as frames.
    #[cfg(feature = "image-processing")]
    pub fn from_image_dir(dir: &Path, fps: f64) -> Result<Self, SourceError> {
        if !dir.is_dir() {
            return Err(SourceError::NotFound(dir.display().to_string()));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let frame_us = if fps > 0.0 { 1_000_000.0 / fps } else { 0.0 };
        let frames = paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                Frame::from_file(path, (i as f64 * frame_us) as i64)
                    .map_err(|e| SourceError::Decode(format!("{}: {}", path.display(), e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(dir = %dir.display(), frames = frames.len(), "frames loaded");
        Ok(Self::new(frames, fps))
    }
}

impl FrameSource for FrameSequence {
    fn frames(&self, _video: &VideoRef) -> Result<(Vec<Frame>, VideoMetadata), SourceError> {
        Ok((self.frames.clone(), self.metadata()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_recorded_source_uniform() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"fps": 30.0, "width": 640, "height": 480, "values": [0.1, 0.5, 0.2, 0.4]}}"#
        )
        .unwrap();

        let source = RecordedPulseSource::new();
        let video = VideoRef::new(file.path().to_string_lossy());
        let (waveform, meta) = source.extract(&video).unwrap();

        assert_eq!(waveform.len(), 4);
        assert_eq!(meta.width, 640);
        assert_eq!(meta.fps, 30.0);
    }

    #[test]
    fn test_recorded_source_with_times() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"fps": 30.0, "width": 640, "height": 480, "values": [1.0, 2.0, 3.0], "times": [0.0, 0.04, 0.07]}}"#
        )
        .unwrap();

        let (waveform, _) = RecordedPulseSource::new()
            .extract(&VideoRef::new(file.path().to_string_lossy()))
            .unwrap();
        assert_eq!(waveform.times()[2], 0.07);
    }

    #[test]
    fn test_recorded_source_errors() {
        let source = RecordedPulseSource::with_root("/nonexistent");
        assert!(matches!(
            source.extract(&VideoRef::new("clip.json")),
            Err(SourceError::NotFound(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            RecordedPulseSource::new().extract(&VideoRef::new(file.path().to_string_lossy())),
            Err(SourceError::Format(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"fps": 30.0, "width": 1, "height": 1, "values": [1.0]}}"#).unwrap();
        assert!(matches!(
            RecordedPulseSource::new().extract(&VideoRef::new(file.path().to_string_lossy())),
            Err(SourceError::Signal(_))
        ));
    }

    #[test]
    fn test_frame_sequence_hands_out_copies() {
        let seq = FrameSequence::new(vec![Frame::filled(8, 6, [1, 2, 3]); 3], 25.0);
        let video = VideoRef::new("any");

        let (mut first, meta) = seq.frames(&video).unwrap();
        first.clear();
        let (second, _) = seq.frames(&video).unwrap();

        assert_eq!(second.len(), 3);
        assert_eq!((meta.width, meta.height, meta.fps), (8, 6, 25.0));
    }

    #[test]
    fn test_empty_frame_sequence_metadata() {
        let meta = FrameSequence::new(Vec::new(), 30.0).metadata();
        assert_eq!((meta.width, meta.height), (0, 0));
    }
}
