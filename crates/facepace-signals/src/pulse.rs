//! Pulse waveform container
//!
//! A raw blood-volume-pulse trace as produced by an rPPG extractor, paired
//! with the capture time of every sample.

use ndarray::Array1;

use crate::error::{SignalError, SignalResult};

/// Time-indexed pulse waveform.
///
/// Invariant: `values.len() == times.len() >= 2` and `times` is strictly
/// increasing (seconds).
#[derive(Debug, Clone)]
pub struct PulseWaveform {
    values: Array1<f64>,
    times: Array1<f64>,
}

impl PulseWaveform {
    pub fn new(values: Vec<f64>, times: Vec<f64>) -> SignalResult<Self> {
        if values.len() != times.len() {
            return Err(SignalError::InvalidWaveform(format!(
                "length mismatch: {} samples, {} timestamps",
                values.len(),
                times.len()
            )));
        }
        if values.len() < 2 {
            return Err(SignalError::InsufficientSamples {
                needed: 2,
                got: values.len(),
            });
        }
        if times.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(SignalError::InvalidWaveform(
                "timestamps must be strictly increasing".to_string(),
            ));
        }

        Ok(Self {
            values: Array1::from(values),
            times: Array1::from(times),
        })
    }

    /// Build a waveform sampled uniformly at `fps`, starting at t = 0.
    pub fn uniform(values: Vec<f64>, fps: f64) -> SignalResult<Self> {
        if !(fps > 0.0) {
            return Err(SignalError::InvalidWaveform(format!("invalid fps {fps}")));
        }
        let times = (0..values.len()).map(|i| i as f64 / fps).collect();
        Self::new(values, times)
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn times(&self) -> &Array1<f64> {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Duration covered by the timestamps, in seconds.
    pub fn duration(&self) -> f64 {
        self.times[self.times.len() - 1] - self.times[0]
    }

    /// Mean sample rate implied by the timestamps.
    pub fn effective_fps(&self) -> f64 {
        (self.len() - 1) as f64 / self.duration()
    }
}
