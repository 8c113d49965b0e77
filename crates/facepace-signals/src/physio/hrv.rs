//! Heart Rate Variability (HRV) from a raw pulse waveform
//!
//! Beats are detected directly on the unfiltered waveform with a minimum
//! peak separation of one tenth of the recording length, which keeps the
//! detector independent of frame rate and resolution.
//!
//! Time-domain metrics:
//! - **SDNN** - standard deviation of inter-beat intervals (ms)
//! - **RMSSD** - root mean square of successive interval differences (ms)
//! - **NN50** - successive differences larger than 50 ms
//! - **pNN50** - NN50 as a percentage of all intervals

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::dsp::peaks::{find_peaks, PeakOptions};
use crate::dsp::stats;
use crate::pulse::PulseWaveform;

/// Successive-difference threshold for NN50 (ms)
pub const NN50_THRESHOLD_MS: f64 = 50.0;
/// Fewest beats that give at least one successive interval difference
pub const MIN_BEATS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrvMetrics {
    pub sdnn: f64,
    pub rmssd: f64,
    pub nn50: usize,
    pub pnn50: f64,
    pub mean_ibi_ms: f64,
    pub mean_hr_bpm: f64,
    pub beat_count: usize,
}

/// HRV calculation result.
///
/// `InsufficientData` is reported instead of degenerate statistics so that a
/// real SDNN of zero is never confused with "not enough beats".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HrvOutcome {
    Computed(HrvMetrics),
    InsufficientData { beats: usize },
}

impl HrvOutcome {
    pub fn metrics(&self) -> Option<&HrvMetrics> {
        match self {
            Self::Computed(m) => Some(m),
            Self::InsufficientData { .. } => None,
        }
    }
}

/// Stateless HRV calculator
#[derive(Debug, Clone, Default)]
pub struct HrvCalculator;

impl HrvCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(&self, waveform: &PulseWaveform) -> HrvOutcome {
        let values = waveform.values();
        let times = waveform.times();

        let min_distance = (values.len() / 10).max(1) as f64;
        let peaks = find_peaks(values.view(), &PeakOptions::with_distance(min_distance));

        if peaks.len() < MIN_BEATS {
            tracing::debug!(beats = peaks.len(), "not enough beats for HRV");
            return HrvOutcome::InsufficientData { beats: peaks.len() };
        }

        let beat_times: Array1<f64> = peaks.iter().map(|&p| times[p]).collect();
        let ibi_ms = stats::diff(beat_times.view()) * 1000.0;

        HrvOutcome::Computed(metrics_from_intervals(&ibi_ms, peaks.len()))
    }
}

/// Time-domain statistics over inter-beat intervals (ms).
///
/// Callers must pass at least two intervals.
pub fn metrics_from_intervals<'a>(
    ibi_ms: impl Into<ArrayView1<'a, f64>>,
    beat_count: usize,
) -> HrvMetrics {
    let ibi_ms = ibi_ms.into();
    let successive = stats::diff(ibi_ms);

    let sdnn = stats::std_dev(ibi_ms).unwrap_or(0.0);
    let rmssd = successive.mapv(|d| d * d).mean().map(f64::sqrt).unwrap_or(0.0);
    let nn50 = successive
        .iter()
        .filter(|d| d.abs() > NN50_THRESHOLD_MS)
        .count();
    let pnn50 = nn50 as f64 / ibi_ms.len() as f64 * 100.0;

    let mean_ibi_ms = ibi_ms.mean().unwrap_or(0.0);
    let mean_hr_bpm = if mean_ibi_ms > 0.0 {
        60_000.0 / mean_ibi_ms
    } else {
        0.0
    };

    HrvMetrics {
        sdnn,
        rmssd,
        nn50,
        pnn50,
        mean_ibi_ms,
        mean_hr_bpm,
        beat_count,
    }
}
