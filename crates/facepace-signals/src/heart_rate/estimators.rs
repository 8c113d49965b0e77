//! Individual heart-rate estimators
//!
//! Each estimator is a pure function of a conditioned pulse. An estimator
//! either returns a rate in BPM (which the cascade then validates) or a
//! `SignalError` when it cannot produce one.

use ndarray::{s, Array1};

use crate::dsp::peaks::{find_peaks, PeakOptions};
use crate::dsp::spectrum::{compute_heart_rate, dominant_frequency};
use crate::dsp::stats;
use crate::error::{SignalError, SignalResult};
use crate::policy::FilterPolicy;

use super::EstimateTier;

/// Minimum prominence (normalized units) for a beat peak
pub const PEAK_PROMINENCE: f64 = 0.1;
/// Spectral fallback band, exclusive (45-150 BPM)
pub const SPECTRAL_BAND_HZ: (f64, f64) = (0.75, 2.5);
/// Accepted inter-beat interval, exclusive (40-150 BPM)
pub const INTERVAL_BAND_SECS: (f64, f64) = (0.4, 1.5);

/// Low-pass filtered, z-normalized pulse with its timing.
#[derive(Debug, Clone)]
pub struct ConditionedPulse {
    pub values: Array1<f64>,
    pub times: Array1<f64>,
    pub fps: f64,
    pub policy: FilterPolicy,
}

impl ConditionedPulse {
    pub fn from_parts(
        values: Array1<f64>,
        times: Array1<f64>,
        fps: f64,
        policy: FilterPolicy,
    ) -> SignalResult<Self> {
        if values.len() != times.len() {
            return Err(SignalError::InvalidWaveform(
                "values and times differ in length".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SignalError::NonFinite);
        }
        Ok(Self {
            values,
            times,
            fps,
            policy,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Beat peaks: at least a third of a second apart, prominence >= 0.1
    fn beat_peaks(&self) -> Vec<usize> {
        let options = PeakOptions::with_distance(self.fps / 3.0).prominence(PEAK_PROMINENCE);
        find_peaks(self.values.view(), &options)
    }

    /// Intervals in seconds between consecutive peaks
    fn peak_intervals(&self, peaks: &[usize]) -> Array1<f64> {
        let beat_times: Array1<f64> = peaks.iter().map(|&p| self.times[p]).collect();
        stats::diff(beat_times.view())
    }
}

/// One stage of the heart-rate cascade.
pub trait HeartRateEstimator: Send + Sync {
    /// Confidence tier reported when this estimator's value is accepted
    fn tier(&self) -> EstimateTier;

    fn estimate(&self, pulse: &ConditionedPulse) -> SignalResult<f64>;
}

/// Primary estimator: FFT heart rate over sliding windows, median-combined.
///
/// Window length and hop come from the filter policy.
#[derive(Debug, Clone, Default)]
pub struct WindowedSpectralEstimator;

impl HeartRateEstimator for WindowedSpectralEstimator {
    fn tier(&self) -> EstimateTier {
        EstimateTier::Primary
    }

    fn estimate(&self, pulse: &ConditionedPulse) -> SignalResult<f64> {
        let window = pulse.policy.hr_window_size.max(2);
        let hop = pulse.policy.hr_update_interval.max(1);
        if pulse.len() < window {
            return Err(SignalError::InsufficientSamples {
                needed: window,
                got: pulse.len(),
            });
        }

        let mut rates: Vec<f64> = Vec::new();
        let mut start = 0;
        while start + window <= pulse.len() {
            let end = start + window;
            let span = pulse.times[end - 1] - pulse.times[start];
            let fs = (window - 1) as f64 / span;
            let (bpm, snr) = compute_heart_rate(pulse.values.slice(s![start..end]), fs);
            tracing::trace!(start, bpm, snr, "windowed heart rate");
            if bpm > 0.0 {
                rates.push(bpm);
            }
            start += hop;
        }

        Ok(stats::percentile(Array1::from(rates).view(), 50.0).unwrap_or(f64::NAN))
    }
}

/// Fallback 1: mean spacing between detected beat peaks.
#[derive(Debug, Clone, Default)]
pub struct PeakIntervalEstimator;

impl HeartRateEstimator for PeakIntervalEstimator {
    fn tier(&self) -> EstimateTier {
        EstimateTier::PeakInterval
    }

    fn estimate(&self, pulse: &ConditionedPulse) -> SignalResult<f64> {
        let peaks = pulse.beat_peaks();
        if peaks.len() < 2 {
            return Err(SignalError::InsufficientSamples {
                needed: 2,
                got: peaks.len(),
            });
        }
        let mean_interval = pulse.peak_intervals(&peaks).mean().unwrap_or(f64::NAN);
        Ok(60.0 / mean_interval)
    }
}

/// Fallback 2: strongest DFT component in the 45-150 BPM band.
#[derive(Debug, Clone, Default)]
pub struct SpectralPeakEstimator;

impl HeartRateEstimator for SpectralPeakEstimator {
    fn tier(&self) -> EstimateTier {
        EstimateTier::Spectral
    }

    fn estimate(&self, pulse: &ConditionedPulse) -> SignalResult<f64> {
        let (lo, hi) = SPECTRAL_BAND_HZ;
        dominant_frequency(pulse.values.view(), pulse.fps, lo, hi)
            .map(|hz| hz * 60.0)
            .ok_or_else(|| {
                SignalError::InvalidWaveform("no spectral energy in heart-rate band".to_string())
            })
    }
}

/// Fallback 3: mean of physiologically plausible beat intervals.
#[derive(Debug, Clone, Default)]
pub struct AveragedIntervalEstimator;

impl HeartRateEstimator for AveragedIntervalEstimator {
    fn tier(&self) -> EstimateTier {
        EstimateTier::AveragedInterval
    }

    fn estimate(&self, pulse: &ConditionedPulse) -> SignalResult<f64> {
        let peaks = pulse.beat_peaks();
        if peaks.len() < 3 {
            return Err(SignalError::InsufficientSamples {
                needed: 3,
                got: peaks.len(),
            });
        }

        let (lo, hi) = INTERVAL_BAND_SECS;
        let plausible: Array1<f64> = pulse
            .peak_intervals(&peaks)
            .iter()
            .copied()
            .filter(|&dt| dt > lo && dt < hi)
            .collect();

        match plausible.mean() {
            Some(avg) => Ok(60.0 / avg),
            None => Err(SignalError::InsufficientSamples { needed: 1, got: 0 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn pulse_from(values: Array1<f64>, fps: f64) -> ConditionedPulse {
        let times = Array1::from_shape_fn(values.len(), |i| i as f64 / fps);
        ConditionedPulse::from_parts(values, times, fps, FilterPolicy::select(fps, 640, 480))
            .unwrap()
    }

    fn sine(freq: f64, fps: f64, n: usize) -> Array1<f64> {
        Array1::from_shape_fn(n, |i| (2.0 * PI * freq * i as f64 / fps).sin())
    }

    fn spike_train(spikes: &[usize], n: usize) -> Array1<f64> {
        let mut values = Array1::zeros(n);
        for &s in spikes {
            values[s] = 1.0;
        }
        values
    }

    #[test]
    fn test_rejects_non_finite() {
        let policy = FilterPolicy::select(30.0, 640, 480);
        let err = ConditionedPulse::from_parts(
            ndarray::array![0.0, f64::NAN],
            ndarray::array![0.0, 0.1],
            30.0,
            policy,
        )
        .unwrap_err();
        assert_eq!(err, SignalError::NonFinite);
    }

    #[test]
    fn test_windowed_requires_full_window() {
        // Default policy at 30 fps wants 900 samples
        let pulse = pulse_from(Array1::zeros(300), 30.0);
        assert!(matches!(
            WindowedSpectralEstimator.estimate(&pulse),
            Err(SignalError::InsufficientSamples { needed: 900, got: 300 })
        ));
    }

    #[test]
    fn test_windowed_sine() {
        let fps = 30.0;
        let bpm = WindowedSpectralEstimator
            .estimate(&pulse_from(sine(1.2, fps, 1200), fps))
            .unwrap();
        assert_relative_eq!(bpm, 72.0, epsilon = 1.0);
    }

    #[test]
    fn test_peak_interval_spike_train() {
        // Beats every 25 samples at 30 fps -> 0.8333 s -> 72 BPM
        let spikes: Vec<usize> = (0..8).map(|k| 10 + 25 * k).collect();
        let pulse = pulse_from(spike_train(&spikes, 200), 30.0);
        let bpm = PeakIntervalEstimator.estimate(&pulse).unwrap();
        assert_relative_eq!(bpm, 72.0, epsilon = 1e-9);
    }

    #[test]
    fn test_peak_interval_needs_two_peaks() {
        let pulse = pulse_from(spike_train(&[50], 100), 30.0);
        assert!(PeakIntervalEstimator.estimate(&pulse).is_err());
    }

    #[test]
    fn test_spectral_peak_sine() {
        let fps = 30.0;
        let bpm = SpectralPeakEstimator
            .estimate(&pulse_from(sine(1.5, fps, 300), fps))
            .unwrap();
        assert_relative_eq!(bpm, 90.0, epsilon = 1e-6);
    }

    #[test]
    fn test_spectral_peak_flat_signal() {
        let pulse = pulse_from(Array1::zeros(300), 30.0);
        assert!(SpectralPeakEstimator.estimate(&pulse).is_err());
    }

    #[test]
    fn test_averaged_interval_drops_implausible_gaps() {
        // 24-sample beats (0.8 s at 30 fps) with one 60-sample (2.0 s) dropout
        let spikes = [10, 34, 58, 82, 142, 166, 190];
        let pulse = pulse_from(spike_train(&spikes, 220), 30.0);
        let bpm = AveragedIntervalEstimator.estimate(&pulse).unwrap();
        assert_relative_eq!(bpm, 75.0, epsilon = 1e-9);

        // The plain peak-interval estimate is dragged down by the gap
        let naive = PeakIntervalEstimator.estimate(&pulse).unwrap();
        assert!(naive < 70.0);
    }

    #[test]
    fn test_averaged_interval_needs_three_peaks() {
        let pulse = pulse_from(spike_train(&[10, 34], 60), 30.0);
        assert!(AveragedIntervalEstimator.estimate(&pulse).is_err());
    }
}
