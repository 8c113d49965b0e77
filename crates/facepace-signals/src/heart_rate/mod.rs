//! Heart-rate estimation cascade
//!
//! Conditions a raw pulse waveform (low-pass + z-score) and runs an ordered
//! list of estimators, stopping at the first one whose value is physiologically
//! acceptable:
//!
//! 1. **Primary** - windowed FFT rate, median across windows
//! 2. **Peak interval** - mean spacing of detected beats
//! 3. **Spectral** - strongest DFT bin in 45-150 BPM
//! 4. **Averaged interval** - mean of plausible beat intervals only
//!
//! If every stage fails the result is the `0 BPM` / `Failed` sentinel. A stage
//! that errors out is indistinguishable from one that returns an invalid rate.
//!
//! # Example
//!
//! ```ignore
//! use facepace_signals::{FilterPolicy, HeartRateCascade, PulseWaveform};
//!
//! let policy = FilterPolicy::select(30.0, 1280, 720);
//! let estimate = HeartRateCascade::new().estimate(&waveform, &policy, 30.0);
//! println!("{:.1} BPM via {:?}", estimate.bpm, estimate.tier);
//! ```

pub mod estimators;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dsp::filters::{apply_filter, ButterworthFactory, FilterFactory};
use crate::dsp::stats;
use crate::error::SignalResult;
use crate::policy::FilterPolicy;
use crate::pulse::PulseWaveform;

pub use estimators::{
    AveragedIntervalEstimator, ConditionedPulse, HeartRateEstimator, PeakIntervalEstimator,
    SpectralPeakEstimator, WindowedSpectralEstimator,
};

/// Upper bound of the acceptance window (exclusive lower bound is 0)
pub const MAX_VALID_BPM: f64 = 180.0;
/// Guard added to the standard deviation during normalization
pub const NORMALIZE_EPSILON: f64 = 1e-10;

/// Which estimator produced the accepted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateTier {
    Primary,
    PeakInterval,
    Spectral,
    AveragedInterval,
    /// No estimator produced an acceptable value
    Failed,
}

/// Cascade output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateEstimate {
    pub bpm: f64,
    pub tier: EstimateTier,
}

impl HeartRateEstimate {
    pub fn failed() -> Self {
        Self {
            bpm: 0.0,
            tier: EstimateTier::Failed,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.tier == EstimateTier::Failed
    }
}

/// Acceptance test: finite and in `(0, 180]`.
pub fn is_valid_bpm(bpm: f64) -> bool {
    bpm.is_finite() && bpm > 0.0 && bpm <= MAX_VALID_BPM
}

/// Ordered multi-method heart-rate estimator.
pub struct HeartRateCascade {
    factory: Arc<dyn FilterFactory>,
    stages: Vec<Box<dyn HeartRateEstimator>>,
}

impl HeartRateCascade {
    /// Butterworth conditioning and the four standard stages.
    pub fn new() -> Self {
        Self::with_factory(Arc::new(ButterworthFactory::new()))
    }

    pub fn with_factory(factory: Arc<dyn FilterFactory>) -> Self {
        Self {
            factory,
            stages: vec![
                Box::new(WindowedSpectralEstimator),
                Box::new(PeakIntervalEstimator),
                Box::new(SpectralPeakEstimator),
                Box::new(AveragedIntervalEstimator),
            ],
        }
    }

    /// Replace the stage list (order is significant).
    pub fn with_stages(mut self, stages: Vec<Box<dyn HeartRateEstimator>>) -> Self {
        self.stages = stages;
        self
    }

    /// Low-pass filter per the policy, then z-score normalize.
    pub fn condition(
        &self,
        waveform: &PulseWaveform,
        policy: &FilterPolicy,
        fps: f64,
    ) -> SignalResult<ConditionedPulse> {
        let mut filter = self.factory.low_pass(policy.cutoff_hz, policy.order, fps)?;
        let filtered = apply_filter(filter.as_mut(), waveform.values().view());
        let normalized = stats::z_normalize(filtered.view(), NORMALIZE_EPSILON);

        ConditionedPulse::from_parts(normalized, waveform.times().clone(), fps, policy.clone())
    }

    /// Run the cascade. Never fails: exhaustion yields [`HeartRateEstimate::failed`].
    pub fn estimate(
        &self,
        waveform: &PulseWaveform,
        policy: &FilterPolicy,
        fps: f64,
    ) -> HeartRateEstimate {
        let pulse = match self.condition(waveform, policy, fps) {
            Ok(pulse) => pulse,
            Err(e) => {
                tracing::debug!(error = %e, "pulse conditioning failed");
                return HeartRateEstimate::failed();
            }
        };

        for stage in &self.stages {
            match stage.estimate(&pulse) {
                Ok(bpm) if is_valid_bpm(bpm) => {
                    tracing::debug!(tier = ?stage.tier(), bpm, "heart rate accepted");
                    return HeartRateEstimate {
                        bpm,
                        tier: stage.tier(),
                    };
                }
                Ok(bpm) => {
                    tracing::debug!(tier = ?stage.tier(), bpm, "heart rate rejected");
                }
                Err(e) => {
                    tracing::debug!(tier = ?stage.tier(), error = %e, "estimator failed");
                }
            }
        }

        tracing::debug!("all heart-rate estimators exhausted");
        HeartRateEstimate::failed()
    }
}

impl Default for HeartRateCascade {
    fn default() -> Self {
        Self::new()
    }
}
