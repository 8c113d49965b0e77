//! # facepace-signals
//!
//! Physiological signal estimation for FacePace.
//!
//! This crate provides:
//! - **Filter policy**: frame-rate / resolution dependent conditioning parameters
//! - **Heart-rate cascade**: four estimators tried in order with validity gating
//! - **HRV**: time-domain metrics from beats detected on the raw waveform
//! - **Ocular dynamics**: pupil, eye-movement and gaze statistics from frames
//! - **DSP / vision primitives** the above are built from
//!
//! ## Example
//!
//! ```ignore
//! use facepace_signals::{FilterPolicy, HeartRateCascade, HrvCalculator, PulseWaveform};
//!
//! let waveform = PulseWaveform::new(values, times)?;
//! let policy = FilterPolicy::select(30.0, 1280, 720);
//!
//! let hr = HeartRateCascade::new().estimate(&waveform, &policy, 30.0);
//! let hrv = HrvCalculator::new().compute(&waveform);
//! println!("{:.1} BPM ({:?}), HRV: {:?}", hr.bpm, hr.tier, hrv);
//! ```

pub mod dsp;
pub mod error;
pub mod heart_rate;
pub mod ocular;
pub mod physio;
pub mod policy;
pub mod pulse;
pub mod vision;

pub use error::{SignalError, SignalResult};
pub use heart_rate::{EstimateTier, HeartRateCascade, HeartRateEstimate, HeartRateEstimator};
pub use ocular::{OcularConfig, OcularDynamicsResult, OcularPipeline, PupilObservation};
pub use physio::{HrvCalculator, HrvMetrics, HrvOutcome};
pub use policy::{FilterPolicy, PolicyRegime};
pub use pulse::PulseWaveform;
pub use vision::Frame;
