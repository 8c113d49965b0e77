//! Physiological estimators built on top of rPPG/BVP waveforms.
//!
//! Notes:
//! - HR is typically more reliable than HRV when using camera-based rPPG.
//! - HRV here is time-domain only; frequency-domain HRV needs far longer
//!   recordings than a face scan provides.

mod hrv;

pub use hrv::{metrics_from_intervals, HrvCalculator, HrvMetrics, HrvOutcome, MIN_BEATS, NN50_THRESHOLD_MS};
