//! DSP (Digital Signal Processing) module
//!
//! Signal-processing building blocks shared by the heart-rate cascade and the
//! HRV calculator:
//! - `filters` - low-pass filter trait, factory and Butterworth implementation
//! - `peaks` - local-maximum detection with distance/prominence selection
//! - `spectrum` - FFT heart-rate and dominant-frequency search
//! - `stats` - standard deviation, percentiles, z-scoring, differences

pub mod filters;
pub mod peaks;
pub mod spectrum;
pub mod stats;

pub use filters::{
    apply_filter, ButterworthConfig, ButterworthFactory, ButterworthLowPass, FilterFactory,
    LowPassFilter,
};
pub use peaks::{find_peaks, PeakOptions};
pub use spectrum::{compute_heart_rate, dominant_frequency, hamming_window};
