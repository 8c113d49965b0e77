//! FFT-based frequency analysis
//!
//! Heart-rate estimation from the dominant spectral component of a pulse
//! signal.

use std::f64::consts::PI;

use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;
use rustfft::FftPlanner;

/// Lower edge of the windowed-estimator search band (40 BPM)
pub const HR_BAND_MIN_HZ: f64 = 0.67;
/// Upper edge of the windowed-estimator search band (180 BPM)
pub const HR_BAND_MAX_HZ: f64 = 3.0;

/// Hamming window coefficients
pub fn hamming_window(size: usize) -> Array1<f64> {
    if size < 2 {
        return Array1::ones(size);
    }
    Array1::from_shape_fn(size, |i| {
        0.54 - 0.46 * ((2.0 * PI * i as f64) / (size - 1) as f64).cos()
    })
}

fn forward_fft(samples: ArrayView1<f64>) -> Vec<Complex64> {
    let n = samples.len();
    let mut buffer: Vec<Complex64> = samples.iter().map(|&s| Complex64::new(s, 0.0)).collect();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);
    buffer
}

/// Heart rate (BPM) and SNR (dB) of a windowed signal.
///
/// Applies a Hamming window, searches the power spectrum between
/// [`HR_BAND_MIN_HZ`] and [`HR_BAND_MAX_HZ`], and refines the peak with
/// parabolic interpolation. Returns `(0.0, 0.0)` when the signal is too
/// short or carries no power in band.
pub fn compute_heart_rate(signal: ArrayView1<f64>, fs: f64) -> (f64, f64) {
    let n = signal.len();
    if n < 2 || !(fs > 0.0) {
        return (0.0, 0.0);
    }

    // 1. Hamming window + FFT
    let windowed = &signal * &hamming_window(n);
    let buffer = forward_fft(windowed.view());

    // 2. Power spectrum (positive frequencies)
    let half_n = n / 2;
    let power_spectrum: Vec<f64> = buffer.iter().take(half_n).map(|c| c.norm_sqr()).collect();

    // 3. Peak in physiological range
    let bin_res = fs / n as f64;
    let min_bin = (HR_BAND_MIN_HZ / bin_res).ceil() as usize;
    let max_bin = ((HR_BAND_MAX_HZ / bin_res) as usize).min(half_n.saturating_sub(1));

    let mut max_power = 0.0;
    let mut peak_bin = 0;
    let mut total_power = 0.0;

    for (i, &power) in power_spectrum
        .iter()
        .enumerate()
        .take(max_bin + 1)
        .skip(min_bin.max(1))
    {
        if power > max_power {
            max_power = power;
            peak_bin = i;
        }
        total_power += power;
    }

    if peak_bin == 0 {
        return (0.0, 0.0);
    }

    // 4. SNR
    let noise = total_power - max_power;
    let snr = if noise > 0.0 {
        10.0 * (max_power / noise).log10()
    } else {
        0.0
    };

    // 5. Parabolic interpolation for sub-bin accuracy
    let refined_bin = if peak_bin + 1 < power_spectrum.len() {
        let y_m1 = power_spectrum[peak_bin - 1];
        let y_0 = power_spectrum[peak_bin];
        let y_p1 = power_spectrum[peak_bin + 1];
        let denom = y_m1 - 2.0 * y_0 + y_p1;
        if denom.abs() > 1e-12 {
            let delta = 0.5 * (y_m1 - y_p1) / denom;
            if delta.is_finite() && delta.abs() <= 1.0 {
                peak_bin as f64 + delta
            } else {
                peak_bin as f64
            }
        } else {
            peak_bin as f64
        }
    } else {
        peak_bin as f64
    };

    (refined_bin * bin_res * 60.0, snr)
}

/// Frequency (Hz) of the largest-magnitude DFT bin strictly inside
/// `(min_hz, max_hz)`, using the raw (unwindowed) spectrum.
///
/// Returns `None` when no bin falls inside the band or the band carries no
/// energy at all.
pub fn dominant_frequency(
    signal: ArrayView1<f64>,
    fs: f64,
    min_hz: f64,
    max_hz: f64,
) -> Option<f64> {
    let n = signal.len();
    if n < 2 || !(fs > 0.0) {
        return None;
    }

    let buffer = forward_fft(signal);
    let bin_res = fs / n as f64;

    // Positive-frequency bins only: 1..=ceil(n/2)-1
    let mut best: Option<(usize, f64)> = None;
    for (k, c) in buffer.iter().enumerate().take((n + 1) / 2).skip(1) {
        let freq = k as f64 * bin_res;
        if freq <= min_hz || freq >= max_hz {
            continue;
        }
        let magnitude = c.norm();
        match best {
            Some((_, m)) if magnitude <= m => {}
            _ => best = Some((k, magnitude)),
        }
    }

    match best {
        Some((k, magnitude)) if magnitude > 0.0 => Some(k as f64 * bin_res),
        _ => None,
    }
}
