//! Descriptive statistics over 1-D arrays
//!
//! Means come straight from `ArrayBase::mean`. The helpers here cover what
//! `ndarray` does not: population standard deviation that stays `None` on
//! empty input, interpolated percentiles, z-scoring and first differences.

use ndarray::{s, Array1, ArrayView1};

/// Population standard deviation
pub fn std_dev(arr: ArrayView1<f64>) -> Option<f64> {
    let mean = arr.mean()?;
    arr.mapv(|x| (x - mean).powi(2)).mean().map(f64::sqrt)
}

/// Percentile with linear interpolation between closest ranks.
///
/// `p` is in percent (0-100).
pub fn percentile(arr: ArrayView1<f64>, p: f64) -> Option<f64> {
    if arr.is_empty() {
        return None;
    }
    let mut sorted = arr.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Z-score normalization: `(x - mean) / (std + epsilon)`.
///
/// `epsilon` keeps constant signals finite (they normalize to all zeros).
pub fn z_normalize(arr: ArrayView1<f64>, epsilon: f64) -> Array1<f64> {
    let mean = arr.mean().unwrap_or(0.0);
    let std = std_dev(arr).unwrap_or(0.0);
    arr.mapv(|x| (x - mean) / (std + epsilon))
}

/// First differences `x[i+1] - x[i]`
pub fn diff(arr: ArrayView1<f64>) -> Array1<f64> {
    if arr.len() < 2 {
        return Array1::zeros(0);
    }
    &arr.slice(s![1..]) - &arr.slice(s![..-1])
}
