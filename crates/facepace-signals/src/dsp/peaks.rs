//! Peak detection
//!
//! Local-maximum search with a minimum horizontal distance between peaks and
//! an optional topographic prominence floor. Flat-topped peaks resolve to the
//! middle sample of the plateau.

use ndarray::{s, ArrayView1};

/// Peak selection criteria
#[derive(Debug, Clone, Default)]
pub struct PeakOptions {
    /// Minimum distance between neighbouring peaks, in samples (rounded up)
    pub distance: Option<f64>,
    /// Minimum prominence a peak must have
    pub prominence: Option<f64>,
}

impl PeakOptions {
    pub fn with_distance(distance: f64) -> Self {
        Self {
            distance: Some(distance),
            prominence: None,
        }
    }

    pub fn prominence(mut self, prominence: f64) -> Self {
        self.prominence = Some(prominence);
        self
    }
}

/// Find peak indices in `x`, in ascending order.
pub fn find_peaks(x: ArrayView1<f64>, options: &PeakOptions) -> Vec<usize> {
    let mut peaks = local_maxima(&x);

    if let Some(distance) = options.distance {
        let distance = distance.ceil().max(1.0) as usize;
        if distance > 1 {
            peaks = select_by_distance(&x, &peaks, distance);
        }
    }

    if let Some(min_prominence) = options.prominence {
        peaks.retain(|&p| prominence(x, p) >= min_prominence);
    }

    peaks
}

/// Strict local maxima; plateaus report their midpoint.
fn local_maxima(x: &ArrayView1<f64>) -> Vec<usize> {
    let mut peaks = Vec::new();
    let n = x.len();
    if n < 3 {
        return peaks;
    }

    let mut i = 1;
    while i < n - 1 {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }

    peaks
}

/// Drop lower peaks that sit closer than `distance` to a higher one.
fn select_by_distance(x: &ArrayView1<f64>, peaks: &[usize], distance: usize) -> Vec<usize> {
    let n = peaks.len();
    let mut keep = vec![true; n];

    let mut by_height: Vec<usize> = (0..n).collect();
    by_height.sort_by(|&a, &b| x[peaks[a]].total_cmp(&x[peaks[b]]));

    for &j in by_height.iter().rev() {
        if !keep[j] {
            continue;
        }

        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }

        let mut k = j + 1;
        while k < n && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

/// Topographic prominence of the peak at `peak`.
pub fn prominence(x: ArrayView1<f64>, peak: usize) -> f64 {
    let height = x[peak];

    let mut left_min = height;
    for &v in x.slice(s![..peak]).iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in x.slice(s![peak + 1..]).iter() {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}
