//! Summary statistics over pupil observations
//!
//! All standard deviations are population (`ddof = 0`) and percentiles use
//! linear interpolation between closest ranks. Each summary returns `None`
//! when its input sequence is empty.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::dsp::stats;

/// Pupil size distribution and dilation response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PupilDynamics {
    pub mean_size: f64,
    pub std_size: f64,
    pub min_size: f64,
    pub max_size: f64,
    /// `std / mean * 100`
    pub coefficient_of_variation: f64,
    /// 10th percentile of sizes
    pub baseline: f64,
    /// `max / baseline`
    pub max_dilation_ratio: f64,
    /// `max - baseline`
    pub response_amplitude: f64,
}

impl PupilDynamics {
    pub fn from_sizes(sizes: &[f64]) -> Option<Self> {
        let sizes = ArrayView1::from(sizes);
        let mean_size = sizes.mean()?;
        let std_size = stats::std_dev(sizes)?;
        let min_size = sizes.fold(f64::INFINITY, |m, &v| m.min(v));
        let max_size = sizes.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        let baseline = stats::percentile(sizes, 10.0)?;

        Some(Self {
            mean_size,
            std_size,
            min_size,
            max_size,
            coefficient_of_variation: ratio(std_size, mean_size) * 100.0,
            baseline,
            max_dilation_ratio: ratio(max_size, baseline),
            response_amplitude: max_size - baseline,
        })
    }
}

/// Saccade / fixation classification by velocity percentile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeMovementDynamics {
    pub estimated_saccades: usize,
    pub estimated_fixations: usize,
    pub mean_saccade_velocity: f64,
    pub mean_fixation_velocity: f64,
    pub peak_saccade_velocity: f64,
    /// Standard deviation of fixation velocities
    pub stability_index: f64,
    /// Standard deviation of reciprocal non-zero fixation velocities
    pub duration_variability: f64,
    pub mean_velocity: f64,
}

impl EyeMovementDynamics {
    /// Velocities are centroid displacements between consecutive observations
    /// scaled by the frame rate (pixels / second).
    pub fn from_positions(positions: &[(f64, f64)], fps: f64) -> Option<Self> {
        let velocities: Vec<f64> = positions
            .windows(2)
            .map(|w| (w[1].0 - w[0].0).hypot(w[1].1 - w[0].1) * fps)
            .collect();
        Self::from_velocities(&velocities)
    }

    pub fn from_velocities(velocities: &[f64]) -> Option<Self> {
        let velocities = ArrayView1::from(velocities);
        let mean_velocity = velocities.mean()?;
        let saccade_threshold = stats::percentile(velocities, 90.0)?;
        let fixation_threshold = stats::percentile(velocities, 10.0)?;

        let saccades: Array1<f64> = velocities
            .iter()
            .copied()
            .filter(|&v| v > saccade_threshold)
            .collect();
        let fixations: Array1<f64> = velocities
            .iter()
            .copied()
            .filter(|&v| v < fixation_threshold)
            .collect();
        let reciprocal: Array1<f64> = fixations
            .iter()
            .filter(|&&v| v > 0.0)
            .map(|v| 1.0 / v)
            .collect();

        Some(Self {
            estimated_saccades: saccades.len(),
            estimated_fixations: fixations.len(),
            mean_saccade_velocity: saccades.mean().unwrap_or(0.0),
            mean_fixation_velocity: fixations.mean().unwrap_or(0.0),
            peak_saccade_velocity: saccades.fold(0.0, |m, &v| f64::max(m, v)),
            stability_index: stats::std_dev(fixations.view()).unwrap_or(0.0),
            duration_variability: stats::std_dev(reciprocal.view()).unwrap_or(0.0),
            mean_velocity,
        })
    }
}

/// Spread of gaze positions (pixels)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeDispersion {
    pub horizontal: f64,
    pub vertical: f64,
    pub total: f64,
}

impl GazeDispersion {
    pub fn from_positions(positions: &[(f64, f64)]) -> Option<Self> {
        let xs: Array1<f64> = positions.iter().map(|p| p.0).collect();
        let ys: Array1<f64> = positions.iter().map(|p| p.1).collect();
        let horizontal = stats::std_dev(xs.view())?;
        let vertical = stats::std_dev(ys.view())?;
        Some(Self {
            horizontal,
            vertical,
            total: horizontal.hypot(vertical),
        })
    }
}

/// Time of the largest frame-to-frame pupil size change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PupilResponseTime {
    pub seconds: f64,
    /// Index into the first difference of the size sequence
    pub frame_index: usize,
}

impl PupilResponseTime {
    /// Needs at least two sizes. Ties resolve to the earliest change.
    pub fn from_sizes(sizes: &[f64], fps: f64) -> Option<Self> {
        let changes = stats::diff(ArrayView1::from(sizes));
        let mut best: Option<(usize, f64)> = None;
        for (i, change) in changes.iter().map(|d| d.abs()).enumerate() {
            if best.map_or(true, |(_, b)| change > b) {
                best = Some((i, change));
            }
        }
        let (frame_index, _) = best?;
        Some(Self {
            seconds: frame_index as f64 / fps,
            frame_index,
        })
    }
}

/// Aggregate ocular summary for one recording
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OcularDynamicsResult {
    pub pupil_dynamics: Option<PupilDynamics>,
    pub eye_movements: Option<EyeMovementDynamics>,
    pub gaze_dispersion: Option<GazeDispersion>,
    pub pupil_response_time: Option<PupilResponseTime>,
    pub total_frames: usize,
}

impl OcularDynamicsResult {
    /// Record with every section absent
    pub fn empty(total_frames: usize) -> Self {
        Self {
            total_frames,
            ..Self::default()
        }
    }

    pub fn from_observations(
        pupil_sizes: &[f64],
        eye_positions: &[(f64, f64)],
        fps: f64,
        total_frames: usize,
    ) -> Self {
        Self {
            pupil_dynamics: PupilDynamics::from_sizes(pupil_sizes),
            eye_movements: EyeMovementDynamics::from_positions(eye_positions, fps),
            gaze_dispersion: GazeDispersion::from_positions(eye_positions),
            pupil_response_time: PupilResponseTime::from_sizes(pupil_sizes, fps),
            total_frames,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pupil_dynamics.is_none()
            && self.eye_movements.is_none()
            && self.gaze_dispersion.is_none()
            && self.pupil_response_time.is_none()
    }
}

#[inline]
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_pupil_dynamics_hand_computed() {
        let sizes = [100.0, 110.0, 120.0, 130.0, 140.0, 150.0, 160.0, 170.0, 180.0, 190.0, 200.0];
        let d = PupilDynamics::from_sizes(&sizes).unwrap();

        assert_relative_eq!(d.mean_size, 150.0);
        assert_eq!(d.min_size, 100.0);
        assert_eq!(d.max_size, 200.0);
        // p10 of 11 evenly spaced values sits exactly on the second one
        assert_relative_eq!(d.baseline, 110.0, epsilon = 1e-9);
        assert_relative_eq!(d.max_dilation_ratio, 200.0 / 110.0, epsilon = 1e-12);
        assert_relative_eq!(d.response_amplitude, 90.0, epsilon = 1e-9);
        assert_relative_eq!(d.coefficient_of_variation, d.std_size / 150.0 * 100.0);
    }

    #[test]
    fn test_pupil_dynamics_empty() {
        assert!(PupilDynamics::from_sizes(&[]).is_none());
    }

    proptest! {
        #[test]
        fn cv_is_scale_invariant(
            sizes in prop::collection::vec(1.0f64..5000.0, 1..60),
            scale in 0.01f64..100.0,
        ) {
            let scaled: Vec<f64> = sizes.iter().map(|s| s * scale).collect();
            let a = PupilDynamics::from_sizes(&sizes).unwrap();
            let b = PupilDynamics::from_sizes(&scaled).unwrap();
            prop_assert!((a.coefficient_of_variation - b.coefficient_of_variation).abs() < 1e-6);
            prop_assert!((a.max_dilation_ratio - b.max_dilation_ratio).abs() < 1e-9 * a.max_dilation_ratio.max(1.0));
        }
    }

    #[test]
    fn test_zero_motion_is_defined() {
        let positions = vec![(40.0, 30.0); 12];
        let m = EyeMovementDynamics::from_positions(&positions, 30.0).unwrap();

        assert_eq!(m.estimated_saccades, 0);
        assert_eq!(m.estimated_fixations, 0);
        assert_eq!(m.mean_saccade_velocity, 0.0);
        assert_eq!(m.mean_fixation_velocity, 0.0);
        assert_eq!(m.peak_saccade_velocity, 0.0);
        assert_eq!(m.stability_index, 0.0);
        assert_eq!(m.duration_variability, 0.0);
        assert_eq!(m.mean_velocity, 0.0);
    }

    #[test]
    fn test_eye_movements_need_two_positions() {
        assert!(EyeMovementDynamics::from_positions(&[], 30.0).is_none());
        assert!(EyeMovementDynamics::from_positions(&[(1.0, 1.0)], 30.0).is_none());
    }

    #[test]
    fn test_saccade_fixation_split() {
        // Velocities 1..=10: p90 = 9.1, p10 = 1.9
        let velocities: Vec<f64> = (1..=10).map(f64::from).collect();
        let m = EyeMovementDynamics::from_velocities(&velocities).unwrap();

        assert_eq!(m.estimated_saccades, 1);
        assert_eq!(m.estimated_fixations, 1);
        assert_eq!(m.peak_saccade_velocity, 10.0);
        assert_eq!(m.mean_saccade_velocity, 10.0);
        assert_eq!(m.mean_fixation_velocity, 1.0);
        assert_eq!(m.stability_index, 0.0);
        assert_relative_eq!(m.mean_velocity, 5.5);
    }

    #[test]
    fn test_velocity_scales_with_fps() {
        let positions = [(0.0, 0.0), (3.0, 4.0), (3.0, 4.0)];
        let m = EyeMovementDynamics::from_positions(&positions, 10.0).unwrap();
        // Velocities [50, 0]
        assert_relative_eq!(m.mean_velocity, 25.0);
        assert_eq!(m.estimated_saccades, 1);
        assert_eq!(m.peak_saccade_velocity, 50.0);
        assert_eq!(m.estimated_fixations, 1);
        // The single fixation velocity is zero and has no reciprocal
        assert_eq!(m.duration_variability, 0.0);
    }

    #[test]
    fn test_gaze_dispersion() {
        let positions = [(0.0, 0.0), (6.0, 8.0)];
        let g = GazeDispersion::from_positions(&positions).unwrap();
        assert_relative_eq!(g.horizontal, 3.0);
        assert_relative_eq!(g.vertical, 4.0);
        assert_relative_eq!(g.total, 5.0);
        assert!(GazeDispersion::from_positions(&[]).is_none());
    }

    #[test]
    fn test_response_time() {
        let sizes = [100.0, 102.0, 101.0, 150.0, 149.0];
        let r = PupilResponseTime::from_sizes(&sizes, 25.0).unwrap();
        assert_eq!(r.frame_index, 2);
        assert_relative_eq!(r.seconds, 0.08);

        assert!(PupilResponseTime::from_sizes(&[100.0], 25.0).is_none());
    }

    #[test]
    fn test_response_time_ties_pick_first() {
        let sizes = [10.0, 20.0, 10.0];
        assert_eq!(PupilResponseTime::from_sizes(&sizes, 1.0).unwrap().frame_index, 0);
    }

    #[test]
    fn test_empty_result_serializes_sections_as_null() {
        let json = serde_json::to_value(OcularDynamicsResult::empty(0)).unwrap();
        assert!(json["pupil_dynamics"].is_null());
        assert!(json["eye_movements"].is_null());
        assert_eq!(json["total_frames"], 0);
    }
}
