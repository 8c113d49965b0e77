//! Filter policy selection
//!
//! Chooses the low-pass filter parameters and the windowing of the primary
//! heart-rate estimator from the characteristics of the source video.

use serde::{Deserialize, Serialize};

/// Width or height above which a stream is treated as high resolution.
pub const HIGH_RESOLUTION_EDGE: u32 = 3800;
/// Frame rate above which a stream is treated as high frame rate.
pub const HIGH_FRAME_RATE_FPS: f64 = 45.0;

/// Which row of the decision table produced a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRegime {
    HighResolution,
    HighFrameRate,
    Default,
}

/// Filter and windowing parameters for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPolicy {
    pub regime: PolicyRegime,
    /// Low-pass cutoff in Hz
    pub cutoff_hz: f64,
    /// Low-pass filter order
    pub order: usize,
    /// Hop between primary-estimator windows, in samples
    pub hr_update_interval: usize,
    /// Primary-estimator window length, in samples
    pub hr_window_size: usize,
}

impl FilterPolicy {
    /// Select the policy for a stream. First matching row wins:
    ///
    /// | condition                      | cutoff | order | interval | window  |
    /// |--------------------------------|--------|-------|----------|---------|
    /// | width > 3800 or height > 3800  | 1.5    | 4     | fps      | fps×15  |
    /// | fps > 45                       | 1.11   | 5     | fps      | fps×10  |
    /// | otherwise                      | 0.32   | 7     | fps×10   | fps×30  |
    pub fn select(fps: f64, width: u32, height: u32) -> Self {
        if width > HIGH_RESOLUTION_EDGE || height > HIGH_RESOLUTION_EDGE {
            Self::build(PolicyRegime::HighResolution, 1.5, 4, fps, 1.0, 15.0)
        } else if fps > HIGH_FRAME_RATE_FPS {
            Self::build(PolicyRegime::HighFrameRate, 1.11, 5, fps, 1.0, 10.0)
        } else {
            Self::build(PolicyRegime::Default, 0.32, 7, fps, 10.0, 30.0)
        }
    }

    fn build(
        regime: PolicyRegime,
        cutoff_hz: f64,
        order: usize,
        fps: f64,
        interval_secs: f64,
        window_secs: f64,
    ) -> Self {
        Self {
            regime,
            cutoff_hz,
            order,
            hr_update_interval: seconds_to_samples(fps, interval_secs),
            hr_window_size: seconds_to_samples(fps, window_secs),
        }
    }
}

fn seconds_to_samples(fps: f64, secs: f64) -> usize {
    (fps * secs).round().max(1.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_high_resolution_wins_over_frame_rate() {
        let policy = FilterPolicy::select(60.0, 3840, 2160);
        assert_eq!(policy.regime, PolicyRegime::HighResolution);
        assert_eq!(policy.order, 4);
        assert_eq!(policy.hr_update_interval, 60);
        assert_eq!(policy.hr_window_size, 900);
    }

    #[test]
    fn test_portrait_4k_is_high_resolution() {
        let policy = FilterPolicy::select(30.0, 2160, 3840);
        assert_eq!(policy.regime, PolicyRegime::HighResolution);
        assert!((policy.cutoff_hz - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_high_frame_rate() {
        let policy = FilterPolicy::select(60.0, 1920, 1080);
        assert_eq!(policy.regime, PolicyRegime::HighFrameRate);
        assert!((policy.cutoff_hz - 1.11).abs() < 1e-12);
        assert_eq!(policy.order, 5);
        assert_eq!(policy.hr_update_interval, 60);
        assert_eq!(policy.hr_window_size, 600);
    }

    #[test]
    fn test_boundaries_fall_to_default() {
        // Strict inequalities: exactly 3800 px / 45 fps are not special
        let policy = FilterPolicy::select(45.0, 3800, 3800);
        assert_eq!(policy.regime, PolicyRegime::Default);
        assert!((policy.cutoff_hz - 0.32).abs() < 1e-12);
        assert_eq!(policy.order, 7);
        assert_eq!(policy.hr_update_interval, 450);
        assert_eq!(policy.hr_window_size, 1350);
    }

    #[test]
    fn test_fractional_fps_rounds_to_samples() {
        let policy = FilterPolicy::select(29.97, 1280, 720);
        assert_eq!(policy.hr_update_interval, 300);
        assert_eq!(policy.hr_window_size, 899);
    }

    proptest! {
        #[test]
        fn prop_selection_is_total_and_deterministic(
            fps in 0.5f64..240.0,
            width in 1u32..8000,
            height in 1u32..8000,
        ) {
            let a = FilterPolicy::select(fps, width, height);
            let b = FilterPolicy::select(fps, width, height);
            prop_assert_eq!(&a, &b);

            let expected = if width > 3800 || height > 3800 {
                PolicyRegime::HighResolution
            } else if fps > 45.0 {
                PolicyRegime::HighFrameRate
            } else {
                PolicyRegime::Default
            };
            prop_assert_eq!(a.regime, expected);
            prop_assert!(a.hr_update_interval >= 1);
            prop_assert!(a.hr_window_size >= a.hr_update_interval);
        }
    }
}
