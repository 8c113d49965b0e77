//! Ocular dynamics from raw video frames
//!
//! Per frame:
//! 1. grayscale, 7x7 Gaussian blur, inverse adaptive mean threshold
//! 2. external regions with area in `[1000, 5000)` and aspect in `[0.5, 2.0]`
//!    are eye candidates
//! 3. inside each eye crop the unblurred gray image is thresholded at 30
//!    (inverse) and the largest region is taken as the pupil
//!
//! Pupil areas and frame-space centroids are accumulated in frame order and
//! summarized by [`OcularDynamicsResult::from_observations`]. Frames without
//! an eligible eye contribute nothing.
//!
//! # Example
//!
//! ```ignore
//! use facepace_signals::ocular::OcularPipeline;
//!
//! let result = OcularPipeline::new().analyze(&frames, 30.0);
//! if let Some(gaze) = result.gaze_dispersion {
//!     println!("gaze dispersion {:.2} px", gaze.total);
//! }
//! ```

mod dynamics;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::vision::{
    adaptive_threshold_mean_inv, crop_clipped, find_external_contours, gaussian_blur,
    threshold_binary_inv, Contour, Frame, GrayImage,
};

pub use dynamics::{
    EyeMovementDynamics, GazeDispersion, OcularDynamicsResult, PupilDynamics, PupilResponseTime,
};

/// Segmentation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcularConfig {
    /// Gaussian kernel size (odd)
    pub blur_kernel: u32,
    /// Adaptive threshold neighbourhood (odd)
    pub block_size: u32,
    /// Constant subtracted from the local mean
    pub threshold_c: i32,
    /// Inclusive lower bound on eye region area (pixels)
    pub min_eye_area: usize,
    /// Exclusive upper bound on eye region area (pixels)
    pub max_eye_area: usize,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    /// Pupil pixels are at or below this intensity
    pub pupil_threshold: u8,
}

impl Default for OcularConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 7,
            block_size: 11,
            threshold_c: 2,
            min_eye_area: 1000,
            max_eye_area: 5000,
            min_aspect_ratio: 0.5,
            max_aspect_ratio: 2.0,
            pupil_threshold: 30,
        }
    }
}

/// One detected pupil in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PupilObservation {
    pub area: f64,
    pub centroid_x: f64,
    pub centroid_y: f64,
}

/// Eye / pupil segmentation and aggregation
#[derive(Debug, Clone, Default)]
pub struct OcularPipeline {
    config: OcularConfig,
}

impl OcularPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OcularConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OcularConfig {
        &self.config
    }

    /// Eye candidate regions in a grayscale frame.
    pub fn eye_regions(&self, gray: &GrayImage) -> Vec<Contour> {
        let cfg = &self.config;
        let blurred = gaussian_blur(gray, cfg.blur_kernel, 0.0);
        let mask = adaptive_threshold_mean_inv(&blurred, cfg.block_size, cfg.threshold_c);

        find_external_contours(&mask)
            .into_iter()
            .filter(|c| c.area >= cfg.min_eye_area && c.area < cfg.max_eye_area)
            .filter(|c| {
                let aspect = c.bbox.aspect_ratio();
                aspect >= cfg.min_aspect_ratio && aspect <= cfg.max_aspect_ratio
            })
            .collect()
    }

    /// Largest dark region inside an eye, offset to frame coordinates.
    fn pupil_in(&self, gray: &GrayImage, eye: &Contour) -> Option<PupilObservation> {
        let b = eye.bbox;
        let crop = crop_clipped(gray, b.x, b.y, b.width, b.height);
        let mask = threshold_binary_inv(&crop, self.config.pupil_threshold);

        let pupil = find_external_contours(&mask)
            .into_iter()
            .max_by_key(|c| c.area)?;
        let (cx, cy) = pupil.centroid()?;

        Some(PupilObservation {
            area: pupil.area as f64,
            centroid_x: cx + b.x as f64,
            centroid_y: cy + b.y as f64,
        })
    }

    /// All pupils found in one frame.
    pub fn detect_pupils(&self, frame: &Frame) -> Vec<PupilObservation> {
        let gray = frame.to_grayscale();
        self.eye_regions(&gray)
            .iter()
            .filter_map(|eye| self.pupil_in(&gray, eye))
            .collect()
    }

    /// Segment every frame and summarize.
    pub fn analyze(&self, frames: &[Frame], fps: f64) -> OcularDynamicsResult {
        #[cfg(feature = "parallel")]
        let per_frame: Vec<Vec<PupilObservation>> =
            frames.par_iter().map(|f| self.detect_pupils(f)).collect();
        #[cfg(not(feature = "parallel"))]
        let per_frame: Vec<Vec<PupilObservation>> =
            frames.iter().map(|f| self.detect_pupils(f)).collect();

        let observations: Vec<PupilObservation> = per_frame.into_iter().flatten().collect();
        let pupil_sizes: Vec<f64> = observations.iter().map(|o| o.area).collect();
        let eye_positions: Vec<(f64, f64)> = observations
            .iter()
            .map(|o| (o.centroid_x, o.centroid_y))
            .collect();

        tracing::debug!(
            frames = frames.len(),
            pupils = observations.len(),
            "ocular segmentation finished"
        );

        let mut result =
            OcularDynamicsResult::from_observations(&pupil_sizes, &eye_positions, fps, frames.len());
        if !(fps.is_finite() && fps > 0.0) {
            tracing::warn!(fps, "invalid frame rate, skipping time-based ocular metrics");
            result.eye_movements = None;
            result.pupil_response_time = None;
        }
        result
    }
}
