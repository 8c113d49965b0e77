//! Vision primitives for the ocular pipeline
//!
//! This module provides:
//! - `Frame` (BGR8) with conversion to `image::GrayImage`
//! - Gaussian blur and inverse binarization (adaptive mean, fixed) on top of
//!   `imageproc`
//! - External region extraction with area, bounding box and moments
//!
//! # Features
//!
//! - `image-processing`: Enables PNG/JPEG frame loading
//!
//! # Example
//!
//! ```ignore
//! use facepace_signals::vision::{
//!     adaptive_threshold_mean_inv, find_external_contours, gaussian_blur, Frame,
//! };
//!
//! let gray = frame.to_grayscale();
//! let mask = adaptive_threshold_mean_inv(&gaussian_blur(&gray, 7, 0.0), 11, 2);
//! for region in find_external_contours(&mask) {
//!     println!("{:?} area={}", region.bbox, region.area);
//! }
//! ```

mod contours;
mod image_ops;
mod threshold;

pub use contours::{find_external_contours, BoundingBox, Contour};
pub use image::GrayImage;
pub use image_ops::{crop_clipped, Frame};
pub use threshold::{
    adaptive_threshold_mean_inv, foreground_count, gaussian_blur, sigma_for_kernel,
    threshold_binary_inv, FOREGROUND,
};
