//! Smoothing and binarization of grayscale images
//!
//! The ocular pipeline segments dark regions (eyes, pupils) out of a
//! brighter face. Two binarizations are provided, both producing masks with
//! foreground at 255:
//! - adaptive mean threshold, for eye regions under uneven lighting
//! - fixed inverse threshold, for the pupil inside an eye crop

use image::{GrayImage, Luma};
use imageproc::contrast::{self, ThresholdType};
use imageproc::filter;

/// Foreground value in binary masks
pub const FOREGROUND: u8 = 255;

/// Gaussian sigma implied by a kernel size: `0.3 * ((ksize - 1) * 0.5 - 1) + 0.8`.
pub fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Gaussian blur. A non-positive `sigma` is derived from `ksize`.
pub fn gaussian_blur(img: &GrayImage, ksize: u32, sigma: f32) -> GrayImage {
    let sigma = if sigma > 0.0 { sigma } else { sigma_for_kernel(ksize) };
    if ksize < 2 || sigma <= 0.0 || img.width() == 0 || img.height() == 0 {
        return img.clone();
    }
    filter::gaussian_blur_f32(img, sigma)
}

/// Inverse adaptive mean threshold: foreground where a pixel is at least `c`
/// below the mean of its `block x block` neighbourhood (replicated borders).
pub fn adaptive_threshold_mean_inv(img: &GrayImage, block: u32, c: i32) -> GrayImage {
    if img.width() == 0 || img.height() == 0 {
        return img.clone();
    }
    let radius = block / 2;
    let means = filter::box_filter(img, radius, radius);

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let src = img.get_pixel(x, y)[0] as i32;
        let mean = means.get_pixel(x, y)[0] as i32;
        if src - mean <= -c {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}

/// Inverse fixed threshold: foreground where `pixel <= thresh`.
pub fn threshold_binary_inv(img: &GrayImage, thresh: u8) -> GrayImage {
    contrast::threshold(img, thresh, ThresholdType::BinaryInverted)
}

/// Number of foreground pixels in a mask
pub fn foreground_count(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] == FOREGROUND).count()
}
