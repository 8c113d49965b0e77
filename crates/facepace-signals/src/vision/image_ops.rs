//! Color frames and grayscale conversion
//!
//! `Frame` holds interleaved BGR8 pixels as delivered by video decoders.
//! Everything downstream of grayscale conversion works on
//! [`image::GrayImage`].
//!
//! Loading frames from PNG/JPEG files is available with the
//! `image-processing` feature.

#[cfg(feature = "image-processing")]
use image::DynamicImage;
use image::{imageops, GrayImage, Luma};

use crate::error::{SignalError, SignalResult};

/// Color frame, BGR8 interleaved, row-major
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw BGR8 pixel data
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Timestamp in microseconds
    pub timestamp_us: i64,
}

impl Frame {
    /// Create a frame from raw BGR8 data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_us: i64) -> SignalResult<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(SignalError::InvalidFrame(format!(
                "expected {expected} bytes for {width}x{height} BGR, got {}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp_us,
        })
    }

    /// Frame filled with a single BGR color
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let data = bgr
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self {
            data,
            width,
            height,
            timestamp_us: 0,
        }
    }

    /// Get pixel at (x, y) as [B, G, R]
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Set pixel at (x, y)
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, bgr: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.data[idx..idx + 3].copy_from_slice(&bgr);
    }

    /// Paint an axis-aligned rectangle, clipped to the frame
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, bgr: [u8; 3]) {
        for py in y..y.saturating_add(h).min(self.height) {
            for px in x..x.saturating_add(w).min(self.width) {
                self.set_pixel(px, py, bgr);
            }
        }
    }

    /// Convert to grayscale (ITU-R BT.601 luma, rounded)
    pub fn to_grayscale(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let [b, g, r] = self.get_pixel(x, y);
            let luma = 0.114 * b as f32 + 0.587 * g as f32 + 0.299 * r as f32;
            Luma([luma.round().clamp(0.0, 255.0) as u8])
        })
    }
}

#[cfg(feature = "image-processing")]
impl Frame {
    /// Load frame from file path (any format the `image` crate decodes)
    pub fn from_file(path: &std::path::Path, timestamp_us: i64) -> SignalResult<Self> {
        let img = image::open(path).map_err(|e| SignalError::InvalidFrame(e.to_string()))?;
        Ok(Self::from_dynamic_image(&img, timestamp_us))
    }

    /// Convert from image crate DynamicImage (RGB -> BGR)
    pub fn from_dynamic_image(img: &DynamicImage, timestamp_us: i64) -> Self {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut data = rgb.into_raw();
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        Self {
            data,
            width,
            height,
            timestamp_us,
        }
    }
}

/// Crop a rectangle out of a grayscale image, clipped to its bounds.
pub fn crop_clipped(gray: &GrayImage, x: u32, y: u32, width: u32, height: u32) -> GrayImage {
    imageops::crop_imm(gray, x, y, width, height).to_image()
}
