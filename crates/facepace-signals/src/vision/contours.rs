//! External region extraction from binary masks
//!
//! A region is "external" when it is not enclosed by another foreground
//! region. Background reachable from the image border (4-connected) is the
//! exterior; every 8-connected blob of non-exterior pixels is one external
//! region, holes and nested blobs included. Area and moments are computed
//! over that filled region.
//!
//! Both labelling passes go through `imageproc::region_labelling`.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use super::threshold::FOREGROUND;

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Width over height
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }
}

/// Filled external region with its raw spatial moments
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    /// Pixel count of the filled region
    pub area: usize,
    pub bbox: BoundingBox,
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Contour {
    /// Center of mass, `None` for a degenerate region
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00 == 0.0 {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }
}

/// Fill holes: everything except 4-connected background reachable from the
/// border becomes foreground.
fn fill_enclosed(mask: &GrayImage) -> GrayImage {
    let (w, h) = mask.dimensions();
    let background = connected_components(mask, Connectivity::Four, Luma([FOREGROUND]));

    let max_label = background.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    let mut exterior = vec![false; max_label + 1];
    for (x, y, label) in background.enumerate_pixels() {
        let on_border = x == 0 || y == 0 || x + 1 == w || y + 1 == h;
        if on_border && label[0] != 0 {
            exterior[label[0] as usize] = true;
        }
    }

    GrayImage::from_fn(w, h, |x, y| {
        let label = background.get_pixel(x, y)[0] as usize;
        if label != 0 && exterior[label] {
            Luma([0])
        } else {
            Luma([FOREGROUND])
        }
    })
}

#[derive(Default)]
struct RegionStats {
    area: usize,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    m10: f64,
    m01: f64,
}

impl RegionStats {
    fn add(&mut self, x: u32, y: u32) {
        if self.area == 0 {
            (self.min_x, self.min_y, self.max_x, self.max_y) = (x, y, x, y);
        }
        self.area += 1;
        self.m10 += x as f64;
        self.m01 += y as f64;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn into_contour(self) -> Contour {
        Contour {
            area: self.area,
            bbox: BoundingBox {
                x: self.min_x,
                y: self.min_y,
                width: self.max_x - self.min_x + 1,
                height: self.max_y - self.min_y + 1,
            },
            m00: self.area as f64,
            m10: self.m10,
            m01: self.m01,
        }
    }
}

/// Find all external regions in a mask (foreground = 255), in raster order
/// of their first pixel.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    let (w, h) = mask.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let filled = fill_enclosed(mask);
    let labels = connected_components(&filled, Connectivity::Eight, Luma([0u8]));

    let max_label = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    let mut slot: Vec<Option<usize>> = vec![None; max_label + 1];
    let mut regions: Vec<RegionStats> = Vec::new();

    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        let idx = *slot[label].get_or_insert_with(|| {
            regions.push(RegionStats::default());
            regions.len() - 1
        });
        regions[idx].add(x, y);
    }

    regions.into_iter().map(RegionStats::into_contour).collect()
}
