//! Image preparation and classical vision primitives used by the heuristic engine.
//!
//! Every analysis runs on a [`WorkingImage`]: an RGB copy whose longest side is
//! capped at [`MAX_ANALYSIS_DIMENSION`], plus its BT.601 grayscale rendition.
//! Building both once guarantees that all scorers observe the same resolution.

pub mod cluster;
pub mod filters;

pub use cluster::{kmeans_colors, ColorCluster};
pub use filters::{canny, histogram, rgb_to_hsv, shannon_entropy, sobel, Gradients, Hsv};

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma, RgbImage};

/// Longest side, in pixels, that any analysis sees
pub const MAX_ANALYSIS_DIMENSION: u32 = 400;

/// Degenerate input detected while analysing an image
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("image contains non-finite pixel values")]
    NonFinitePixels,

    #[error("{stage} analysis produced non-finite scores")]
    NonFiniteScores { stage: &'static str },
}

/// Call-local working copy of an image
#[derive(Debug, Clone)]
pub struct WorkingImage {
    rgb: RgbImage,
    gray: GrayImage,
}

impl WorkingImage {
    /// Validate, downscale and convert an image for analysis.
    ///
    /// Float images are expected in [0, 1] and are quantised to 8 bits.
    pub fn prepare(image: &DynamicImage) -> Result<Self, AnalysisError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(AnalysisError::EmptyImage { width, height });
        }
        if has_non_finite_pixels(image) {
            return Err(AnalysisError::NonFinitePixels);
        }

        let rgb = image.to_rgb8();
        let (target_w, target_h) = scaled_dimensions(width, height, MAX_ANALYSIS_DIMENSION);
        let rgb = if (target_w, target_h) == (width, height) {
            rgb
        } else {
            image::imageops::resize(&rgb, target_w, target_h, FilterType::Triangle)
        };
        let gray = to_gray(&rgb);

        Ok(Self { rgb, gray })
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgb.dimensions()
    }

    pub fn pixel_count(&self) -> usize {
        self.rgb.width() as usize * self.rgb.height() as usize
    }
}

/// Target size for an image whose longest side must not exceed `cap`.
///
/// Aspect ratio is preserved; the longest side lands exactly on `cap`.
pub fn scaled_dimensions(width: u32, height: u32, cap: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= cap {
        return (width, height);
    }
    let scale = |side: u32| ((u64::from(side) * u64::from(cap)) / u64::from(longest)).max(1) as u32;
    if width >= height {
        (cap, scale(height))
    } else {
        (scale(width), cap)
    }
}

/// ITU-R BT.601 luma, rounded to the nearest integer.
pub fn to_gray(rgb: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(rgb.width(), rgb.height());
    for (x, y, p) in rgb.enumerate_pixels() {
        let [r, g, b] = p.0;
        let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
        gray.put_pixel(x, y, Luma([luma.round().clamp(0.0, 255.0) as u8]));
    }
    gray
}

fn has_non_finite_pixels(image: &DynamicImage) -> bool {
    match image {
        DynamicImage::ImageRgb32F(buf) => buf.as_raw().iter().any(|v| !v.is_finite()),
        DynamicImage::ImageRgba32F(buf) => buf.as_raw().iter().any(|v| !v.is_finite()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgb32FImage};

    #[test]
    fn test_scaled_dimensions_small_image_untouched() {
        assert_eq!(scaled_dimensions(400, 300, 400), (400, 300));
        assert_eq!(scaled_dimensions(10, 10, 400), (10, 10));
    }

    #[test]
    fn test_scaled_dimensions_caps_longest_side() {
        assert_eq!(scaled_dimensions(800, 600, 400), (400, 300));
        assert_eq!(scaled_dimensions(600, 1234, 400), (194, 400));
        assert_eq!(scaled_dimensions(5000, 3, 400), (400, 1));
    }

    #[test]
    fn test_prepare_downscales_large_images() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1000, 500, Rgb([10, 20, 30])));
        let working = WorkingImage::prepare(&img).unwrap();
        assert_eq!(working.dimensions(), (400, 200));
        assert_eq!(working.gray().dimensions(), (400, 200));
        assert_eq!(working.pixel_count(), 80_000);
    }

    #[test]
    fn test_prepare_rejects_empty_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert_eq!(
            WorkingImage::prepare(&img).unwrap_err(),
            AnalysisError::EmptyImage { width: 0, height: 0 }
        );
    }

    #[test]
    fn test_prepare_rejects_nan_pixels() {
        let mut buf = Rgb32FImage::from_pixel(4, 4, Rgb([0.5, 0.5, 0.5]));
        buf.put_pixel(1, 1, Rgb([f32::NAN, 0.0, 0.0]));
        let img = DynamicImage::ImageRgb32F(buf);
        assert_eq!(
            WorkingImage::prepare(&img).unwrap_err(),
            AnalysisError::NonFinitePixels
        );
    }

    #[test]
    fn test_prepare_accepts_normalized_float_images() {
        let buf = Rgb32FImage::from_pixel(2, 2, Rgb([1.0, 0.0, 0.0]));
        let working = WorkingImage::prepare(&DynamicImage::ImageRgb32F(buf)).unwrap();
        assert_eq!(working.rgb().get_pixel(0, 0).0, [255, 0, 0]);
    }

    #[test]
    fn test_to_gray_uses_bt601_weights() {
        let rgb = RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]));
        assert_eq!(to_gray(&rgb).get_pixel(0, 0).0[0], 76);
        let rgb = RgbImage::from_pixel(1, 1, Rgb([0, 255, 0]));
        assert_eq!(to_gray(&rgb).get_pixel(0, 0).0[0], 150);
    }
}
