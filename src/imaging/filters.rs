//! Colour-space conversion, gradients, edges and histograms.
//!
//! Conventions follow the common 8-bit vision toolchain: hue on a 0-180
//! scale, 3x3 Sobel kernels with reflect-101 borders, and Canny with an L1
//! gradient norm and 8-connected hysteresis.

use image::{GrayImage, Rgb};

/// HSV triple: hue in half-degrees [0, 180], saturation and value in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

/// Convert an 8-bit RGB pixel to HSV, quantising like an 8-bit HSV image would.
pub fn rgb_to_hsv(pixel: Rgb<u8>) -> Hsv {
    let [r, g, b] = pixel.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = f32::from(max - min);

    let saturation = if max == 0 {
        0.0
    } else {
        (255.0 * delta / f32::from(max)).round() / 255.0
    };

    let hue_degrees = if delta == 0.0 {
        0.0
    } else {
        let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
        let h = if max == pixel.0[0] {
            60.0 * (g - b) / delta
        } else if max == pixel.0[1] {
            120.0 + 60.0 * (b - r) / delta
        } else {
            240.0 + 60.0 * (r - g) / delta
        };
        if h < 0.0 {
            h + 360.0
        } else {
            h
        }
    };

    Hsv {
        hue: (hue_degrees / 2.0).round(),
        saturation,
        value: f32::from(max) / 255.0,
    }
}

/// Horizontal and vertical 3x3 Sobel responses, row-major
#[derive(Debug, Clone)]
pub struct Gradients {
    pub width: usize,
    pub height: usize,
    pub gx: Vec<f64>,
    pub gy: Vec<f64>,
}

impl Gradients {
    pub fn magnitude(&self, idx: usize) -> f64 {
        self.gx[idx].hypot(self.gy[idx])
    }

    pub fn direction(&self, idx: usize) -> f64 {
        self.gy[idx].atan2(self.gx[idx])
    }

    pub fn len(&self) -> usize {
        self.gx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gx.is_empty()
    }
}

/// Reflect-101 border handling: `-1 -> 1`, `n -> n - 2`.
fn reflect101(i: i64, n: i64) -> usize {
    if n == 1 {
        return 0;
    }
    let mut i = i;
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * n - 2 - i;
        }
    }
    i as usize
}

/// 3x3 Sobel derivatives of a grayscale image.
pub fn sobel(gray: &GrayImage) -> Gradients {
    let (w, h) = (gray.width() as i64, gray.height() as i64);
    let raw = gray.as_raw();
    let at = |x: i64, y: i64| f64::from(raw[reflect101(y, h) * w as usize + reflect101(x, w)]);

    let len = (w * h) as usize;
    let mut gx = Vec::with_capacity(len);
    let mut gy = Vec::with_capacity(len);

    for y in 0..h {
        for x in 0..w {
            let tl = at(x - 1, y - 1);
            let tc = at(x, y - 1);
            let tr = at(x + 1, y - 1);
            let ml = at(x - 1, y);
            let mr = at(x + 1, y);
            let bl = at(x - 1, y + 1);
            let bc = at(x, y + 1);
            let br = at(x + 1, y + 1);

            gx.push((tr + 2.0 * mr + br) - (tl + 2.0 * ml + bl));
            gy.push((bl + 2.0 * bc + br) - (tl + 2.0 * tc + tr));
        }
    }

    Gradients {
        width: w as usize,
        height: h as usize,
        gx,
        gy,
    }
}

const TAN_22_5: f64 = 0.414_213_562_373_095_1;
const TAN_67_5: f64 = 2.414_213_562_373_095;

/// Canny edge map (`true` = edge) using the given hysteresis thresholds.
pub fn canny(gray: &GrayImage, low: f64, high: f64) -> Vec<bool> {
    let grads = sobel(gray);
    let (w, h) = (grads.width, grads.height);
    let magnitude: Vec<f64> = grads
        .gx
        .iter()
        .zip(&grads.gy)
        .map(|(dx, dy)| dx.abs() + dy.abs())
        .collect();

    // Out-of-image neighbours count as zero magnitude.
    let mag = |x: i64, y: i64| -> f64 {
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            0.0
        } else {
            magnitude[y as usize * w + x as usize]
        }
    };

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        None,
        Weak,
        Edge,
    }

    let mut marks = vec![Mark::None; w * h];
    let mut stack = Vec::new();

    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let idx = y as usize * w + x as usize;
            let m = magnitude[idx];
            if m <= low {
                continue;
            }

            let (dx, dy) = (grads.gx[idx], grads.gy[idx]);
            let (ax, ay) = (dx.abs(), dy.abs());
            let is_peak = if ay < ax * TAN_22_5 {
                m > mag(x - 1, y) && m >= mag(x + 1, y)
            } else if ay > ax * TAN_67_5 {
                m > mag(x, y - 1) && m >= mag(x, y + 1)
            } else {
                let s = if (dx < 0.0) != (dy < 0.0) { -1 } else { 1 };
                m > mag(x - s, y - 1) && m > mag(x + s, y + 1)
            };

            if !is_peak {
                continue;
            }
            if m > high {
                marks[idx] = Mark::Edge;
                stack.push((x, y));
            } else {
                marks[idx] = Mark::Weak;
            }
        }
    }

    while let Some((x, y)) = stack.pop() {
        for ny in (y - 1)..=(y + 1) {
            for nx in (x - 1)..=(x + 1) {
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let n = ny as usize * w + nx as usize;
                if marks[n] == Mark::Weak {
                    marks[n] = Mark::Edge;
                    stack.push((nx, ny));
                }
            }
        }
    }

    marks.into_iter().map(|m| m == Mark::Edge).collect()
}

/// 256-bin intensity histogram.
pub fn histogram(gray: &GrayImage) -> [u64; 256] {
    let mut bins = [0u64; 256];
    for &v in gray.as_raw() {
        bins[v as usize] += 1;
    }
    bins
}

/// Shannon entropy (bits) of a histogram, with a small epsilon inside the log.
pub fn shannon_entropy(bins: &[u64; 256]) -> f64 {
    let total: u64 = bins.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    -bins
        .iter()
        .map(|&count| {
            let p = count as f64 / total;
            p * (p + 1e-10).log2()
        })
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_hsv_primaries() {
        let red = rgb_to_hsv(Rgb([255, 0, 0]));
        assert_eq!(red.hue, 0.0);
        assert_eq!(red.saturation, 1.0);
        assert_eq!(red.value, 1.0);

        let green = rgb_to_hsv(Rgb([0, 255, 0]));
        assert_eq!(green.hue, 60.0);

        let blue = rgb_to_hsv(Rgb([0, 0, 255]));
        assert_eq!(blue.hue, 120.0);
    }

    #[test]
    fn test_hsv_gray_has_no_saturation() {
        let gray = rgb_to_hsv(Rgb([128, 128, 128]));
        assert_eq!(gray.saturation, 0.0);
        assert_eq!(gray.hue, 0.0);
        assert!((gray.value - 128.0 / 255.0).abs() < 1e-6);

        let black = rgb_to_hsv(Rgb([0, 0, 0]));
        assert_eq!(black.saturation, 0.0);
        assert_eq!(black.value, 0.0);
    }

    #[test]
    fn test_hsv_magenta_wraps_into_upper_band() {
        let magenta = rgb_to_hsv(Rgb([255, 0, 200]));
        assert!(magenta.hue > 150.0 && magenta.hue <= 180.0);
    }

    #[test]
    fn test_reflect101() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-1, 1), 0);
        assert_eq!(reflect101(1, 2), 1);
        assert_eq!(reflect101(2, 2), 0);
    }

    #[test]
    fn test_sobel_flat_image_has_no_gradient() {
        let gray = GrayImage::from_pixel(6, 4, Luma([90]));
        let grads = sobel(&gray);
        assert_eq!(grads.len(), 24);
        assert!(grads.gx.iter().chain(&grads.gy).all(|v| *v == 0.0));
    }

    #[test]
    fn test_sobel_vertical_step() {
        let gray = GrayImage::from_fn(6, 6, |x, _| if x < 3 { Luma([0]) } else { Luma([100]) });
        let grads = sobel(&gray);
        // At the step, gx = (100 + 200 + 100) - 0
        let idx = 2 * 6 + 2;
        assert_eq!(grads.gx[idx], 400.0);
        assert_eq!(grads.gy[idx], 0.0);
        assert!((grads.magnitude(idx) - 400.0).abs() < 1e-9);
        assert_eq!(grads.direction(idx), 0.0);
    }

    #[test]
    fn test_canny_finds_step_edge() {
        let gray = GrayImage::from_fn(20, 20, |x, _| if x < 10 { Luma([0]) } else { Luma([255]) });
        let edges = canny(&gray, 50.0, 150.0);
        let count = edges.iter().filter(|e| **e).count();
        // A single one-pixel-wide column of edges
        assert_eq!(count, 20);
        for y in 0..20 {
            assert!(edges[y * 20 + 9]);
        }
    }

    #[test]
    fn test_canny_flat_image_has_no_edges() {
        let gray = GrayImage::from_pixel(10, 10, Luma([200]));
        assert!(canny(&gray, 50.0, 150.0).iter().all(|e| !e));
    }

    #[test]
    fn test_entropy() {
        let flat = GrayImage::from_pixel(4, 4, Luma([7]));
        assert!(shannon_entropy(&histogram(&flat)).abs() < 1e-6);

        let half = GrayImage::from_fn(4, 4, |x, _| if x < 2 { Luma([0]) } else { Luma([255]) });
        assert!((shannon_entropy(&histogram(&half)) - 1.0).abs() < 1e-6);
    }
}
