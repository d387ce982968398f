//! Seeded k-means over RGB pixels, used to report dominant colours.

use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One colour cluster: its centre and the fraction of pixels assigned to it
#[derive(Debug, Clone, PartialEq)]
pub struct ColorCluster {
    pub center: [f32; 3],
    pub share: f32,
}

impl ColorCluster {
    /// Centre rounded to 8-bit channels
    pub fn rgb(&self) -> [u8; 3] {
        self.center.map(|c| c.round().clamp(0.0, 255.0) as u8)
    }

    pub fn hex(&self) -> String {
        let [r, g, b] = self.rgb();
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

fn distance_sq(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    (0..3).map(|i| (a[i] - b[i]) * (a[i] - b[i])).sum()
}

fn nearest(centers: &[[f32; 3]], p: &[f32; 3]) -> usize {
    let mut best = 0;
    let mut best_d = f32::INFINITY;
    for (i, c) in centers.iter().enumerate() {
        let d = distance_sq(c, p);
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

/// k-means++ seeding followed by at most `iterations` Lloyd steps.
///
/// Deterministic for a given `seed`. Clusters are returned largest first;
/// empty clusters keep their previous centre and are dropped from the result.
pub fn kmeans_colors(image: &RgbImage, k: usize, iterations: usize, seed: u64) -> Vec<ColorCluster> {
    let pixels: Vec<[f32; 3]> = image
        .pixels()
        .map(|p| p.0.map(f32::from))
        .collect();
    if pixels.is_empty() || k == 0 {
        return Vec::new();
    }
    let k = k.min(pixels.len());
    let mut rng = StdRng::seed_from_u64(seed);

    let mut centers = Vec::with_capacity(k);
    centers.push(pixels[rng.gen_range(0..pixels.len())]);
    while centers.len() < k {
        let weights: Vec<f64> = pixels
            .iter()
            .map(|p| f64::from(distance_sq(&centers[nearest(&centers, p)], p)))
            .collect();
        let total: f64 = weights.iter().sum();
        let chosen = if total <= 0.0 {
            rng.gen_range(0..pixels.len())
        } else {
            let mut target = rng.gen::<f64>() * total;
            let mut idx = pixels.len() - 1;
            for (i, w) in weights.iter().enumerate() {
                if target < *w {
                    idx = i;
                    break;
                }
                target -= w;
            }
            idx
        };
        centers.push(pixels[chosen]);
    }

    let mut assignment = vec![usize::MAX; pixels.len()];
    for _ in 0..iterations {
        let mut changed = false;
        for (slot, p) in assignment.iter_mut().zip(&pixels) {
            let c = nearest(&centers, p);
            if *slot != c {
                *slot = c;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (&c, p) in assignment.iter().zip(&pixels) {
            counts[c] += 1;
            for ch in 0..3 {
                sums[c][ch] += f64::from(p[ch]);
            }
        }
        for (i, center) in centers.iter_mut().enumerate() {
            if counts[i] > 0 {
                *center = sums[i].map(|s| (s / counts[i] as f64) as f32);
            }
        }
    }

    let mut counts = vec![0usize; k];
    for p in &pixels {
        counts[nearest(&centers, p)] += 1;
    }

    let total = pixels.len() as f32;
    let mut clusters: Vec<ColorCluster> = centers
        .into_iter()
        .zip(counts)
        .filter(|(_, n)| *n > 0)
        .map(|(center, n)| ColorCluster {
            center,
            share: n as f32 / total,
        })
        .collect();
    clusters.sort_by(|a, b| b.share.partial_cmp(&a.share).unwrap_or(std::cmp::Ordering::Equal));
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn three_band_image() -> RgbImage {
        RgbImage::from_fn(30, 10, |x, _| match x {
            0..=14 => Rgb([200, 30, 30]),
            15..=24 => Rgb([30, 200, 30]),
            _ => Rgb([30, 30, 200]),
        })
    }

    #[test]
    fn test_kmeans_recovers_distinct_colors() {
        let clusters = kmeans_colors(&three_band_image(), 3, 10, 42);
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0].rgb(), [200, 30, 30]);
        assert!((clusters[0].share - 0.5).abs() < 1e-6);
        assert_eq!(clusters[1].rgb(), [30, 200, 30]);
        assert_eq!(clusters[2].rgb(), [30, 30, 200]);
    }

    #[test]
    fn test_kmeans_is_deterministic() {
        let img = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 90]));
        assert_eq!(kmeans_colors(&img, 3, 10, 7), kmeans_colors(&img, 3, 10, 7));
    }

    #[test]
    fn test_kmeans_uniform_image_collapses() {
        let img = RgbImage::from_pixel(8, 8, Rgb([10, 10, 10]));
        let clusters = kmeans_colors(&img, 3, 10, 42);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].share, 1.0);
        assert_eq!(clusters[0].hex(), "#0a0a0a");
    }

    #[test]
    fn test_kmeans_empty_image() {
        assert!(kmeans_colors(&RgbImage::new(0, 0), 3, 10, 42).is_empty());
    }
}
