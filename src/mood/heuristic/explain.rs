//! Display-oriented breakdown of a heuristic prediction.

use serde::Serialize;

use super::HeuristicAnalysis;
use crate::imaging::{kmeans_colors, WorkingImage};
use crate::mood::{RankedMood, ScoreVector};

pub const METHOD: &str = "heuristic_color_composition_texture";

const CLUSTER_COUNT: usize = 3;
const CLUSTER_ITERATIONS: usize = 10;
const CLUSTER_SEED: u64 = 42;

/// Grayscale variance above which strokes read as chaotic
const CHAOTIC_VARIANCE: f64 = 1000.0;
/// Ink centroid offsets below this on both axes read as centred
const CENTERED_OFFSET: f64 = 0.2;

#[derive(Debug, Clone, Serialize)]
pub struct HeuristicDetail {
    pub method: &'static str,
    pub resolution: [u32; 2],
    pub feature_scores: FeatureScores,
    pub final_scores: ScoreVector,
    pub ranked_moods: Vec<RankedMood>,
    pub color_dominance: ColorDominance,
    pub stroke_complexity: StrokeComplexity,
    pub composition: CompositionBalance,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureScores {
    pub color: ScoreVector,
    pub composition: ScoreVector,
    pub texture: ScoreVector,
}

#[derive(Debug, Clone, Serialize)]
pub struct DominantColor {
    pub rgb: [u8; 3],
    pub hex: String,
    pub share: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColorDominance {
    pub dominant_colors: Vec<DominantColor>,
    pub filtered_pixel_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureClass {
    Chaotic,
    Organized,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrokeComplexity {
    pub stroke_density: f64,
    pub texture: TextureClass,
    pub intensity_variance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Balance {
    Centered,
    OffCenter,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositionBalance {
    pub balance: Balance,
    /// Ink centroid relative to the image centre, each axis in [-0.5, 0.5]
    pub offset: [f64; 2],
}

pub(super) fn build_detail(working: &WorkingImage, analysis: &HeuristicAnalysis) -> HeuristicDetail {
    let (width, height) = analysis.resolution;

    let dominant_colors = kmeans_colors(working.rgb(), CLUSTER_COUNT, CLUSTER_ITERATIONS, CLUSTER_SEED)
        .into_iter()
        .map(|cluster| DominantColor {
            rgb: cluster.rgb(),
            hex: cluster.hex(),
            share: cluster.share,
        })
        .collect();

    let intensity_variance = intensity_variance(working);
    let texture = if intensity_variance > CHAOTIC_VARIANCE {
        TextureClass::Chaotic
    } else {
        TextureClass::Organized
    };

    let offset = ink_offset(working);
    let balance = if offset[0].abs() < CENTERED_OFFSET && offset[1].abs() < CENTERED_OFFSET {
        Balance::Centered
    } else {
        Balance::OffCenter
    };

    HeuristicDetail {
        method: METHOD,
        resolution: [width, height],
        feature_scores: FeatureScores {
            color: analysis.color.scores.clone(),
            composition: analysis.composition.scores.clone(),
            texture: analysis.texture.scores.clone(),
        },
        final_scores: analysis.final_scores.clone(),
        ranked_moods: analysis.final_scores.ranking(),
        color_dominance: ColorDominance {
            dominant_colors,
            filtered_pixel_ratio: analysis.color.informative_ratio(),
        },
        stroke_complexity: StrokeComplexity {
            stroke_density: analysis.composition.edge_density,
            texture,
            intensity_variance,
        },
        composition: CompositionBalance { balance, offset },
    }
}

fn intensity_variance(working: &WorkingImage) -> f64 {
    let values: Vec<f64> = working.gray().as_raw().iter().map(|&v| f64::from(v)).collect();
    crate::math::variance(&values)
}

/// Centroid of `255 - gray`, as an offset from the image centre.
fn ink_offset(working: &WorkingImage) -> [f64; 2] {
    let gray = working.gray();
    let (w, h) = (f64::from(gray.width()), f64::from(gray.height()));

    let (mut total, mut sx, mut sy) = (0.0, 0.0, 0.0);
    for (x, y, p) in gray.enumerate_pixels() {
        let ink = f64::from(255 - p.0[0]);
        total += ink;
        sx += ink * f64::from(x);
        sy += ink * f64::from(y);
    }
    if total == 0.0 {
        return [0.0, 0.0];
    }

    // Pixel centres sit at x + 0.5, so a uniform image lands exactly on 0
    [(sx / total + 0.5) / w - 0.5, (sy / total + 0.5) / h - 0.5]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::HeuristicMoodEngine;
    use image::{DynamicImage, Rgb, RgbImage};

    fn detail_for(img: RgbImage) -> HeuristicDetail {
        let working = WorkingImage::prepare(&DynamicImage::ImageRgb8(img)).unwrap();
        let analysis = HeuristicMoodEngine::new().analyze_working(&working).unwrap();
        build_detail(&working, &analysis)
    }

    #[test]
    fn test_uniform_gray_is_centered_and_organized() {
        let detail = detail_for(RgbImage::from_pixel(20, 10, Rgb([128, 128, 128])));
        assert_eq!(detail.composition.balance, Balance::Centered);
        assert!(detail.composition.offset[0].abs() < 1e-9);
        assert!(detail.composition.offset[1].abs() < 1e-9);
        assert_eq!(detail.stroke_complexity.texture, TextureClass::Organized);
        assert_eq!(detail.stroke_complexity.intensity_variance, 0.0);
        assert_eq!(detail.color_dominance.dominant_colors.len(), 1);
        assert_eq!(detail.resolution, [20, 10]);
    }

    #[test]
    fn test_dark_left_half_is_off_center_and_chaotic() {
        let detail = detail_for(RgbImage::from_fn(20, 20, |x, _| {
            if x < 10 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        }));
        assert_eq!(detail.composition.balance, Balance::OffCenter);
        assert!((detail.composition.offset[0] + 0.25).abs() < 1e-9);
        assert!(detail.composition.offset[1].abs() < 1e-9);
        assert_eq!(detail.stroke_complexity.texture, TextureClass::Chaotic);
        assert!((detail.stroke_complexity.stroke_density - 0.05).abs() < 1e-9);

        let shares: f32 = detail.color_dominance.dominant_colors.iter().map(|c| c.share).sum();
        assert!((shares - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_white_image_has_no_ink() {
        let detail = detail_for(RgbImage::from_pixel(8, 8, Rgb([255, 255, 255])));
        assert_eq!(detail.composition.offset, [0.0, 0.0]);
        assert_eq!(detail.color_dominance.filtered_pixel_ratio, 0.0);
    }

    #[test]
    fn test_detail_json_shape() {
        let detail = detail_for(RgbImage::from_pixel(8, 8, Rgb([30, 120, 200])));
        let json = serde_json::to_value(&detail).unwrap();

        assert_eq!(json["method"], METHOD);
        assert_eq!(json["composition"]["balance"], "centered");
        assert_eq!(json["stroke_complexity"]["texture"], "organized");
        assert!(json["final_scores"]["Calm"].is_number());
        assert_eq!(json["ranked_moods"].as_array().unwrap().len(), 4);
        assert_eq!(json["color_dominance"]["dominant_colors"][0]["hex"], "#1e78c8");
    }
}
