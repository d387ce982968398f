//! Colour scoring in HSV space.

use serde::Serialize;

use crate::imaging::{rgb_to_hsv, AnalysisError, WorkingImage};
use crate::math;
use crate::mood::{Mood, ScoreVector};

/// Pixels darker or brighter than this band carry no mood signal
const VALUE_BAND: (f32, f32) = (0.1, 0.9);
/// Pixels below this saturation are treated as gray
const MIN_SATURATION: f32 = 0.1;

/// Colour statistics over the pixels that survive filtering
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorStats {
    pub avg_saturation: f64,
    pub avg_value: f64,
    pub value_std: f64,
    pub warm_ratio: f64,
    pub cool_ratio: f64,
    pub green_blue_ratio: f64,
    pub red_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct ColorAnalysis {
    pub scores: ScoreVector,
    /// Pixels in the working image
    pub total_pixels: usize,
    /// Pixels kept after the brightness/saturation filter
    pub informative_pixels: usize,
    /// `None` when no pixel survived filtering
    pub stats: Option<ColorStats>,
}

impl ColorAnalysis {
    pub fn informative_ratio(&self) -> f64 {
        if self.total_pixels == 0 {
            0.0
        } else {
            self.informative_pixels as f64 / self.total_pixels as f64
        }
    }
}

fn in_range(h: f32, lo: f32, hi: f32) -> bool {
    (lo..=hi).contains(&h)
}

/// Score colour mood cues; neutral 0.5 everywhere if nothing is informative.
pub fn analyze_colors(image: &WorkingImage) -> Result<ColorAnalysis, AnalysisError> {
    let total_pixels = image.pixel_count();

    let mut saturation = Vec::new();
    let mut value = Vec::new();
    let (mut warm, mut cool, mut green_blue, mut red) = (0usize, 0usize, 0usize, 0usize);

    for pixel in image.rgb().pixels() {
        let hsv = rgb_to_hsv(*pixel);
        if hsv.value <= VALUE_BAND.0 || hsv.value >= VALUE_BAND.1 || hsv.saturation < MIN_SATURATION
        {
            continue;
        }

        let h = hsv.hue;
        if in_range(h, 0.0, 30.0) || in_range(h, 150.0, 180.0) {
            warm += 1;
        }
        if in_range(h, 80.0, 140.0) {
            cool += 1;
        }
        if in_range(h, 60.0, 120.0) {
            green_blue += 1;
        }
        if in_range(h, 0.0, 15.0) || in_range(h, 165.0, 180.0) {
            red += 1;
        }
        saturation.push(f64::from(hsv.saturation));
        value.push(f64::from(hsv.value));
    }

    let informative_pixels = saturation.len();
    if informative_pixels == 0 {
        return Ok(ColorAnalysis {
            scores: ScoreVector::uniform(&Mood::BASIC, 0.5),
            total_pixels,
            informative_pixels,
            stats: None,
        });
    }

    let n = informative_pixels as f64;
    let stats = ColorStats {
        avg_saturation: math::mean(&saturation),
        avg_value: math::mean(&value),
        value_std: math::std_dev(&value),
        warm_ratio: warm as f64 / n,
        cool_ratio: cool as f64 / n,
        green_blue_ratio: green_blue as f64 / n,
        red_ratio: red as f64 / n,
    };

    let scores = score_colors(&stats);
    if !scores.is_finite() {
        return Err(AnalysisError::NonFiniteScores { stage: "color" });
    }

    Ok(ColorAnalysis {
        scores,
        total_pixels,
        informative_pixels,
        stats: Some(stats),
    })
}

/// Per-mood colour scores from aggregated statistics.
pub fn score_colors(s: &ColorStats) -> ScoreVector {
    ScoreVector::from_fn(&Mood::BASIC, |mood| {
        let score = match mood {
            Mood::Happy => 0.4 * s.warm_ratio + 0.4 * s.avg_saturation + 0.2 * s.avg_value,
            Mood::Sad => {
                0.4 * s.cool_ratio + 0.3 * (1.0 - s.avg_saturation) + 0.3 * (1.0 - s.avg_value)
            }
            Mood::Calm => {
                0.5 * s.green_blue_ratio + 0.5 * (1.0 - 2.0 * (s.avg_saturation - 0.5).abs())
            }
            Mood::Angry => {
                0.4 * s.red_ratio + 0.3 * s.avg_saturation + 0.3 * (3.0 * s.value_std).min(1.0)
            }
            _ => 0.0,
        };
        score as f32
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn working(img: RgbImage) -> WorkingImage {
        WorkingImage::prepare(&DynamicImage::ImageRgb8(img)).unwrap()
    }

    #[test]
    fn test_uninformative_pixels_give_neutral_scores() {
        // Pure black, pure white and saturated full-brightness colours are all filtered out
        let img = RgbImage::from_fn(9, 3, |x, _| match x % 3 {
            0 => Rgb([0, 0, 0]),
            1 => Rgb([255, 255, 255]),
            _ => Rgb([255, 100, 100]),
        });
        let analysis = analyze_colors(&working(img)).unwrap();
        assert_eq!(analysis.informative_pixels, 0);
        assert!(analysis.stats.is_none());
        assert_eq!(analysis.scores, ScoreVector::uniform(&Mood::BASIC, 0.5));
    }

    #[test]
    fn test_mid_red_scores_warm_and_red() {
        let analysis = analyze_colors(&working(RgbImage::from_pixel(10, 10, Rgb([180, 20, 20])))).unwrap();
        let stats = analysis.stats.unwrap();
        assert_eq!(analysis.informative_pixels, 100);
        assert_eq!(stats.warm_ratio, 1.0);
        assert_eq!(stats.red_ratio, 1.0);
        assert_eq!(stats.cool_ratio, 0.0);
        assert_eq!(stats.value_std, 0.0);

        let happy = analysis.scores.get(Mood::Happy).unwrap();
        let sad = analysis.scores.get(Mood::Sad).unwrap();
        assert!(happy > sad);
    }

    #[test]
    fn test_mid_blue_scores_cool() {
        let analysis = analyze_colors(&working(RgbImage::from_pixel(10, 10, Rgb([20, 60, 160])))).unwrap();
        let stats = analysis.stats.unwrap();
        assert_eq!(stats.cool_ratio, 1.0);
        assert_eq!(stats.warm_ratio, 0.0);
        assert!(analysis.scores.get(Mood::Sad).unwrap() > analysis.scores.get(Mood::Happy).unwrap());
    }

    #[test]
    fn test_score_formulas() {
        let stats = ColorStats {
            avg_saturation: 0.5,
            avg_value: 0.5,
            value_std: 0.5,
            warm_ratio: 1.0,
            cool_ratio: 0.0,
            green_blue_ratio: 0.0,
            red_ratio: 0.5,
        };
        let scores = score_colors(&stats);
        assert!((scores.get(Mood::Happy).unwrap() - 0.7).abs() < 1e-6);
        assert!((scores.get(Mood::Sad).unwrap() - 0.3).abs() < 1e-6);
        assert!((scores.get(Mood::Calm).unwrap() - 0.5).abs() < 1e-6);
        // 3 * std is capped at 1
        assert!((scores.get(Mood::Angry).unwrap() - 0.65).abs() < 1e-6);
    }
}
