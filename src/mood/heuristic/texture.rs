//! Texture scoring from Sobel gradient statistics.

use crate::imaging::{sobel, AnalysisError, WorkingImage};
use crate::math;
use crate::mood::{Mood, ScoreVector};

#[derive(Debug, Clone)]
pub struct TextureAnalysis {
    pub scores: ScoreVector,
    pub total_pixels: usize,
    pub mean_magnitude: f64,
    /// Population variance of gradient direction, in radians squared
    pub direction_variance: f64,
}

pub fn analyze_texture(image: &WorkingImage) -> Result<TextureAnalysis, AnalysisError> {
    let grads = sobel(image.gray());
    let magnitudes: Vec<f64> = (0..grads.len()).map(|i| grads.magnitude(i)).collect();
    let directions: Vec<f64> = (0..grads.len()).map(|i| grads.direction(i)).collect();

    let mean_magnitude = math::mean(&magnitudes);
    let direction_variance = math::variance(&directions);

    let scores = score_texture(mean_magnitude, direction_variance);
    if !scores.is_finite() {
        return Err(AnalysisError::NonFiniteScores { stage: "texture" });
    }

    Ok(TextureAnalysis {
        scores,
        total_pixels: grads.len(),
        mean_magnitude,
        direction_variance,
    })
}

pub fn score_texture(mean_magnitude: f64, direction_variance: f64) -> ScoreVector {
    let dv = direction_variance.min(1.0);
    ScoreVector::from_fn(&Mood::BASIC, |mood| {
        let score = match mood {
            Mood::Happy => 0.6 * (mean_magnitude / 50.0).min(1.0) + 0.4 * (1.0 - dv),
            Mood::Sad => 0.7 * (1.0 - (mean_magnitude / 30.0).min(1.0)) + 0.3 * (1.0 - dv),
            Mood::Calm => 0.8 * (1.0 - (mean_magnitude / 20.0).min(1.0)) + 0.2 * (1.0 - dv),
            Mood::Angry => {
                0.6 * (mean_magnitude / 40.0).min(1.0)
                    + 0.4 * (2.0 * direction_variance).min(1.0)
            }
            _ => 0.0,
        };
        score as f32
    })
}
