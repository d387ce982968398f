//! Composition scoring from edge density and intensity entropy.

use crate::imaging::{canny, histogram, shannon_entropy, AnalysisError, WorkingImage};
use crate::mood::{Mood, ScoreVector};

pub const CANNY_LOW: f64 = 50.0;
pub const CANNY_HIGH: f64 = 150.0;

#[derive(Debug, Clone)]
pub struct CompositionAnalysis {
    pub scores: ScoreVector,
    pub total_pixels: usize,
    /// Fraction of pixels marked as edges
    pub edge_density: f64,
    /// Shannon entropy of the intensity histogram, in bits
    pub entropy: f64,
}

/// Fraction of Canny edge pixels in a working image.
pub fn edge_density(image: &WorkingImage) -> f64 {
    let edges = canny(image.gray(), CANNY_LOW, CANNY_HIGH);
    if edges.is_empty() {
        return 0.0;
    }
    edges.iter().filter(|e| **e).count() as f64 / edges.len() as f64
}

pub fn analyze_composition(image: &WorkingImage) -> Result<CompositionAnalysis, AnalysisError> {
    let edge_density = edge_density(image);
    let entropy = shannon_entropy(&histogram(image.gray()));

    let scores = score_composition(edge_density, entropy);
    if !scores.is_finite() {
        return Err(AnalysisError::NonFiniteScores {
            stage: "composition",
        });
    }

    Ok(CompositionAnalysis {
        scores,
        total_pixels: image.pixel_count(),
        edge_density,
        entropy,
    })
}

pub fn score_composition(edge_density: f64, entropy: f64) -> ScoreVector {
    let e8 = (entropy / 8.0).min(1.0);
    ScoreVector::from_fn(&Mood::BASIC, |mood| {
        let score = match mood {
            Mood::Happy => 0.6 * (5.0 * edge_density).min(1.0) + 0.4 * e8,
            Mood::Sad => 0.7 * (1.0 - (3.0 * edge_density).min(1.0)) + 0.3 * (1.0 - e8),
            Mood::Calm => {
                0.8 * (1.0 - 2.0 * (5.0 * edge_density - 0.5).abs()).max(0.0) + 0.2 * e8
            }
            Mood::Angry => 0.5 * (8.0 * edge_density).min(1.0) + 0.5 * (entropy / 6.0).min(1.0),
            _ => 0.0,
        };
        score as f32
    })
}
