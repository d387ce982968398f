//! Classical-vision mood engine.
//!
//! Three independent scorers (colour, composition, texture) each produce a
//! score per basic mood. Their weighted sum is arg-maxed and the winning score
//! is rescaled into a presentation confidence.

pub mod color;
pub mod composition;
pub mod explain;
pub mod texture;

pub use color::{analyze_colors, ColorAnalysis, ColorStats};
pub use composition::{analyze_composition, CompositionAnalysis};
pub use explain::{HeuristicDetail, METHOD};
pub use texture::{analyze_texture, TextureAnalysis};

use image::DynamicImage;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use super::{AnalysisDetail, FallbackDetail, Mood, MoodEngine, Prediction, ScoreVector};
use crate::imaging::{AnalysisError, WorkingImage};

const COLOR_WEIGHT: f32 = 0.5;
const COMPOSITION_WEIGHT: f32 = 0.3;
const TEXTURE_WEIGHT: f32 = 0.2;

const CONFIDENCE_FLOOR: f32 = 0.6;
const CONFIDENCE_SPAN: f32 = 0.35;

const FALLBACK_FLOOR: f32 = 0.7;
const FALLBACK_SPAN: f32 = 0.2;

/// Everything computed for one image on the success path
#[derive(Debug, Clone)]
pub struct HeuristicAnalysis {
    /// Size of the working copy every scorer observed
    pub resolution: (u32, u32),
    pub color: ColorAnalysis,
    pub composition: CompositionAnalysis,
    pub texture: TextureAnalysis,
    pub final_scores: ScoreVector,
}

impl HeuristicAnalysis {
    pub fn prediction(&self) -> Prediction {
        let (mood, raw) = self.final_scores.argmax().unwrap_or((Mood::Happy, 0.0));
        Prediction {
            mood,
            confidence: (CONFIDENCE_FLOOR + raw * CONFIDENCE_SPAN).clamp(0.0, 1.0),
        }
    }
}

/// Heuristic engine. Holds no state; always ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMoodEngine;

impl HeuristicMoodEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run all three scorers on a downscaled working copy of `image`.
    pub fn analyze(&self, image: &DynamicImage) -> Result<HeuristicAnalysis, AnalysisError> {
        let working = WorkingImage::prepare(image)?;
        self.analyze_working(&working)
    }

    pub fn analyze_working(&self, working: &WorkingImage) -> Result<HeuristicAnalysis, AnalysisError> {
        let color = analyze_colors(working)?;
        let composition = analyze_composition(working)?;
        let texture = analyze_texture(working)?;

        let final_scores = ScoreVector::weighted_sum(
            &Mood::BASIC,
            &[
                (&color.scores, COLOR_WEIGHT),
                (&composition.scores, COMPOSITION_WEIGHT),
                (&texture.scores, TEXTURE_WEIGHT),
            ],
        );
        if !final_scores.is_finite() {
            return Err(AnalysisError::NonFiniteScores { stage: "combined" });
        }

        Ok(HeuristicAnalysis {
            resolution: working.dimensions(),
            color,
            composition,
            texture,
            final_scores,
        })
    }

    /// Prediction without the fallback policy applied.
    pub fn try_predict(&self, image: &DynamicImage) -> Result<Prediction, AnalysisError> {
        self.analyze(image).map(|analysis| analysis.prediction())
    }

    /// Random basic mood with confidence in [0.7, 0.9).
    pub fn fallback_prediction<R: Rng + ?Sized>(rng: &mut R) -> Prediction {
        let mood = Mood::BASIC.choose(rng).copied().unwrap_or(Mood::Calm);
        Prediction {
            mood,
            confidence: FALLBACK_FLOOR + rng.gen::<f32>() * FALLBACK_SPAN,
        }
    }
}

impl MoodEngine for HeuristicMoodEngine {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn predict(&self, image: &DynamicImage) -> Prediction {
        match self.try_predict(image) {
            Ok(prediction) => {
                debug!(mood = %prediction.mood, confidence = prediction.confidence, "Heuristic prediction");
                prediction
            }
            Err(e) => {
                warn!(error = %e, "Heuristic analysis failed, returning random mood");
                Self::fallback_prediction(&mut rand::thread_rng())
            }
        }
    }

    fn explain(&self, image: &DynamicImage) -> AnalysisDetail {
        self.predict_explained(image).1
    }

    fn predict_explained(&self, image: &DynamicImage) -> (Prediction, AnalysisDetail) {
        let result = WorkingImage::prepare(image).and_then(|working| {
            let analysis = self.analyze_working(&working)?;
            Ok((analysis.prediction(), explain::build_detail(&working, &analysis)))
        });

        match result {
            Ok((prediction, detail)) => {
                debug!(mood = %prediction.mood, confidence = prediction.confidence, "Heuristic prediction");
                (prediction, AnalysisDetail::Heuristic(Box::new(detail)))
            }
            Err(e) => {
                warn!(error = %e, "Heuristic analysis failed, returning random mood");
                let detail = FallbackDetail {
                    method: METHOD,
                    model: None,
                    device: None,
                    error: e.to_string(),
                    fallback: true,
                };
                (
                    Self::fallback_prediction(&mut rand::thread_rng()),
                    AnalysisDetail::Fallback(detail),
                )
            }
        }
    }

    fn available_moods(&self) -> &'static [Mood] {
        &Mood::BASIC
    }

    fn is_ready(&self) -> bool {
        true
    }
}
