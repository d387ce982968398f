//! Embedding-similarity mood engine.
//!
//! Each mood gets a prototype: the re-normalised mean of the unit-normalised
//! text embeddings of its descriptive phrases. An image is classified by the
//! cosine similarity of its embedding to every prototype, with negative
//! similarities clamped to zero.

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{
    AnalysisDetail, FallbackDetail, Mood, MoodEngine, Prediction, RankedMood, ScoreVector, CATALOG,
};
use crate::inference::{Device, Embedding, ImageTextEncoder, InferenceError};
use crate::math;

pub const METHOD: &str = "CLIP_cosine_similarity";

const FALLBACK: Prediction = Prediction {
    mood: Mood::Calm,
    confidence: 0.5,
};

/// Unit-norm prototype vector for one mood
#[derive(Debug, Clone)]
pub struct MoodPrototype {
    pub mood: Mood,
    pub vector: Embedding,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingDetail {
    pub method: &'static str,
    pub model: String,
    pub device: Device,
    pub all_scores: ScoreVector,
    pub ranked_moods: Vec<RankedMood>,
    pub top_prediction: Mood,
}

/// Embedding engine. Prototypes are built once in [`EmbeddingMoodEngine::new`]
/// and only read afterwards.
pub struct EmbeddingMoodEngine {
    encoder: Arc<dyn ImageTextEncoder>,
    prototypes: Vec<MoodPrototype>,
}

impl std::fmt::Debug for EmbeddingMoodEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingMoodEngine")
            .field("model", &self.encoder.model_name())
            .field("device", &self.encoder.device())
            .field("prototypes", &self.prototypes.len())
            .finish()
    }
}

impl EmbeddingMoodEngine {
    /// Encode every catalog phrase and build the per-mood prototypes.
    pub fn new(encoder: Arc<dyn ImageTextEncoder>) -> Result<Self, InferenceError> {
        let started = Instant::now();
        let mut prototypes = Vec::with_capacity(CATALOG.len());

        for descriptor in CATALOG {
            let vectors = descriptor
                .phrases
                .iter()
                .map(|phrase| encoder.encode_text(phrase).map(|e| e.normalized().into_data()))
                .collect::<Result<Vec<_>, _>>()?;

            let mean = math::mean_vector(&vectors).ok_or_else(|| {
                InferenceError::InvalidEmbedding(format!(
                    "phrase embeddings for {} differ in dimension",
                    descriptor.mood
                ))
            })?;

            prototypes.push(MoodPrototype {
                mood: descriptor.mood,
                vector: Embedding::new(mean)?.normalized(),
            });
        }

        info!(
            model = encoder.model_name(),
            moods = prototypes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Mood prototypes ready"
        );

        Ok(Self { encoder, prototypes })
    }

    pub fn prototypes(&self) -> &[MoodPrototype] {
        &self.prototypes
    }

    pub fn model_name(&self) -> &str {
        self.encoder.model_name()
    }

    pub fn device(&self) -> Device {
        self.encoder.device()
    }

    fn prototype(&self, mood: Mood) -> Option<&MoodPrototype> {
        self.prototypes.iter().find(|p| p.mood == mood)
    }

    /// Clamped cosine similarity of `image` to every prototype.
    pub fn similarities(&self, image: &DynamicImage) -> Result<ScoreVector, InferenceError> {
        let embedding = self.encoder.encode_image(image)?.normalized();

        if let Some(expected) = self.prototypes.first().map(|p| p.vector.dim()) {
            if embedding.dim() != expected {
                return Err(InferenceError::InvalidEmbedding(format!(
                    "image embedding has {} dimensions, prototypes have {expected}",
                    embedding.dim()
                )));
            }
        }

        let scores = ScoreVector::from_fn(&Mood::ALL, |mood| {
            self.prototype(mood)
                .map(|p| embedding.cosine_similarity(&p.vector).max(0.0))
                .unwrap_or(0.0)
        });
        if !scores.is_finite() {
            return Err(InferenceError::InvalidEmbedding(
                "similarity is not finite".to_string(),
            ));
        }
        Ok(scores)
    }

    /// Prediction without the fallback policy applied.
    pub fn try_predict(&self, image: &DynamicImage) -> Result<Prediction, InferenceError> {
        Self::prediction_from(&self.similarities(image)?)
    }

    fn prediction_from(scores: &ScoreVector) -> Result<Prediction, InferenceError> {
        let (mood, similarity) = scores
            .argmax()
            .ok_or_else(|| InferenceError::InvalidEmbedding("no prototypes".to_string()))?;
        Ok(Prediction {
            mood,
            confidence: similarity.min(1.0),
        })
    }

    fn detail_from(&self, scores: ScoreVector) -> EmbeddingDetail {
        let ranked_moods = scores.ranking();
        let top_prediction = ranked_moods.first().map(|r| r.mood).unwrap_or(FALLBACK.mood);
        EmbeddingDetail {
            method: METHOD,
            model: self.model_name().to_string(),
            device: self.device(),
            all_scores: scores,
            ranked_moods,
            top_prediction,
        }
    }

    fn fallback_detail(&self, error: &InferenceError) -> FallbackDetail {
        FallbackDetail {
            method: METHOD,
            model: Some(self.model_name().to_string()),
            device: Some(self.device().to_string()),
            error: error.to_string(),
            fallback: true,
        }
    }
}

impl MoodEngine for EmbeddingMoodEngine {
    fn name(&self) -> &'static str {
        "embedding"
    }

    fn predict(&self, image: &DynamicImage) -> Prediction {
        match self.try_predict(image) {
            Ok(prediction) => {
                debug!(mood = %prediction.mood, confidence = prediction.confidence, "Embedding prediction");
                prediction
            }
            Err(e) => {
                warn!(error = %e, "Embedding analysis failed, returning Calm");
                FALLBACK
            }
        }
    }

    fn explain(&self, image: &DynamicImage) -> AnalysisDetail {
        match self.similarities(image) {
            Ok(scores) => AnalysisDetail::Embedding(self.detail_from(scores)),
            Err(e) => {
                warn!(error = %e, "Embedding explanation failed");
                AnalysisDetail::Fallback(self.fallback_detail(&e))
            }
        }
    }

    fn predict_explained(&self, image: &DynamicImage) -> (Prediction, AnalysisDetail) {
        let result = self.similarities(image).and_then(|scores| {
            let prediction = Self::prediction_from(&scores)?;
            Ok((prediction, self.detail_from(scores)))
        });

        match result {
            Ok((prediction, detail)) => {
                debug!(mood = %prediction.mood, confidence = prediction.confidence, "Embedding prediction");
                (prediction, AnalysisDetail::Embedding(detail))
            }
            Err(e) => {
                warn!(error = %e, "Embedding analysis failed, returning Calm");
                (FALLBACK, AnalysisDetail::Fallback(self.fallback_detail(&e)))
            }
        }
    }

    fn available_moods(&self) -> &'static [Mood] {
        &Mood::ALL
    }

    fn is_ready(&self) -> bool {
        self.prototypes.len() == Mood::ALL.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::fake::FakeEncoder;
    use image::RgbImage;

    fn image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
    }

    fn engine_with(vector: Vec<f32>) -> (Arc<FakeEncoder>, EmbeddingMoodEngine) {
        let encoder = Arc::new(FakeEncoder::new(vector));
        let engine = EmbeddingMoodEngine::new(encoder.clone()).unwrap();
        (encoder, engine)
    }

    #[test]
    fn test_prototypes_are_unit_norm_and_encoded_once() {
        let (encoder, engine) = engine_with(vec![1.0; 6]);
        assert_eq!(encoder.text_calls(), 30);
        assert_eq!(engine.prototypes().len(), 6);
        for prototype in engine.prototypes() {
            assert!((math::l2_norm(prototype.vector.data()) - 1.0).abs() < 1e-6);
        }

        engine.predict(&image());
        engine.explain(&image());
        assert_eq!(encoder.text_calls(), 30);
        assert_eq!(encoder.image_calls(), 2);
        assert!(engine.is_ready());
    }

    #[test]
    fn test_predicts_most_similar_mood() {
        // Axes follow the catalog order: Happy, Sad, Calm, Angry, Anxious, Excited
        let (_, engine) = engine_with(vec![0.1, 0.2, 0.9, 0.3, 0.05, 0.15]);
        let prediction = engine.predict(&image());
        assert_eq!(prediction.mood, Mood::Calm);

        let norm = math::l2_norm(&[0.1, 0.2, 0.9, 0.3, 0.05, 0.15]);
        assert!((prediction.confidence - 0.9 / norm).abs() < 1e-5);
    }

    #[test]
    fn test_ranking_is_consistent_with_predict() {
        let (_, engine) = engine_with(vec![0.3, 0.6, 0.1, 0.5, 0.2, 0.4]);
        let prediction = engine.predict(&image());

        let AnalysisDetail::Embedding(detail) = engine.explain(&image()) else {
            panic!("expected embedding detail");
        };
        let ranked: Vec<Mood> = detail.ranked_moods.iter().map(|r| r.mood).collect();
        assert_eq!(
            ranked,
            vec![Mood::Sad, Mood::Angry, Mood::Excited, Mood::Happy, Mood::Anxious, Mood::Calm]
        );
        assert!(detail.ranked_moods.windows(2).all(|w| w[0].score > w[1].score));
        assert_eq!(detail.ranked_moods[0].mood, prediction.mood);
        assert_eq!(detail.top_prediction, prediction.mood);
        assert_eq!(detail.model, "fake/clip");
        assert_eq!(detail.all_scores.len(), 6);
    }

    #[test]
    fn test_predict_explained_encodes_the_image_once() {
        let (encoder, engine) = engine_with(vec![0.3, 0.6, 0.1, 0.5, 0.2, 0.4]);
        let (prediction, detail) = engine.predict_explained(&image());
        assert_eq!(encoder.image_calls(), 1);

        assert_eq!(prediction, engine.predict(&image()));
        let AnalysisDetail::Embedding(detail) = detail else {
            panic!("expected embedding detail");
        };
        assert_eq!(detail.top_prediction, prediction.mood);
        assert_eq!(detail.ranked_moods[0].mood, prediction.mood);
    }

    #[test]
    fn test_predict_explained_falls_back_as_a_pair() {
        let encoder = Arc::new(FakeEncoder::failing_images());
        let engine = EmbeddingMoodEngine::new(encoder.clone()).unwrap();
        let (prediction, detail) = engine.predict_explained(&image());
        assert_eq!(prediction, FALLBACK);
        assert!(detail.is_fallback());
        assert_eq!(encoder.image_calls(), 1);
    }

    #[test]
    fn test_negative_similarity_is_clamped() {
        let (_, engine) = engine_with(vec![-0.5, 0.2, -0.1, -0.9, 0.0, -0.3]);
        let scores = engine.similarities(&image()).unwrap();
        assert_eq!(scores.get(Mood::Happy), Some(0.0));
        assert_eq!(scores.get(Mood::Angry), Some(0.0));
        assert!(scores.iter().all(|(_, s)| (0.0..=1.0).contains(&s)));

        let prediction = engine.predict(&image());
        assert_eq!(prediction.mood, Mood::Sad);
    }

    #[test]
    fn test_all_negative_ties_resolve_to_first_mood() {
        let (_, engine) = engine_with(vec![-1.0; 6]);
        let prediction = engine.predict(&image());
        assert_eq!(prediction.mood, Mood::Happy);
        assert_eq!(prediction.confidence, 0.0);
    }

    #[test]
    fn test_encoder_failure_falls_back_to_calm() {
        let engine = EmbeddingMoodEngine::new(Arc::new(FakeEncoder::failing_images())).unwrap();
        let prediction = engine.predict(&image());
        assert_eq!(prediction, Prediction { mood: Mood::Calm, confidence: 0.5 });

        let detail = serde_json::to_value(engine.explain(&image())).unwrap();
        assert_eq!(detail["fallback"], true);
        assert_eq!(detail["method"], METHOD);
        assert_eq!(detail["model"], "fake/clip");
        assert_eq!(detail["device"], "cpu");
    }

    #[test]
    fn test_dimension_mismatch_falls_back() {
        let (_, engine) = engine_with(vec![1.0, 0.0, 0.0]);
        assert!(engine.similarities(&image()).is_err());
        assert_eq!(engine.predict(&image()).mood, Mood::Calm);
    }

    #[test]
    fn test_detail_json_shape() {
        let (_, engine) = engine_with(vec![0.9, 0.1, 0.0, 0.0, 0.0, 0.0]);
        let json = serde_json::to_value(engine.explain(&image())).unwrap();
        assert_eq!(json["method"], "CLIP_cosine_similarity");
        assert_eq!(json["top_prediction"], "Happy");
        assert_eq!(json["ranked_moods"][0]["mood"], "Happy");
        assert!(json["all_scores"]["Excited"].is_number());
    }
}
