//! Mood prediction for artwork images.
//!
//! Two independent engines implement [`MoodEngine`]:
//! - [`HeuristicMoodEngine`] scores colour, composition and texture statistics.
//! - [`EmbeddingMoodEngine`] compares a CLIP image embedding against
//!   per-mood prototypes built from descriptive phrases.
//!
//! Neither engine ever fails a prediction: analysis errors are absorbed by
//! each engine's own fallback policy.

pub mod embedding;
pub mod heuristic;
pub mod prompts;
pub mod scores;

pub use embedding::{EmbeddingDetail, EmbeddingMoodEngine, MoodPrototype};
pub use heuristic::{HeuristicDetail, HeuristicMoodEngine};
pub use prompts::{descriptor, MoodDescriptor, CATALOG};
pub use scores::{RankedMood, ScoreVector};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Mood category assigned to an artwork
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Happy,
    Sad,
    Calm,
    Angry,
    Anxious,
    Excited,
}

impl Mood {
    /// Every category, in enumeration order
    pub const ALL: [Mood; 6] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Calm,
        Mood::Angry,
        Mood::Anxious,
        Mood::Excited,
    ];

    /// The four categories scored by the heuristic engine
    pub const BASIC: [Mood; 4] = [Mood::Happy, Mood::Sad, Mood::Calm, Mood::Angry];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Sad => "Sad",
            Mood::Calm => "Calm",
            Mood::Angry => "Angry",
            Mood::Anxious => "Anxious",
            Mood::Excited => "Excited",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which engine the service runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Heuristic,
    Embedding,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Heuristic => write!(f, "heuristic"),
            EngineKind::Embedding => write!(f, "embedding"),
        }
    }
}

/// Predicted mood with a confidence in [0, 1].
///
/// Confidence semantics differ per engine and are not comparable across them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub mood: Mood,
    pub confidence: f32,
}

/// Structured explanation of how a prediction was reached.
///
/// Display-only; keys are engine specific.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalysisDetail {
    Heuristic(Box<HeuristicDetail>),
    Embedding(EmbeddingDetail),
    Fallback(FallbackDetail),
}

/// Detail returned when analysis failed and the engine fell back
#[derive(Debug, Clone, Serialize)]
pub struct FallbackDetail {
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    pub error: String,
    pub fallback: bool,
}

impl AnalysisDetail {
    pub fn is_fallback(&self) -> bool {
        matches!(self, AnalysisDetail::Fallback(_))
    }
}

/// Contract shared by both engines.
///
/// Implementations hold only read-only state after construction, so a single
/// instance may serve concurrent callers without locking.
pub trait MoodEngine: Send + Sync {
    /// Short engine identifier for logs and health output
    fn name(&self) -> &'static str;

    /// Predict a mood. Never fails; degenerate input takes the engine's fallback.
    fn predict(&self, image: &DynamicImage) -> Prediction;

    /// Explain a prediction in engine-specific terms.
    fn explain(&self, image: &DynamicImage) -> AnalysisDetail;

    /// Prediction and explanation from a single analysis of `image`.
    ///
    /// Both halves describe the same run, so the detail's top mood always
    /// agrees with the prediction. The default analyses twice; engines
    /// override it to share the work.
    fn predict_explained(&self, image: &DynamicImage) -> (Prediction, AnalysisDetail) {
        (self.predict(image), self.explain(image))
    }

    /// Fixed categories this engine can return, in enumeration order
    fn available_moods(&self) -> &'static [Mood];

    fn is_ready(&self) -> bool;
}
