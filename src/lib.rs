//! Art Mood
//!
//! An HTTP service that predicts the mood of an uploaded artwork, backed by
//! either a classical-vision heuristic engine or a CLIP embedding-similarity
//! engine.

pub mod auth;
pub mod config;
pub mod error;
pub mod imaging;
pub mod inference;
pub mod math;
pub mod mood;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, Result};

pub use mood::{
    AnalysisDetail, EmbeddingMoodEngine, EngineKind, HeuristicMoodEngine, Mood, MoodEngine,
    Prediction,
};
