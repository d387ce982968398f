//! Engine ownership for the HTTP layer.
//!
//! The heuristic engine is built eagerly. The embedding engine is built on
//! first use: the encoder loader runs once, prototypes are computed on a
//! blocking thread, and concurrent first requests await the same attempt.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::inference::EncoderLoader;
use crate::mood::{EmbeddingMoodEngine, EngineKind, HeuristicMoodEngine, Mood, MoodEngine};

#[derive(Clone)]
pub struct EngineProvider {
    kind: EngineKind,
    heuristic: Arc<HeuristicMoodEngine>,
    embedding: Arc<OnceCell<Arc<EmbeddingMoodEngine>>>,
    loader: Arc<dyn EncoderLoader>,
}

impl EngineProvider {
    pub fn new(kind: EngineKind, loader: Arc<dyn EncoderLoader>) -> Self {
        Self {
            kind,
            heuristic: Arc::new(HeuristicMoodEngine::new()),
            embedding: Arc::new(OnceCell::new()),
            loader,
        }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    /// Embedding engine, initialising it on first call.
    ///
    /// Any loader or prototype failure is reported as `EngineUnavailable`. A failed
    /// attempt leaves the cell empty, so the next call retries.
    pub async fn embedding(&self) -> Result<Arc<EmbeddingMoodEngine>> {
        self.embedding
            .get_or_try_init(|| async {
                let encoder = self.loader.load().await.map_err(|e| {
                    error!(error = %e, "Failed to load embedding model");
                    AppError::EngineUnavailable(e.to_string())
                })?;

                info!(model = encoder.model_name(), device = %encoder.device(), "Building mood prototypes");
                let engine = tokio::task::spawn_blocking(move || EmbeddingMoodEngine::new(encoder))
                    .await
                    .map_err(|e| AppError::Internal(format!("Join error: {e}")))?
                    .map_err(|e| AppError::EngineUnavailable(e.to_string()))?;

                Ok::<_, AppError>(Arc::new(engine))
            })
            .await
            .cloned()
    }

    /// Categories of the configured engine. Never starts the model.
    pub fn available_moods(&self) -> &'static [Mood] {
        match self.kind {
            EngineKind::Heuristic => &Mood::BASIC,
            EngineKind::Embedding => &Mood::ALL,
        }
    }

    /// The configured engine
    pub async fn selected(&self) -> Result<Arc<dyn MoodEngine>> {
        let engine: Arc<dyn MoodEngine> = match self.kind {
            EngineKind::Heuristic => self.heuristic.clone(),
            EngineKind::Embedding => self.embedding().await?,
        };
        Ok(engine)
    }

    /// Readiness without triggering initialisation
    pub fn is_ready(&self) -> bool {
        match self.kind {
            EngineKind::Heuristic => self.heuristic.is_ready(),
            EngineKind::Embedding => self.embedding.get().is_some_and(|e| e.is_ready()),
        }
    }
}
