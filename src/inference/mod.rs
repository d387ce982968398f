//! Joint image/text embedding models.
//!
//! The embedding mood engine only sees the [`ImageTextEncoder`] capability.
//! The ONNX Runtime CLIP implementation and its Hugging Face download live
//! behind the `inference` feature; without it, [`UnavailableLoader`] reports
//! the engine as unavailable.

#[cfg(feature = "inference")]
mod download;
#[cfg(test)]
pub(crate) mod fake;
#[cfg(feature = "inference")]
mod model;
mod registry;

#[cfg(feature = "inference")]
pub use download::{default_cache_dir, download_model, ModelPaths};
#[cfg(feature = "inference")]
pub use model::{ClipLoader, ClipModel};
pub use registry::{KnownModel, KNOWN_MODELS};

use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use serde::Serialize;

use crate::error::AppError;
use crate::math;

/// Embedding vector produced by an encoder
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    data: Vec<f32>,
}

impl Embedding {
    /// Wrap raw encoder output. Rejects empty or non-finite vectors.
    pub fn new(data: Vec<f32>) -> Result<Self, InferenceError> {
        if data.is_empty() {
            return Err(InferenceError::InvalidEmbedding(
                "embedding is empty".to_string(),
            ));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(InferenceError::InvalidEmbedding(
                "embedding contains non-finite values".to_string(),
            ));
        }
        Ok(Self { data })
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn dim(&self) -> usize {
        self.data.len()
    }

    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        math::cosine_similarity(&self.data, &other.data)
    }

    /// L2 normalize the embedding in place
    pub fn normalize(&mut self) {
        math::normalize_in_place(&mut self.data);
    }

    pub fn normalized(&self) -> Self {
        let mut copy = self.clone();
        copy.normalize();
        copy
    }
}

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
        }
    }
}

/// Inference error types
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("Model download failed: {0}")]
    DownloadFailed(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("ONNX runtime error: {0}")]
    Onnx(String),

    #[error("Invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::ModelNotLoaded(_) | InferenceError::DownloadFailed(_) => {
                AppError::EngineUnavailable(err.to_string())
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}

/// Encoder mapping images and text into one embedding space
pub trait ImageTextEncoder: Send + Sync {
    fn encode_image(&self, image: &DynamicImage) -> Result<Embedding, InferenceError>;

    fn encode_text(&self, text: &str) -> Result<Embedding, InferenceError>;

    /// Identifier reported in analysis detail
    fn model_name(&self) -> &str;

    fn device(&self) -> Device;
}

/// Produces an encoder on first use of the embedding engine
#[async_trait]
pub trait EncoderLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn ImageTextEncoder>, InferenceError>;
}

/// Loader used when the crate is built without model support
#[derive(Debug, Clone, Default)]
pub struct UnavailableLoader;

#[async_trait]
impl EncoderLoader for UnavailableLoader {
    async fn load(&self) -> Result<Arc<dyn ImageTextEncoder>, InferenceError> {
        Err(InferenceError::ModelNotLoaded(
            "built without the `inference` feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_rejects_bad_vectors() {
        assert!(matches!(
            Embedding::new(Vec::new()),
            Err(InferenceError::InvalidEmbedding(_))
        ));
        assert!(matches!(
            Embedding::new(vec![1.0, f32::NAN]),
            Err(InferenceError::InvalidEmbedding(_))
        ));
    }

    #[test]
    fn test_embedding_normalize() {
        let emb = Embedding::new(vec![3.0, 4.0, 0.0]).unwrap().normalized();
        assert!((emb.data()[0] - 0.6).abs() < 1e-6);
        assert!((emb.data()[1] - 0.8).abs() < 1e-6);
        assert_eq!(emb.dim(), 3);
    }

    #[test]
    fn test_embedding_orthogonal() {
        let a = Embedding::new(vec![1.0, 0.0]).unwrap();
        let b = Embedding::new(vec![0.0, 1.0]).unwrap();
        assert!(a.cosine_similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn test_device_display() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(serde_json::to_string(&Device::Cuda).unwrap(), r#""cuda""#);
    }

    #[tokio::test]
    async fn test_unavailable_loader() {
        let err = UnavailableLoader.load().await.err().unwrap();
        assert!(matches!(err, InferenceError::ModelNotLoaded(_)));
        assert!(matches!(AppError::from(err), AppError::EngineUnavailable(_)));
    }
}
