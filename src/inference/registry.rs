//! Known models registry.
//!
//! Curated list of CLIP exports that ship separate ONNX vision and text
//! encoders plus a `tokenizer.json`, the layout the loader expects.

use serde::Serialize;

/// Information about a known/tested model
#[derive(Debug, Clone, Serialize)]
pub struct KnownModel {
    /// Model ID (HuggingFace format: owner/model-name)
    pub model_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Output dimension shared by both encoders
    pub embedding_dim: usize,
    /// Square input side of the vision encoder
    pub image_size: u32,
    pub vision_model_file: &'static str,
    pub text_model_file: &'static str,
    pub tokenizer_file: &'static str,
}

/// Registry of known CLIP models
pub const KNOWN_MODELS: &[KnownModel] = &[
    KnownModel {
        model_id: "Xenova/clip-vit-base-patch32",
        name: "CLIP ViT-B/32",
        description: "OpenAI CLIP base model with 32px patches. Fast on CPU.",
        embedding_dim: 512,
        image_size: 224,
        vision_model_file: "vision_model.onnx",
        text_model_file: "text_model.onnx",
        tokenizer_file: "tokenizer.json",
    },
    KnownModel {
        model_id: "Xenova/clip-vit-base-patch16",
        name: "CLIP ViT-B/16",
        description: "OpenAI CLIP base model with 16px patches. Slower, finer detail.",
        embedding_dim: 512,
        image_size: 224,
        vision_model_file: "vision_model.onnx",
        text_model_file: "text_model.onnx",
        tokenizer_file: "tokenizer.json",
    },
    KnownModel {
        model_id: "Xenova/clip-vit-large-patch14",
        name: "CLIP ViT-L/14",
        description: "OpenAI CLIP large model. Best quality, needs a GPU to be practical.",
        embedding_dim: 768,
        image_size: 224,
        vision_model_file: "vision_model.onnx",
        text_model_file: "text_model.onnx",
        tokenizer_file: "tokenizer.json",
    },
];

impl KnownModel {
    /// Get a known model by ID
    pub fn get(model_id: &str) -> Option<&'static KnownModel> {
        KNOWN_MODELS.iter().find(|m| m.model_id == model_id)
    }

    pub fn is_known(model_id: &str) -> bool {
        Self::get(model_id).is_some()
    }

    /// Registry entry, or the default ViT-B/32 layout for unlisted models
    pub fn get_or_default(model_id: &str) -> &'static KnownModel {
        Self::get(model_id).unwrap_or(&KNOWN_MODELS[0])
    }
}
