//! Deterministic encoder used by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use image::DynamicImage;

use super::{Device, Embedding, ImageTextEncoder, InferenceError};
use crate::mood::CATALOG;

/// Maps every phrase of mood `i` onto axis `i` (with a per-phrase scale) and
/// every image onto a fixed vector.
pub struct FakeEncoder {
    image_vector: Option<Vec<f32>>,
    text_calls: AtomicUsize,
    image_calls: AtomicUsize,
}

impl FakeEncoder {
    pub fn new(image_vector: Vec<f32>) -> Self {
        Self {
            image_vector: Some(image_vector),
            text_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
        }
    }

    /// Encoder whose image encoding always fails
    pub fn failing_images() -> Self {
        Self {
            image_vector: None,
            text_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
        }
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

impl ImageTextEncoder for FakeEncoder {
    fn encode_image(&self, _image: &DynamicImage) -> Result<Embedding, InferenceError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        match &self.image_vector {
            Some(v) => Embedding::new(v.clone()),
            None => Err(InferenceError::Onnx("vision session crashed".to_string())),
        }
    }

    fn encode_text(&self, text: &str) -> Result<Embedding, InferenceError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        for (axis, descriptor) in CATALOG.iter().enumerate() {
            if let Some(idx) = descriptor.phrases.iter().position(|p| *p == text) {
                let mut v = vec![0.0; CATALOG.len()];
                v[axis] = (idx + 1) as f32;
                return Embedding::new(v);
            }
        }
        Err(InferenceError::Tokenizer(format!("unexpected text: {text}")))
    }

    fn model_name(&self) -> &str {
        "fake/clip"
    }

    fn device(&self) -> Device {
        Device::Cpu
    }
}
