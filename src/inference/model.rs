//! CLIP model wrapper for ONNX Runtime inference.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::imageops::FilterType;
use image::DynamicImage;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use tokenizers::{
    PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationDirection,
    TruncationParams, TruncationStrategy,
};
use tracing::{debug, info};

use super::{
    download_model, Device, Embedding, EncoderLoader, ImageTextEncoder, InferenceError,
    KnownModel, ModelPaths,
};
use crate::config::ModelConfig;

/// CLIP context length
const MAX_TOKENS: usize = 77;
/// `<|endoftext|>` doubles as the padding token
const PAD_TOKEN_ID: u32 = 49407;

const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// CLIP model for generating image and text embeddings
pub struct ClipModel {
    vision_session: Mutex<Session>,
    text_session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_name: String,
    image_size: u32,
    device: Device,
}

impl std::fmt::Debug for ClipModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipModel")
            .field("model_name", &self.model_name)
            .field("device", &self.device)
            .field("image_size", &self.image_size)
            .finish()
    }
}

impl ClipModel {
    /// Load CLIP model from downloaded paths
    pub fn load(paths: &ModelPaths, model_name: &str, use_cuda: bool) -> Result<Self, InferenceError> {
        let device = if use_cuda && cfg!(feature = "cuda") {
            Device::Cuda
        } else {
            Device::Cpu
        };

        info!(model_name, %device, "Loading CLIP model");

        let vision_session = Self::create_session(&paths.vision_model, use_cuda)?;
        let text_session = Self::create_session(&paths.text_model, use_cuda)?;

        debug!(
            vision_inputs = ?vision_session.inputs.iter().map(|i| &i.name).collect::<Vec<_>>(),
            vision_outputs = ?vision_session.outputs.iter().map(|o| &o.name).collect::<Vec<_>>(),
            "Vision model loaded"
        );
        debug!(
            text_inputs = ?text_session.inputs.iter().map(|i| &i.name).collect::<Vec<_>>(),
            text_outputs = ?text_session.outputs.iter().map(|o| &o.name).collect::<Vec<_>>(),
            "Text model loaded"
        );

        let tokenizer = Self::load_tokenizer(&paths.tokenizer)?;

        Ok(Self {
            vision_session: Mutex::new(vision_session),
            text_session: Mutex::new(text_session),
            tokenizer,
            model_name: model_name.to_string(),
            image_size: KnownModel::get_or_default(model_name).image_size,
            device,
        })
    }

    fn create_session(model_path: &Path, use_cuda: bool) -> Result<Session, InferenceError> {
        let model_bytes = std::fs::read(model_path)
            .map_err(|e| InferenceError::Onnx(format!("Failed to read model file: {e}")))?;

        let mut builder = Session::builder().map_err(|e| InferenceError::Onnx(e.to_string()))?;

        builder = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::Onnx(e.to_string()))?;

        builder = builder
            .with_intra_threads(4)
            .map_err(|e| InferenceError::Onnx(e.to_string()))?;

        if use_cuda {
            #[cfg(feature = "cuda")]
            {
                use ort::execution_providers::CUDAExecutionProvider;
                builder = builder
                    .with_execution_providers([CUDAExecutionProvider::default().build()])
                    .map_err(|e| InferenceError::Onnx(e.to_string()))?;
            }
            #[cfg(not(feature = "cuda"))]
            {
                tracing::warn!("CUDA requested but not compiled with cuda feature, using CPU");
            }
        }

        builder
            .commit_from_memory(&model_bytes)
            .map_err(|e| InferenceError::Onnx(format!("Failed to load model: {e}")))
    }

    fn load_tokenizer(path: &Path) -> Result<Tokenizer, InferenceError> {
        let mut tokenizer = Tokenizer::from_file(path)
            .map_err(|e| InferenceError::Tokenizer(format!("Failed to load tokenizer: {e}")))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(MAX_TOKENS),
            direction: PaddingDirection::Right,
            pad_to_multiple_of: None,
            pad_id: PAD_TOKEN_ID,
            pad_type_id: 0,
            pad_token: "<|endoftext|>".to_string(),
        }));

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                strategy: TruncationStrategy::LongestFirst,
                stride: 0,
                direction: TruncationDirection::Right,
            }))
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))?;

        Ok(tokenizer)
    }

    /// Resize the shortest side to the model input, centre crop, and
    /// normalise with the CLIP channel statistics into NCHW order.
    fn preprocess_image(&self, image: &DynamicImage) -> Vec<f32> {
        let size = self.image_size;
        let (w, h) = (image.width().max(1), image.height().max(1));
        let scale = size as f32 / w.min(h) as f32;
        let new_w = ((w as f32 * scale).round() as u32).max(size);
        let new_h = ((h as f32 * scale).round() as u32).max(size);
        let resized = image.resize_exact(new_w, new_h, FilterType::CatmullRom).to_rgb8();

        let start_x = (new_w - size) / 2;
        let start_y = (new_h - size) / 2;
        let plane = (size * size) as usize;
        let mut data = vec![0.0f32; 3 * plane];

        for y in 0..size {
            for x in 0..size {
                let pixel = resized.get_pixel(start_x + x, start_y + y);
                let offset = (y * size + x) as usize;
                for c in 0..3 {
                    data[c * plane + offset] =
                        (f32::from(pixel[c]) / 255.0 - CLIP_MEAN[c]) / CLIP_STD[c];
                }
            }
        }

        data
    }

    fn run_vision_inference(&self, image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
        let size = self.image_size as usize;
        let pixel_values = Tensor::from_array((
            [1usize, 3, size, size],
            self.preprocess_image(image).into_boxed_slice(),
        ))
        .map_err(|e| InferenceError::Onnx(e.to_string()))?;

        let mut session = self
            .vision_session
            .lock()
            .map_err(|e| InferenceError::Onnx(format!("Session lock error: {e}")))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "pixel_values".to_string());
        let output_name = embeds_output(&session, "image_embeds");

        let outputs = session
            .run(ort::inputs![input_name => pixel_values])
            .map_err(|e| InferenceError::Onnx(e.to_string()))?;

        let output = outputs
            .get(output_name.as_str())
            .ok_or_else(|| InferenceError::Onnx(format!("Output '{output_name}' not found")))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Onnx(e.to_string()))?;

        debug!(?shape, data_len = data.len(), "Vision model output");

        Ok(data.to_vec())
    }

    fn run_text_inference(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| InferenceError::Tokenizer(format!("Text tokenization failed: {e}")))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| i64::from(m))
            .collect();
        let seq_len = input_ids.len();

        let input_ids = Tensor::from_array(([1usize, seq_len], input_ids.into_boxed_slice()))
            .map_err(|e| InferenceError::Onnx(e.to_string()))?;
        let attention_mask =
            Tensor::from_array(([1usize, seq_len], attention_mask.into_boxed_slice()))
                .map_err(|e| InferenceError::Onnx(e.to_string()))?;

        let mut session = self
            .text_session
            .lock()
            .map_err(|e| InferenceError::Onnx(format!("Session lock error: {e}")))?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let output_name = embeds_output(&session, "text_embeds");

        // Some exports take only input_ids
        let outputs = if input_names.len() >= 2 {
            session.run(ort::inputs![
                input_names[0].clone() => input_ids,
                input_names[1].clone() => attention_mask
            ])
        } else {
            let name = input_names
                .first()
                .cloned()
                .unwrap_or_else(|| "input_ids".to_string());
            session.run(ort::inputs![name => input_ids])
        }
        .map_err(|e| InferenceError::Onnx(e.to_string()))?;

        let output = outputs
            .get(output_name.as_str())
            .ok_or_else(|| InferenceError::Onnx(format!("Output '{output_name}' not found")))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Onnx(e.to_string()))?;

        debug!(?shape, data_len = data.len(), "Text model output");

        Ok(data.to_vec())
    }
}

/// Prefer the projected embedding output; fall back to the first output.
fn embeds_output(session: &Session, preferred: &str) -> String {
    session
        .outputs
        .iter()
        .find(|o| o.name == preferred)
        .or_else(|| session.outputs.first())
        .map(|o| o.name.clone())
        .unwrap_or_else(|| preferred.to_string())
}

impl ImageTextEncoder for ClipModel {
    fn encode_image(&self, image: &DynamicImage) -> Result<Embedding, InferenceError> {
        let mut embedding = Embedding::new(self.run_vision_inference(image)?)?;
        embedding.normalize();
        Ok(embedding)
    }

    fn encode_text(&self, text: &str) -> Result<Embedding, InferenceError> {
        let mut embedding = Embedding::new(self.run_text_inference(text)?)?;
        embedding.normalize();
        Ok(embedding)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn device(&self) -> Device {
        self.device
    }
}

/// Downloads (if needed) and loads a CLIP model on first use
#[derive(Debug, Clone)]
pub struct ClipLoader {
    model_name: String,
    cache_dir: Option<PathBuf>,
    use_cuda: bool,
}

impl ClipLoader {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            model_name: config.name.clone(),
            cache_dir: config.cache_dir.clone(),
            use_cuda: config.enable_cuda,
        }
    }
}

#[async_trait]
impl EncoderLoader for ClipLoader {
    async fn load(&self) -> Result<Arc<dyn ImageTextEncoder>, InferenceError> {
        let paths = download_model(&self.model_name, self.cache_dir.as_deref()).await?;

        let model_name = self.model_name.clone();
        let use_cuda = self.use_cuda;
        let model = tokio::task::spawn_blocking(move || ClipModel::load(&paths, &model_name, use_cuda))
            .await
            .map_err(|e| InferenceError::ModelNotLoaded(format!("Model loading task failed: {e}")))??;

        info!(model = %self.model_name, device = %model.device(), "CLIP model ready");
        Ok(Arc::new(model))
    }
}
