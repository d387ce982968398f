//! Model downloading from Hugging Face Hub.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use futures_util::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{InferenceError, KnownModel};

/// Paths to downloaded model files
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub vision_model: PathBuf,
    pub text_model: PathBuf,
    pub tokenizer: PathBuf,
}

/// Get the default cache directory for models
pub fn default_cache_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "art-mood", "art-mood") {
        proj_dirs.cache_dir().join("models")
    } else {
        PathBuf::from("./cache/models")
    }
}

fn model_dir(cache_dir: &Path, model_id: &str) -> PathBuf {
    cache_dir.join(model_id.replace('/', "__"))
}

/// Download a model from Hugging Face Hub if not already cached
pub async fn download_model(
    model_id: &str,
    cache_dir: Option<&Path>,
) -> Result<ModelPaths, InferenceError> {
    let layout = KnownModel::get_or_default(model_id);
    let cache_dir = cache_dir.map(PathBuf::from).unwrap_or_else(default_cache_dir);

    let model_cache = model_dir(&cache_dir, model_id);
    fs::create_dir_all(&model_cache).await?;

    info!(model_id, ?model_cache, "Checking model cache");

    let client = Client::builder()
        .user_agent(concat!("art-mood/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| InferenceError::DownloadFailed(e.to_string()))?;

    Ok(ModelPaths {
        vision_model: ensure_file(&client, model_id, &model_cache, layout.vision_model_file).await?,
        text_model: ensure_file(&client, model_id, &model_cache, layout.text_model_file).await?,
        tokenizer: ensure_file(&client, model_id, &model_cache, layout.tokenizer_file).await?,
    })
}

async fn ensure_file(
    client: &Client,
    model_id: &str,
    model_cache: &Path,
    filename: &str,
) -> Result<PathBuf, InferenceError> {
    let path = model_cache.join(filename);
    if path.exists() {
        debug!(?path, "Already cached");
    } else {
        download_file(client, model_id, filename, &path).await?;
    }
    Ok(path)
}

/// Download a single file, trying the `onnx/` subfolder first
async fn download_file(
    client: &Client,
    model_id: &str,
    filename: &str,
    dest: &Path,
) -> Result<(), InferenceError> {
    let candidates = [
        format!("https://huggingface.co/{model_id}/resolve/main/onnx/{filename}"),
        format!("https://huggingface.co/{model_id}/resolve/main/{filename}"),
    ];

    let mut last_status = None;
    for url in &candidates {
        info!(%url, ?dest, "Downloading model file");

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| InferenceError::DownloadFailed(format!("Request failed: {e}")))?;

        if response.status().is_success() {
            return download_response(response, dest).await;
        }
        debug!(%url, status = %response.status(), "Not found at this location");
        last_status = Some(response.status());
    }

    Err(InferenceError::DownloadFailed(format!(
        "HTTP {}: {filename} not found for {model_id}",
        last_status.map(|s| s.to_string()).unwrap_or_default()
    )))
}

async fn download_response(response: reqwest::Response, dest: &Path) -> Result<(), InferenceError> {
    // Create temp file for atomic write
    let temp_path = dest.with_extension("tmp");
    let mut file = fs::File::create(&temp_path).await?;

    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(InferenceError::DownloadFailed(format!("Download failed: {e}")));
            }
        };
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }

    file.flush().await?;
    drop(file);

    fs::rename(&temp_path, dest).await?;

    let hash = hex::encode(hasher.finalize());
    info!(?dest, bytes = downloaded, sha256 = %hash, "Download complete");

    Ok(())
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}
