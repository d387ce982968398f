//! Image upload and prediction endpoint.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
};
use tracing::{debug, error, info};

use crate::error::{AppError, Result};
use crate::mood::MoodEngine;
use crate::types::MoodPrediction;

use super::extractors::{AuthUser, ResponseFormat};
use super::routes::Negotiated;
use super::AppState;

const IMAGE_FIELD: &str = "image";

/// Predict the mood of an uploaded artwork
///
/// POST /predict (multipart, field `image`)
pub async fn predict(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    format: ResponseFormat,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Negotiated<MoodPrediction>> {
    let mut multipart =
        multipart.map_err(|e| AppError::UnprocessableEntity(format!("Expected multipart form: {e}")))?;

    let image_bytes = read_image_field(&mut multipart).await?;
    debug!(uid = %user.uid, bytes = image_bytes.len(), "Image received");

    let engine = state.engines.selected().await?;

    let result = tokio::task::spawn_blocking({
        let engine = engine.clone();
        move || analyze(engine.as_ref(), &image_bytes)
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Prediction task panicked");
        AppError::Internal(e.to_string())
    })??;

    info!(
        uid = %user.uid,
        engine = engine.name(),
        mood = %result.mood,
        confidence = result.confidence,
        "Mood predicted"
    );

    Ok(Negotiated::new(format, result))
}

/// Pull the `image` field out of the form, checking its declared type
async fn read_image_field(multipart: &mut Multipart) -> Result<Bytes> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|ct| ct.starts_with("image/"));
        if !is_image {
            return Err(AppError::BadRequest("File must be an image".to_string()));
        }

        return field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read image: {e}")));
    }

    Err(AppError::UnprocessableEntity(format!(
        "Missing form field `{IMAGE_FIELD}`"
    )))
}

/// Decode the upload and run the engine on it
fn analyze(engine: &dyn MoodEngine, bytes: &[u8]) -> Result<MoodPrediction> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| AppError::BadRequest(format!("Invalid image file: {e}")))?;

    let (prediction, details) = engine.predict_explained(&image);
    Ok(MoodPrediction::new(prediction, details))
}
