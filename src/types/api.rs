//! API request and response types for mood operations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mood::{AnalysisDetail, Mood, Prediction};

/// Response from `POST /predict`
#[derive(Debug, Clone, Serialize)]
pub struct MoodPrediction {
    pub mood: Mood,
    pub confidence: f32,
    pub analysis_details: AnalysisDetail,
}

impl MoodPrediction {
    pub fn new(prediction: Prediction, analysis_details: AnalysisDetail) -> Self {
        Self {
            mood: prediction.mood,
            confidence: prediction.confidence,
            analysis_details,
        }
    }
}

/// Response from `GET /moods`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodsResponse {
    /// Categories in enumeration order
    pub moods: Vec<Mood>,
    /// One-line description per category
    pub descriptions: BTreeMap<String, String>,
}

/// One recorded prediction for a user.
///
/// Not persisted by this service; clients store it themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodHistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub mood: Mood,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_details: Option<serde_json::Value>,
}

impl MoodHistoryEntry {
    /// Entry for a prediction made now
    pub fn record(user_id: impl Into<String>, prediction: &MoodPrediction) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            mood: prediction.mood,
            confidence: prediction.confidence,
            timestamp: Utc::now(),
            image_url: None,
            analysis_details: serde_json::to_value(&prediction.analysis_details).ok(),
        }
    }
}
