use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::media;
use crate::models::timestamp;

/// The model's verdict for a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Prediction {
    Positive,
    Negative,
    /// A label this client does not know about yet.
    Other(String),
}

impl From<String> for Prediction {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Positive" => Prediction::Positive,
            "Negative" => Prediction::Negative,
            _ => Prediction::Other(label),
        }
    }
}

impl From<Prediction> for String {
    fn from(prediction: Prediction) -> Self {
        match prediction {
            Prediction::Positive => "Positive".to_string(),
            Prediction::Negative => "Negative".to_string(),
            Prediction::Other(label) => label,
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Positive => f.write_str("Tumor Detected"),
            Prediction::Negative => f.write_str("No Tumor Detected"),
            Prediction::Other(label) => f.write_str(label),
        }
    }
}

/// The inference bundle attached to every scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlResults {
    pub prediction: Prediction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_detected: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub precautions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub treatment_options: Vec<String>,
    /// Base64 heatmap overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted_image: Option<String>,
}

impl MlResults {
    pub fn is_positive(&self) -> bool {
        self.prediction == Prediction::Positive
    }
}

/// A previously uploaded image plus its inference result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub image_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default, with = "timestamp::optional", skip_serializing_if = "Option::is_none")]
    pub upload_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_appropriate: Option<bool>,
    /// Base64 image bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    pub ml_results: MlResults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted_image: Option<String>,
}

impl ScanRecord {
    /// Decodes the scan's image bytes, if the record carries them.
    pub fn image_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.image_data.as_deref().map(media::decode).transpose()
    }

    /// The scan as an inline `data:` URI.
    pub fn data_uri(&self) -> Option<String> {
        self.image_data.as_deref().and_then(media::data_uri)
    }

    /// The heatmap overlay, wherever the backend put it.
    pub fn heatmap(&self) -> Option<&str> {
        self.ml_results
            .highlighted_image
            .as_deref()
            .or(self.highlighted_image.as_deref())
    }
}

/// The response to `POST /upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResult {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(default)]
    pub is_appropriate: Option<bool>,
    pub ml_results: MlResults,
}

/// An image file ready to be sent as the multipart `image` part.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// The envelope of `GET /history/{userId}`.
#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<ScanRecord>,
}
