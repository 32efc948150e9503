use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::media;
use crate::models::scan::{MlResults, ScanRecord};
use crate::models::timestamp;

/// Starred entries keyed by `image_id`.
pub type StarredMap = BTreeMap<String, StarredEntry>;

/// A user-annotated bookmark over a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarredEntry {
    pub image_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub filename: String,
    #[serde(default, with = "timestamp::optional", skip_serializing_if = "Option::is_none")]
    pub upload_time: Option<DateTime<Utc>>,
    /// Base64 image bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_results: Option<MlResults>,
    pub note: String,
    /// When the image was first starred.
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl StarredEntry {
    /// A fresh entry carrying whatever the scan record already holds.
    pub fn from_scan(scan: &ScanRecord, note: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            image_id: scan.image_id.clone(),
            user_id: None,
            filename: scan.filename.clone(),
            upload_time: scan.upload_time,
            image_data: scan.image_data.clone(),
            ml_results: Some(scan.ml_results.clone()),
            note,
            timestamp,
        }
    }

    /// A fresh entry for an image nothing is known about locally.
    pub fn bare(image_id: &str, note: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            image_id: image_id.to_string(),
            user_id: None,
            filename: String::new(),
            upload_time: None,
            image_data: None,
            ml_results: None,
            note,
            timestamp,
        }
    }

    pub fn data_uri(&self) -> Option<String> {
        self.image_data.as_deref().and_then(media::data_uri)
    }
}

/// The request payload for `POST /starred`.
#[derive(Debug, Serialize)]
pub struct StarRequest<'a> {
    pub user_id: &'a str,
    pub image_id: &'a str,
    pub note: &'a str,
}

/// The envelope of `GET /starred/{userId}`.
#[derive(Debug, Deserialize)]
pub struct StarredResponse {
    #[serde(default)]
    pub starred_images: Option<StarredMap>,
}

/// The acknowledgement the backend sends for mutations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub starred_id: Option<String>,
}
