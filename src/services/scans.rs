use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use crate::{
    api::ScanApi,
    error::{ClientError, Result},
    media,
    models::debug::DebugReport,
    models::scan::{ImageUpload, ScanRecord, UploadResult},
    services::starred::StarredSync,
    validation::upload::validate_image,
};

/// Upload, history and single-scan lookups.
///
/// Every scan this service sees is handed to the [`StarredSync`] so a later
/// star can reuse its image bytes.
pub struct ScanService {
    api: Arc<dyn ScanApi>,
    starred: Arc<StarredSync>,
}

impl ScanService {
    pub fn new(api: Arc<dyn ScanApi>, starred: Arc<StarredSync>) -> Self {
        Self { api, starred }
    }

    /// Validates and uploads a scan image for inference.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The uploading user.
    /// * `path` - The image file.
    ///
    /// # Returns
    ///
    /// A `Result` containing the backend's inference result.
    pub async fn upload(&self, user_id: &str, path: &Path) -> Result<UploadResult> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ClientError::Validation(format!(
                    "Please select an image first ({} not found)",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mime_type = validate_image(path, &bytes)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("scan")
            .to_string();

        tracing::info!("📤 Uploading {} ({} bytes) for {}", file_name, bytes.len(), user_id);

        let encoded = media::encode(&bytes);
        let result = self
            .api
            .upload(
                user_id,
                ImageUpload {
                    file_name: file_name.clone(),
                    mime_type,
                    bytes,
                },
            )
            .await?;

        if let Some(image_id) = &result.image_id {
            let record = ScanRecord {
                image_id: image_id.clone(),
                filename: file_name,
                upload_time: Some(Utc::now()),
                is_appropriate: result.is_appropriate,
                image_data: Some(encoded),
                ml_results: result.ml_results.clone(),
                highlighted_image: None,
            };
            self.starred.remember_scans(user_id, [&record])?;
        }

        tracing::info!("✅ Upload processed: {}", result.ml_results.prediction);
        Ok(result)
    }

    /// Lists every scan the user uploaded.
    pub async fn history(&self, user_id: &str) -> Result<Vec<ScanRecord>> {
        let history = self.api.history(user_id).await?;
        self.starred.remember_scans(user_id, &history)?;
        tracing::info!("🗂️ Loaded {} scans for {}", history.len(), user_id);
        Ok(history)
    }

    /// Fetches one scan.
    pub async fn image(&self, user_id: &str, image_id: &str) -> Result<ScanRecord> {
        let record = self.api.image(image_id).await?;
        self.starred.remember_scans(user_id, [&record])?;
        Ok(record)
    }

    /// Fetches the backend's diagnostic dump for the user.
    pub async fn debug(&self, user_id: &str) -> Result<DebugReport> {
        self.api.debug(user_id).await.inspect_err(|e| {
            tracing::warn!("Debug API error (non-fatal): {}", e);
        })
    }
}
