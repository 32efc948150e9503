use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ScanApi;
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::models::debug::DebugReport;
use crate::models::scan::{HistoryResponse, ImageUpload, ScanRecord, UploadResult};
use crate::models::starred::{Ack, StarRequest, StarredMap, StarredResponse};
use crate::models::user::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

/// The `{error}` body the backend sends with failures.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// A `ScanApi` over HTTP.
#[derive(Clone)]
pub struct HttpScanApi {
    client: Client,
    base: Url,
}

impl HttpScanApi {
    /// Creates a client for the configured backend.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ClientError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base: config.api_url.clone(),
        })
    }

    /// Creates a client with default settings for `base_url`.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| ClientError::Validation(format!("Invalid API URL {}: {}", base_url, e)))?;

        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation(format!("API URL cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn json_body<T: Serialize>(request: RequestBuilder, body: &T) -> Result<RequestBuilder> {
        Ok(request
            .header(CONTENT_TYPE, "application/json")
            .body(sonic_rs::to_string(body)?))
    }

    /// Sends a request and returns the body of a successful response.
    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<Vec<u8>> {
        let response = request.send().await.map_err(|e| {
            tracing::error!("❌ {}: {}", fallback, e);
            ClientError::RemoteUnavailable(format!("{}: {}", fallback, e))
        })?;

        let status = response.status();
        tracing::debug!("↩️ {} {}", status, response.url());

        let body = response.bytes().await.map_err(|e| {
            tracing::error!("❌ {} (reading body): {}", fallback, e);
            ClientError::RemoteUnavailable(format!("{}: {}", fallback, e))
        })?;

        if !status.is_success() {
            let message = sonic_rs::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string());

            tracing::warn!("❌ {} ({}): {}", fallback, status, message);
            return Err(ClientError::RemoteUnavailable(message));
        }

        Ok(body.to_vec())
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, fallback: &str) -> Result<T> {
        let body = self.send(request, fallback).await?;
        sonic_rs::from_slice(&body).map_err(|e| {
            tracing::error!("❌ {}: malformed response: {}", fallback, e);
            ClientError::RemoteUnavailable(format!("{}: unexpected response from server", fallback))
        })
    }

    async fn acknowledge(&self, request: RequestBuilder, fallback: &str) -> Result<Ack> {
        let body = self.send(request, fallback).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Ack::default());
        }
        Ok(sonic_rs::from_slice(&body).unwrap_or_default())
    }
}

#[async_trait]
impl ScanApi for HttpScanApi {
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        let url = self.endpoint(&["register"])?;
        tracing::debug!("➡️ POST {}", url);
        let builder = Self::json_body(self.client.post(url), request)?;
        self.fetch(builder, "Registration failed").await
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let url = self.endpoint(&["login"])?;
        tracing::debug!("➡️ POST {}", url);
        let builder = Self::json_body(self.client.post(url), request)?;
        self.fetch(builder, "Login failed").await
    }

    async fn upload(&self, user_id: &str, image: ImageUpload) -> Result<UploadResult> {
        let url = self.endpoint(&["upload"])?;
        tracing::debug!("➡️ POST {} ({} bytes)", url, image.bytes.len());

        let part = Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(image.mime_type)
            .map_err(|e| ClientError::Validation(format!("Invalid image type: {}", e)))?;
        let form = Form::new()
            .part("image", part)
            .text("user_id", user_id.to_string());

        self.fetch(self.client.post(url).multipart(form), "Upload failed").await
    }

    async fn history(&self, user_id: &str) -> Result<Vec<ScanRecord>> {
        let url = self.endpoint(&["history", user_id])?;
        tracing::debug!("➡️ GET {}", url);
        let response: HistoryResponse = self
            .fetch(self.client.get(url), "Failed to fetch history")
            .await?;
        Ok(response.history)
    }

    async fn image(&self, image_id: &str) -> Result<ScanRecord> {
        let url = self.endpoint(&["image", image_id])?;
        tracing::debug!("➡️ GET {}", url);
        self.fetch(self.client.get(url), "Failed to fetch image").await
    }

    async fn starred(&self, user_id: &str) -> Result<StarredMap> {
        let url = self.endpoint(&["starred", user_id])?;
        tracing::debug!("➡️ GET {}", url);
        let response: StarredResponse = self
            .fetch(self.client.get(url), "Failed to fetch starred images")
            .await?;
        Ok(response.starred_images.unwrap_or_default())
    }

    async fn star(&self, request: &StarRequest<'_>) -> Result<Ack> {
        let url = self.endpoint(&["starred"])?;
        tracing::debug!("➡️ POST {} (image {})", url, request.image_id);
        let builder = Self::json_body(self.client.post(url), request)?;
        self.acknowledge(builder, "Failed to star image").await
    }

    async fn unstar(&self, user_id: &str, image_id: &str) -> Result<Ack> {
        let url = self.endpoint(&["starred", user_id, image_id])?;
        tracing::debug!("➡️ DELETE {}", url);
        self.acknowledge(self.client.delete(url), "Failed to remove starred image")
            .await
    }

    async fn debug(&self, user_id: &str) -> Result<DebugReport> {
        let url = self.endpoint(&["debug", user_id])?;
        tracing::debug!("➡️ GET {}", url);
        self.fetch(self.client.get(url), "Failed to get debug info").await
    }
}
