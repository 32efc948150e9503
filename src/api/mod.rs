//! The backend the client talks to.
//!
//! [`ScanApi`] is the seam between the client's state logic and the
//! network; [`HttpScanApi`] is the real implementation.

mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpScanApi;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::debug::DebugReport;
use crate::models::scan::{ImageUpload, ScanRecord, UploadResult};
use crate::models::starred::{Ack, StarRequest, StarredMap};
use crate::models::user::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

/// Every endpoint of the triage service.
///
/// Implementations map network failures and non-success statuses to
/// [`ClientError::RemoteUnavailable`](crate::error::ClientError::RemoteUnavailable),
/// carrying the server's `error` message when it sent one.
#[async_trait]
pub trait ScanApi: Send + Sync {
    /// `POST /register`
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse>;

    /// `POST /login`
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse>;

    /// `POST /upload` (multipart)
    async fn upload(&self, user_id: &str, image: ImageUpload) -> Result<UploadResult>;

    /// `GET /history/{userId}`
    async fn history(&self, user_id: &str) -> Result<Vec<ScanRecord>>;

    /// `GET /image/{imageId}`
    async fn image(&self, image_id: &str) -> Result<ScanRecord>;

    /// `GET /starred/{userId}`; a missing collection is an empty map.
    async fn starred(&self, user_id: &str) -> Result<StarredMap>;

    /// `POST /starred`
    async fn star(&self, request: &StarRequest<'_>) -> Result<Ack>;

    /// `DELETE /starred/{userId}/{imageId}`
    async fn unstar(&self, user_id: &str, image_id: &str) -> Result<Ack>;

    /// `GET /debug/{userId}`
    async fn debug(&self, user_id: &str) -> Result<DebugReport>;
}
