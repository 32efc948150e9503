//! An in-memory backend for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use super::ScanApi;
use crate::error::{ClientError, Result};
use crate::models::debug::DebugReport;
use crate::models::scan::{ImageUpload, MlResults, Prediction, ScanRecord, UploadResult};
use crate::models::starred::{Ack, StarRequest, StarredEntry, StarredMap};
use crate::models::user::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, User};

#[derive(Default)]
pub(crate) struct MockApi {
    pub users: Mutex<HashMap<String, (String, User)>>,
    pub scans: Mutex<Vec<ScanRecord>>,
    pub starred: Mutex<StarredMap>,
    pub fail_list: AtomicBool,
    pub fail_star: AtomicBool,
    pub fail_unstar: AtomicBool,
    pub fail_upload: AtomicBool,
    pub login_calls: AtomicUsize,
    pub star_calls: AtomicUsize,
    pub unstar_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub uploads: Mutex<Vec<(String, String, usize)>>,
    /// When set, `star` and `unstar` wait for a notification before answering.
    pub gate: Option<Arc<Notify>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn with_user(self, id: &str, email: &str, password: &str) -> Self {
        let user = User {
            id: id.to_string(),
            name: "Test User".to_string(),
            email: email.to_string(),
        };
        self.users
            .lock()
            .unwrap()
            .insert(email.to_string(), (password.to_string(), user));
        self
    }

    pub fn with_scan(self, image_id: &str, image_data: &str) -> Self {
        self.scans.lock().unwrap().push(scan(image_id, image_data));
        self
    }

    pub fn with_remote_star(self, entry: StarredEntry) -> Self {
        self.starred
            .lock()
            .unwrap()
            .insert(entry.image_id.clone(), entry);
        self
    }

    pub fn remote_note(&self, image_id: &str) -> Option<String> {
        self.starred
            .lock()
            .unwrap()
            .get(image_id)
            .map(|entry| entry.note.clone())
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

pub(crate) fn scan(image_id: &str, image_data: &str) -> ScanRecord {
    ScanRecord {
        image_id: image_id.to_string(),
        filename: format!("{}.jpg", image_id),
        upload_time: Some(Utc::now()),
        is_appropriate: Some(true),
        image_data: Some(image_data.to_string()),
        ml_results: MlResults {
            prediction: Prediction::Negative,
            confidence: Some(0.9),
            tumor_type: None,
            tumor_detected: Some(false),
            precautions: Vec::new(),
            treatment_options: Vec::new(),
            highlighted_image: None,
        },
        highlighted_image: None,
    }
}

fn unavailable(message: &str) -> ClientError {
    ClientError::RemoteUnavailable(message.to_string())
}

#[async_trait]
impl ScanApi for MockApi {
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&request.email) {
            return Err(unavailable("User already exists"));
        }

        let id = format!("user-{}", users.len() + 1);
        let user = User {
            id: id.clone(),
            name: request.name.clone(),
            email: request.email.clone(),
        };
        users.insert(request.email.clone(), (request.password.clone(), user));

        Ok(RegisterResponse {
            message: Some("User registered successfully".to_string()),
            user_id: Some(id),
            user: None,
        })
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let users = self.users.lock().unwrap();
        match users.get(&request.email) {
            Some((password, user)) if *password == request.password => Ok(LoginResponse {
                message: Some("Login successful".to_string()),
                user: user.clone(),
            }),
            _ => Err(unavailable("Invalid credentials")),
        }
    }

    async fn upload(&self, user_id: &str, image: ImageUpload) -> Result<UploadResult> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(unavailable("Please upload an appropriate brain MRI or CT scan image for tumor detection"));
        }

        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((user_id.to_string(), image.file_name.clone(), image.bytes.len()));
        let image_id = format!("img-{}", uploads.len());

        Ok(UploadResult {
            message: Some("Image processed successfully".to_string()),
            image_id: Some(image_id),
            is_appropriate: Some(true),
            ml_results: scan("x", "").ml_results,
        })
    }

    async fn history(&self, _user_id: &str) -> Result<Vec<ScanRecord>> {
        Ok(self.scans.lock().unwrap().clone())
    }

    async fn image(&self, image_id: &str) -> Result<ScanRecord> {
        self.scans
            .lock()
            .unwrap()
            .iter()
            .find(|scan| scan.image_id == image_id)
            .cloned()
            .ok_or_else(|| unavailable("Image not found"))
    }

    async fn starred(&self, _user_id: &str) -> Result<StarredMap> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(unavailable("Failed to fetch starred images"));
        }
        Ok(self.starred.lock().unwrap().clone())
    }

    async fn star(&self, request: &StarRequest<'_>) -> Result<Ack> {
        self.star_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;

        if self.fail_star.load(Ordering::SeqCst) {
            return Err(unavailable("Failed to star image"));
        }

        let mut starred = self.starred.lock().unwrap();
        starred
            .entry(request.image_id.to_string())
            .and_modify(|entry| entry.note = request.note.to_string())
            .or_insert_with(|| StarredEntry::bare(request.image_id, request.note.to_string(), Utc::now()));

        Ok(Ack::default())
    }

    async fn unstar(&self, _user_id: &str, image_id: &str) -> Result<Ack> {
        self.unstar_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;

        if self.fail_unstar.load(Ordering::SeqCst) {
            return Err(unavailable("Failed to remove starred image"));
        }

        self.starred.lock().unwrap().remove(image_id);
        Ok(Ack::default())
    }

    async fn debug(&self, user_id: &str) -> Result<DebugReport> {
        let json = format!(r#"{{"database_status": "connected", "user": "{}"}}"#, user_id);
        Ok(DebugReport(sonic_rs::from_str(&json)?))
    }
}
