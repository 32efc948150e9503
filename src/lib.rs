//! Client for the BrainScan triage service: session handling, scan upload and
//! history, and a starred-image collection kept in sync with the backend.

pub mod api;
pub mod config;
pub mod error;
pub mod media;
pub mod routes;
pub mod state;
pub mod storage;

pub mod models {
    pub mod debug;
    pub mod scan;
    pub mod session;
    pub mod starred;
    pub mod timestamp;
    pub mod user;
}

pub mod services {
    pub mod editor;
    pub mod scans;
    pub mod session;
    pub mod starred;
}

pub mod validation {
    pub mod starred;
    pub mod upload;
}

pub use config::Config;
pub use error::{ClientError, Result};
pub use state::AppState;
