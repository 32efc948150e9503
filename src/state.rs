use std::sync::Arc;

use crate::api::{HttpScanApi, ScanApi};
use crate::config::Config;
use crate::error::Result;
use crate::models::session::Session;
use crate::routes::{self, Navigation};
use crate::services::scans::ScanService;
use crate::services::session::SessionManager;
use crate::services::starred::{Clock, StarredSync, SystemClock};
use crate::storage::{FileStore, KeyValueStore};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// The durable store the session lives in.
    pub store: Arc<dyn KeyValueStore>,
    /// The backend.
    pub api: Arc<dyn ScanApi>,
    /// Login, registration and the persisted session.
    pub session: Arc<SessionManager>,
    /// The starred-image synchronizer.
    pub starred: Arc<StarredSync>,
    /// Upload and history.
    pub scans: Arc<ScanService>,
}

impl AppState {
    /// Creates a new `AppState` backed by the file store and the HTTP backend.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub fn new(config: &Config) -> Result<Self> {
        let store = Arc::new(FileStore::open(&config.store_path)?);
        tracing::info!("✅ Store opened at {}", config.store_path.display());

        let api = Arc::new(HttpScanApi::new(config)?);
        tracing::info!("✅ HTTP client initialized for {}", config.api_url);

        Ok(Self::with_parts(config.clone(), store, api, Arc::new(SystemClock)))
    }

    /// Wires the services over explicit parts.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn ScanApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(store.clone(), api.clone()));
        let starred = Arc::new(StarredSync::with_clock(api.clone(), clock));
        let scans = Arc::new(ScanService::new(api.clone(), starred.clone()));

        Self {
            config,
            store,
            api,
            session,
            starred,
            scans,
        }
    }

    /// The current session, or `NotAuthenticated`.
    pub fn require_session(&self) -> Result<Session> {
        self.session.require_session()
    }

    /// Resolves a view path against the current session.
    pub fn navigate(&self, path: &str) -> Navigation {
        routes::navigate(&self.session, path)
    }

    /// Ends the session and forgets the cached collection.
    pub fn logout(&self) -> Result<()> {
        let cleared = self.session.logout();
        self.starred.clear();
        cleared
    }
}
