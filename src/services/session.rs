use std::sync::Arc;

use garde::Validate;

use crate::{
    api::ScanApi,
    error::{ClientError, Result},
    models::session::{SESSION_KEY, Session},
    models::user::{LoginRequest, RegisterRequest, User},
    storage::{self, KeyValueStore},
};

/// Owns the "current user" persisted in the durable store.
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    api: Arc<dyn ScanApi>,
}

impl SessionManager {
    /// Creates a new `SessionManager`.
    ///
    /// # Arguments
    ///
    /// * `store` - The durable store the session lives in.
    /// * `api` - The backend used for login and registration.
    pub fn new(store: Arc<dyn KeyValueStore>, api: Arc<dyn ScanApi>) -> Self {
        Self { store, api }
    }

    /// Authenticates against the backend and persists the returned identity.
    ///
    /// # Arguments
    ///
    /// * `email` - The user's email address.
    /// * `password` - The user's password.
    ///
    /// # Returns
    ///
    /// A `Result` containing the new `Session`. On failure the store is left
    /// as it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        tracing::info!("🔐 Login attempt: {}", email);

        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        let response = self.api.login(&request).await?;
        let session = Session::new(response.user);
        self.persist(&session)?;

        tracing::info!("✅ User authenticated: {}", session.user_id());
        Ok(session)
    }

    /// Creates an account and starts a session for it.
    ///
    /// # Arguments
    ///
    /// * `name` - The user's display name.
    /// * `email` - The user's email address.
    /// * `password` - The user's password.
    ///
    /// # Returns
    ///
    /// A `Result` containing the new `Session`.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Session> {
        tracing::info!("📝 Register attempt: {}", email);

        let request = RegisterRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        let response = self.api.register(&request).await?;

        let user = match (response.user, response.user_id) {
            (Some(user), _) => user,
            (None, Some(id)) => User {
                id,
                name: request.name.clone(),
                email: request.email.clone(),
            },
            (None, None) => {
                return Err(ClientError::RemoteUnavailable(
                    "Registration failed: no user id in response".to_string(),
                ));
            }
        };

        let session = Session::new(user);
        self.persist(&session)?;

        tracing::info!("✅ User registered: {}", session.user_id());
        Ok(session)
    }

    /// Forgets the persisted identity. Calling it while logged out is fine.
    pub fn logout(&self) -> Result<()> {
        self.store.remove(SESSION_KEY)?;
        tracing::info!("👋 Session cleared");
        Ok(())
    }

    /// Reads the current session from the store.
    ///
    /// Never touches the network. An unreadable or corrupt value counts as
    /// no session.
    pub fn current_session(&self) -> Option<Session> {
        match storage::get_json::<Session>(self.store.as_ref(), SESSION_KEY) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("❌ Ignoring unreadable session: {}", e);
                None
            }
        }
    }

    /// The current session, or `NotAuthenticated`.
    pub fn require_session(&self) -> Result<Session> {
        self.current_session().ok_or(ClientError::NotAuthenticated)
    }

    fn persist(&self, session: &Session) -> Result<()> {
        storage::set_json(self.store.as_ref(), SESSION_KEY, session)
    }
}
