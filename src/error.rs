use thiserror::Error;

/// The client's error type.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Input rejected before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network failure or a non-success response from the backend.
    #[error("Remote service unavailable: {0}")]
    RemoteUnavailable(String),

    /// No session at the time of the action.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The same action is still waiting on the backend.
    #[error("Action already in progress: {0}")]
    ActionInFlight(String),

    /// A local store error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] sonic_rs::Error),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal client error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `ClientError` as the error type.
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<garde::Report> for ClientError {
    fn from(report: garde::Report) -> Self {
        ClientError::Validation(report.to_string().trim().to_string())
    }
}

impl ClientError {
    /// Returns the text shown to the user for this error, logging it at the
    /// level its kind warrants.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(msg) => {
                tracing::debug!("Validation error: {}", msg);
                msg.clone()
            }

            ClientError::RemoteUnavailable(msg) => {
                tracing::error!("Remote error: {}", msg);
                msg.clone()
            }

            ClientError::NotAuthenticated => {
                tracing::warn!("Action attempted without a session");
                "Please log in to continue".to_string()
            }

            ClientError::ActionInFlight(action) => {
                tracing::debug!("Ignored duplicate trigger: {}", action);
                format!("Still working on {}...", action)
            }

            ClientError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                "Local storage error".to_string()
            }

            ClientError::Serialization(e) => {
                tracing::error!("Serialization error: {}", e);
                "Local storage is corrupted".to_string()
            }

            ClientError::Io(e) => {
                tracing::error!("IO error: {}", e);
                "File system error".to_string()
            }

            ClientError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal client error".to_string()
            }
        }
    }

    /// Whether the caller should send the user to the login view.
    pub fn requires_login(&self) -> bool {
        matches!(self, ClientError::NotAuthenticated)
    }
}
