use serde::{Deserialize, Serialize};

use crate::models::user::User;

/// The store key the session is persisted under.
pub const SESSION_KEY: &str = "user";

/// Represents the logged-in user on this client.
///
/// Serialized transparently as the user object, which is the shape the web
/// client has always written under the `user` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    /// The identity returned by the backend.
    pub user: User,
}

impl Session {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    /// The id used in every per-user endpoint.
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}
