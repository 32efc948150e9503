use garde::Validate;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// The identity the backend hands out on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The backend's identifier for the user.
    pub id: String,
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: String,
}

/// The request payload for user registration.
#[derive(Serialize, Validate)]
pub struct RegisterRequest {
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// The request payload for user login.
#[derive(Serialize, Validate)]
pub struct LoginRequest {
    #[garde(length(min = 1))]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

impl Drop for RegisterRequest {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

impl Drop for LoginRequest {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The response to `POST /register`.
///
/// The backend answers with `{message, user_id}`; newer deployments may send
/// the full `user` object instead.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// The response to `POST /login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub user: User,
}
