//! Login and token payloads.

use serde::{Deserialize, Serialize};

/// OAuth2 password-flow form body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// The user's e-mail; named `username` by the OAuth2 form convention.
    pub username: String,
    pub password: String,
}

/// JSON body for `POST /auth/login/json`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Token pair returned by every login and refresh endpoint.
///
/// ```json
/// {
///   "access_token": "eyJhbGciOi...",
///   "refresh_token": "eyJhbGciOi...",
///   "token_type": "bearer"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}

impl TokenResponse {
    pub fn bearer(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer",
        }
    }
}
