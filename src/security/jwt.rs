//! HS256 bearer tokens.
//!
//! Two token kinds share the signing key: short-lived access tokens for API
//! calls and long-lived refresh tokens that can only be exchanged for a new
//! pair. The `type` claim keeps one from being used as the other.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError, models::auth::TokenResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a string per RFC 7519.
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

/// Signing material and lifetimes, built once at startup.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.secret_key,
            Duration::minutes(config.access_token_expire_minutes),
            Duration::minutes(config.refresh_token_expire_minutes),
        )
    }

    /// Sign a token of the given kind for `user_id`.
    pub fn issue(&self, user_id: i64, kind: TokenKind) -> Result<String, AppError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            kind,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    /// Access + refresh token pair.
    pub fn issue_pair(&self, user_id: i64) -> Result<TokenResponse, AppError> {
        Ok(TokenResponse::bearer(
            self.issue(user_id, TokenKind::Access)?,
            self.issue(user_id, TokenKind::Refresh)?,
        ))
    }

    /// Verify signature, expiry and kind; return the user id.
    ///
    /// Every failure collapses into the same `Unauthorized` so callers cannot
    /// distinguish a forged token from an expired one.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<i64, AppError> {
        let unauthorized = || {
            AppError::Unauthorized(match expected {
                TokenKind::Access => "Could not validate credentials".to_string(),
                TokenKind::Refresh => "Invalid refresh token".to_string(),
            })
        };

        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                unauthorized()
            })?;

        if data.claims.kind != expected {
            return Err(unauthorized());
        }

        data.claims.sub.parse().map_err(|_| unauthorized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::new("test-secret", Duration::minutes(15), Duration::days(30))
    }

    #[test]
    fn access_token_round_trip() {
        let keys = keys();
        let token = keys.issue(42, TokenKind::Access).unwrap();
        assert_eq!(keys.verify(&token, TokenKind::Access).unwrap(), 42);
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let keys = keys();
        let pair = keys.issue_pair(5).unwrap();

        assert_eq!(pair.token_type, "bearer");
        assert!(keys.verify(&pair.refresh_token, TokenKind::Access).is_err());
        assert!(keys.verify(&pair.access_token, TokenKind::Refresh).is_err());
        assert_eq!(keys.verify(&pair.refresh_token, TokenKind::Refresh).unwrap(), 5);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = TokenKeys::new("another-secret", Duration::minutes(15), Duration::days(1));
        let token = other.issue(1, TokenKind::Access).unwrap();

        assert!(matches!(
            keys().verify(&token, TokenKind::Access),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        // Past the library's default 60s leeway
        let keys = TokenKeys::new("test-secret", Duration::minutes(-5), Duration::days(1));
        let token = keys.issue(1, TokenKind::Access).unwrap();
        assert!(keys.verify(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn garbage_is_rejected_with_refresh_message() {
        let Err(AppError::Unauthorized(message)) = keys().verify("invalid.token.here", TokenKind::Refresh)
        else {
            panic!("garbage token accepted");
        };
        assert_eq!(message, "Invalid refresh token");
    }
}
