//! Bearer token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the access token from the Authorization header
//! 2. Verify its signature, expiry and kind
//! 3. Load the user and make sure the account is still active
//! 4. Inject authentication context into the request
//! 5. Reject unauthorized requests with HTTP 401

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::user::Role,
    security::jwt::TokenKind,
    services::user_service,
    state::AppState,
};

/// Authentication context attached to authenticated requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers (`Extension<AuthContext>`) to know who made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,

    /// Used in audit log lines.
    pub email: String,

    /// Role at the time of the request, read from the database rather than the token
    /// so that promotions and demotions take effect immediately.
    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Pull the token out of `Authorization: Bearer <token>`. The scheme is case-insensitive.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Token authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Verify the token as an access token
/// 3. Load the user referenced by the `sub` claim
/// 4. If found and active: inject `AuthContext` into request, call next handler
/// 5. Otherwise: 401 Unauthorized (403 for deactivated accounts)
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Step 1: Extract Authorization header
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

    // Step 2: Verify the token
    let user_id = state.tokens.verify(token, TokenKind::Access)?;

    // Step 3: Load the user
    let user = user_service::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Could not validate credentials".to_string()))?;

    if !user.is_active {
        return Err(AppError::Forbidden("Inactive user".to_string()));
    }

    // Step 4: Inject context into request extensions
    let role = user.role();
    request.extensions_mut().insert(AuthContext {
        user_id: user.id,
        email: user.email,
        role,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_scheme_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
