//! Registration, credential checks and token refresh.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        auth::TokenResponse,
        user::{RegisterRequest, Role, User},
    },
    security::{
        jwt::{TokenKeys, TokenKind},
        password,
    },
    services::user_service::{self, NewUser},
};

/// Create a client account.
///
/// # Errors
///
/// - `Validation`: malformed email, name or phone
/// - `BadRequest`: password does not meet the policy
/// - `Conflict`: email or phone already registered
pub async fn register(
    pool: &DbPool,
    request: &RegisterRequest,
    min_password_length: usize,
) -> Result<User, AppError> {
    request.validate()?;
    password::check_policy(&request.password, min_password_length)?;

    if user_service::email_taken(pool, &request.email, None).await? {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }
    if let Some(phone) = request.phone.as_deref() {
        if user_service::phone_taken(pool, phone, None).await? {
            return Err(AppError::Conflict("Phone number already registered".to_string()));
        }
    }

    let password_hash = password::hash_password_blocking(request.password.clone()).await?;

    user_service::create_user(
        pool,
        NewUser {
            email: &request.email,
            full_name: Some(&request.full_name),
            phone: request.phone.as_deref(),
            password_hash: &password_hash,
            role: Role::Client,
            is_active: true,
        },
    )
    .await
}

/// Check an email/password pair.
///
/// Unknown email and wrong password produce the same message.
pub async fn authenticate(pool: &DbPool, email: &str, password: &str) -> Result<User, AppError> {
    let invalid = || AppError::BadRequest("Incorrect email or password".to_string());

    let user = user_service::find_by_email(pool, email).await?.ok_or_else(invalid)?;

    let matches =
        password::verify_password_blocking(password.to_string(), user.password_hash.clone()).await?;
    if !matches {
        return Err(invalid());
    }

    if !user.is_active {
        return Err(AppError::BadRequest("Inactive user".to_string()));
    }

    Ok(user)
}

/// Exchange a refresh token for a new token pair.
pub async fn refresh(
    pool: &DbPool,
    tokens: &TokenKeys,
    refresh_token: &str,
) -> Result<(User, TokenResponse), AppError> {
    let user_id = tokens.verify(refresh_token, TokenKind::Refresh)?;

    let user = user_service::find_by_id(pool, user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    let pair = tokens.issue_pair(user.id)?;
    Ok((user, pair))
}
