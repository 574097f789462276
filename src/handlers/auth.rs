//! Authentication HTTP handlers.
//!
//! - POST /api/v1/auth/register - Create a client account
//! - POST /api/v1/auth/login - OAuth2 password form login
//! - POST /api/v1/auth/login/json - JSON login
//! - POST /api/v1/auth/refresh - Exchange a refresh token
//! - GET /api/v1/auth/me - Current user

use axum::{Extension, extract::State};

use crate::{
    error::AppError,
    extract::{Form, Json},
    logging,
    middleware::{ClientIp, auth::AuthContext},
    models::{
        auth::{LoginForm, LoginRequest, RefreshTokenRequest, TokenResponse},
        user::{RegisterRequest, UserResponse},
    },
    services::{auth_service, user_service},
    state::AppState,
};

/// Register a new client.
///
/// # Endpoint
///
/// `POST /api/v1/auth/register`
///
/// # Request Body
///
/// ```json
/// {
///   "email": "aigerim@example.com",
///   "full_name": "Aigerim Sultanova",
///   "phone": "+77011234567",
///   "password": "Str0ngPassword"
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: The created user
/// - **Error (400)**: Weak password or email/phone already registered
/// - **Error (422)**: Malformed email, name or phone
/// - **Error (429)**: Registration rate limit exceeded
pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = match auth_service::register(&state.pool, &request, state.config.min_password_length).await {
        Ok(user) => user,
        Err(err) => {
            logging::log_auth_attempt(&request.email, false, &ip, Some("registration rejected"));
            return Err(err);
        }
    };

    logging::log_user_action(user.id, "register", &format!("email={}", user.email));

    Ok(Json(user.into()))
}

async fn login(state: &AppState, email: &str, password: &str, ip: &str) -> Result<TokenResponse, AppError> {
    let user = match auth_service::authenticate(&state.pool, email, password).await {
        Ok(user) => user,
        Err(err) => {
            let reason = err.to_string();
            logging::log_auth_attempt(email, false, ip, Some(&reason));
            return Err(err);
        }
    };

    logging::log_auth_attempt(&user.email, true, ip, None);
    state.tokens.issue_pair(user.id)
}

/// OAuth2 password flow login (`application/x-www-form-urlencoded`).
///
/// The `username` field carries the email.
pub async fn login_form(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    login(&state, &form.username, &form.password, &ip).await.map(Json)
}

/// JSON login with `{"email", "password"}`.
pub async fn login_json(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    login(&state, &request.email, &request.password, &ip).await.map(Json)
}

/// Issue a fresh token pair. Only refresh tokens are accepted.
pub async fn refresh(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    match auth_service::refresh(&state.pool, &state.tokens, &request.refresh_token).await {
        Ok((user, pair)) => {
            logging::log_user_action(user.id, "token_refresh", &format!("ip={ip}"));
            Ok(Json(pair))
        }
        Err(err) => {
            logging::log_auth_attempt("unknown", false, &ip, Some("invalid refresh token"));
            Err(err)
        }
    }
}

/// The authenticated user.
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user_service::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}
