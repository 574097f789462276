//! Health check endpoints for service monitoring.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{config::Config, error::AppError, state::AppState};

/// Liveness response. Does not touch the database.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub environment: &'static str,
}

/// `GET /health`
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "Genbi Admin Panel",
///   "environment": "development"
/// }
/// ```
pub async fn health_check(State(config): State<Arc<Config>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: config.project_name.clone(),
        environment: config.environment.as_str(),
    })
}

/// Readiness response, including database connectivity.
#[derive(Debug, Serialize)]
pub struct DatabaseHealthResponse {
    pub status: &'static str,
    pub service: String,
    pub environment: &'static str,

    /// Database connection status
    pub database: &'static str,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// `GET /health/db`
///
/// # Response (500 Internal Server Error)
///
/// If database is unreachable, returns standard error response.
pub async fn database_health(
    State(state): State<AppState>,
) -> Result<Json<DatabaseHealthResponse>, AppError> {
    // Verify database connectivity with simple query
    sqlx::query("SELECT 1").execute(&state.pool).await?;

    Ok(Json(DatabaseHealthResponse {
        status: "healthy",
        service: state.config.project_name.clone(),
        environment: state.config.environment.as_str(),
        database: "connected",
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: &'static str,
    pub api: &'static str,
}

/// `GET /`
pub async fn root(State(config): State<Arc<Config>>) -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("Welcome to {}", config.project_name),
        version: env!("CARGO_PKG_VERSION"),
        api: crate::config::API_V1_STR,
    })
}
