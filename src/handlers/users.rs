//! Admin user management.
//!
//! Every handler here requires the admin role.

use axum::{Extension, extract::State};
use serde_json::{Value, json};

use crate::{
    db::DbPool,
    error::AppError,
    extract::{Json, Path, Query},
    logging,
    middleware::auth::AuthContext,
    models::{
        pagination::{Paginated, Pagination},
        user::{UpdateUserRequest, UserListQuery, UserResponse},
    },
    policy,
    services::user_service,
};

/// `GET /api/v1/users` with optional `role`, `is_active` and `search` filters.
pub async fn list_users(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Paginated<UserResponse>>, AppError> {
    policy::require_admin(&auth)?;
    let pagination = Pagination::new(query.page, query.per_page)?;

    let (users, total) = user_service::list(&pool, &query, pagination).await?;

    Ok(Json(Paginated::new(users, total, pagination).map(UserResponse::from)))
}

pub async fn get_user(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AppError> {
    policy::require_admin(&auth)?;

    let user = user_service::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// `PATCH /api/v1/users/{id}`. Admins cannot change their own role.
pub async fn update_user(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    policy::require_admin(&auth)?;
    request.validate()?;

    let user = user_service::update(&pool, auth.user_id, id, &request).await?;

    logging::log_admin_action(
        auth.user_id,
        "update_user",
        &format!("user:{id}"),
        &format!("fields={}", request.changed_fields().join(",")),
    );

    Ok(Json(user.into()))
}

/// `DELETE /api/v1/users/{id}`. Admins cannot delete themselves.
pub async fn delete_user(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    policy::require_admin(&auth)?;

    user_service::delete(&pool, auth.user_id, id).await?;
    logging::log_admin_action(auth.user_id, "delete_user", &format!("user:{id}"), "");

    Ok(Json(json!({ "detail": "User deleted successfully" })))
}
