//! User persistence and admin user management.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        pagination::Pagination,
        user::{Role, UpdateUserRequest, User, UserListQuery},
    },
    services::like_pattern,
};

/// Fields for a new `users` row. The password is already hashed.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub full_name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub password_hash: &'a str,
    pub role: Role,
    pub is_active: bool,
}

pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Is `email` taken by someone other than `except`?
pub async fn email_taken(pool: &DbPool, email: &str, except: Option<i64>) -> Result<bool, AppError> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
    )
    .bind(email)
    .bind(except)
    .fetch_one(pool)
    .await?;

    Ok(taken)
}

/// Is `phone` taken by someone other than `except`?
pub async fn phone_taken(pool: &DbPool, phone: &str, except: Option<i64>) -> Result<bool, AppError> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE phone = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
    )
    .bind(phone)
    .bind(except)
    .fetch_one(pool)
    .await?;

    Ok(taken)
}

pub async fn create_user(pool: &DbPool, new_user: NewUser<'_>) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, full_name, phone, password_hash, role, is_active)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(new_user.email)
    .bind(new_user.full_name)
    .bind(new_user.phone)
    .bind(new_user.password_hash)
    .bind(new_user.role.as_str())
    .bind(new_user.is_active)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

const LIST_FILTER: &str = r#"
    WHERE ($1::TEXT IS NULL OR role = $1)
      AND ($2::BOOLEAN IS NULL OR is_active = $2)
      AND ($3::TEXT IS NULL OR full_name ILIKE $3 OR email ILIKE $3)
"#;

/// Page through users, newest first.
pub async fn list(
    pool: &DbPool,
    query: &UserListQuery,
    pagination: Pagination,
) -> Result<(Vec<User>, i64), AppError> {
    let role = query.role.map(|r| r.as_str());
    let search = like_pattern(query.search.as_deref());

    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM users {LIST_FILTER}"))
        .bind(role)
        .bind(query.is_active)
        .bind(search.as_deref())
        .fetch_one(pool)
        .await?;

    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT * FROM users {LIST_FILTER} ORDER BY id DESC LIMIT $4 OFFSET $5"
    ))
    .bind(role)
    .bind(query.is_active)
    .bind(search.as_deref())
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok((users, total))
}

/// Apply an admin's partial update to a user.
///
/// # Errors
///
/// - `NotFound`: no such user
/// - `Forbidden`: the admin tried to change their own role
/// - `Conflict`: the new email or phone belongs to another user
pub async fn update(
    pool: &DbPool,
    actor_id: i64,
    user_id: i64,
    changes: &UpdateUserRequest,
) -> Result<User, AppError> {
    let user = find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.id == actor_id && changes.role.is_some_and(|role| role != user.role()) {
        return Err(AppError::Forbidden("Cannot change your own role".to_string()));
    }

    if let Some(email) = changes.email.as_deref() {
        if email != user.email && email_taken(pool, email, Some(user.id)).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
    }

    if let Some(phone) = changes.phone.as_deref() {
        if user.phone.as_deref() != Some(phone) && phone_taken(pool, phone, Some(user.id)).await? {
            return Err(AppError::Conflict("Phone number already registered".to_string()));
        }
    }

    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET full_name = COALESCE($2, full_name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            role = COALESCE($5, role),
            is_active = COALESCE($6, is_active)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(changes.full_name.as_deref())
    .bind(changes.email.as_deref())
    .bind(changes.phone.as_deref())
    .bind(changes.role.map(|r| r.as_str()))
    .bind(changes.is_active)
    .fetch_one(pool)
    .await?;

    Ok(updated)
}

/// Delete a user. Their bookings and reviews stay with a `NULL` owner.
pub async fn delete(pool: &DbPool, actor_id: i64, user_id: i64) -> Result<(), AppError> {
    if actor_id == user_id {
        return Err(AppError::Forbidden("Cannot delete yourself".to_string()));
    }

    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(())
}
