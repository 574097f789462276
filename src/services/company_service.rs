//! Company persistence.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        company::{Company, CreateCompanyRequest, UpdateCompanyRequest},
        pagination::Pagination,
    },
    services::like_pattern,
};

fn not_found() -> AppError {
    AppError::NotFound("Company not found".to_string())
}

pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Company>, AppError> {
    let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(company)
}

/// Like [`find_by_id`] but a missing company is an error.
pub async fn get(pool: &DbPool, id: i64) -> Result<Company, AppError> {
    find_by_id(pool, id).await?.ok_or_else(not_found)
}

pub async fn find_by_owner(pool: &DbPool, owner_id: i64) -> Result<Option<Company>, AppError> {
    let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

    Ok(company)
}

async fn name_taken(pool: &DbPool, name: &str, except: Option<i64>) -> Result<bool, AppError> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM companies WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
    )
    .bind(name)
    .bind(except)
    .fetch_one(pool)
    .await?;

    Ok(taken)
}

/// Create a company owned by `owner_id`.
///
/// # Errors
///
/// - `Conflict`: the name is taken
/// - `BadRequest`: the owner already has a company
pub async fn create(
    pool: &DbPool,
    owner_id: i64,
    request: &CreateCompanyRequest,
) -> Result<Company, AppError> {
    if name_taken(pool, &request.name, None).await? {
        return Err(AppError::Conflict("Company with this name already exists".to_string()));
    }

    if let Some(existing) = find_by_owner(pool, owner_id).await? {
        return Err(AppError::BadRequest(format!(
            "You already own a company: {}",
            existing.name
        )));
    }

    let company = sqlx::query_as::<_, Company>(
        r#"
        INSERT INTO companies (name, address, work_hours, website, owner_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&request.name)
    .bind(request.address.as_deref())
    .bind(request.work_hours.as_deref())
    .bind(request.website.as_deref())
    .bind(owner_id)
    .fetch_one(pool)
    .await?;

    Ok(company)
}

pub async fn list(
    pool: &DbPool,
    search: Option<&str>,
    pagination: Pagination,
) -> Result<(Vec<Company>, i64), AppError> {
    let search = like_pattern(search);

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM companies WHERE ($1::TEXT IS NULL OR name ILIKE $1)",
    )
    .bind(search.as_deref())
    .fetch_one(pool)
    .await?;

    let companies = sqlx::query_as::<_, Company>(
        r#"
        SELECT * FROM companies
        WHERE ($1::TEXT IS NULL OR name ILIKE $1)
        ORDER BY id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(search.as_deref())
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok((companies, total))
}

pub async fn update(
    pool: &DbPool,
    company: &Company,
    changes: &UpdateCompanyRequest,
) -> Result<Company, AppError> {
    if let Some(name) = changes.name.as_deref() {
        if name != company.name && name_taken(pool, name, Some(company.id)).await? {
            return Err(AppError::Conflict("Company with this name already exists".to_string()));
        }
    }

    let updated = sqlx::query_as::<_, Company>(
        r#"
        UPDATE companies
        SET name = COALESCE($2, name),
            address = COALESCE($3, address),
            work_hours = COALESCE($4, work_hours),
            website = COALESCE($5, website)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(company.id)
    .bind(changes.name.as_deref())
    .bind(changes.address.as_deref())
    .bind(changes.work_hours.as_deref())
    .bind(changes.website.as_deref())
    .fetch_optional(pool)
    .await?
    .ok_or_else(not_found)?;

    Ok(updated)
}

/// Delete a company; its tours, their bookings and all related reviews cascade.
pub async fn delete(pool: &DbPool, id: i64) -> Result<(), AppError> {
    let deleted = sqlx::query("DELETE FROM companies WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(not_found());
    }
    Ok(())
}
