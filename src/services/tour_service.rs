//! Tour persistence and search.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        pagination::Pagination,
        tour::{CreateTourRequest, Tour, TourListQuery, UpdateTourRequest},
    },
    services::like_pattern,
};

fn not_found() -> AppError {
    AppError::NotFound("Tour not found".to_string())
}

pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Tour>, AppError> {
    let tour = sqlx::query_as::<_, Tour>("SELECT * FROM tours WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tour)
}

pub async fn get(pool: &DbPool, id: i64) -> Result<Tour, AppError> {
    find_by_id(pool, id).await?.ok_or_else(not_found)
}

/// Owner of the company running `tour`, if any.
pub async fn owner_of(pool: &DbPool, tour: &Tour) -> Result<Option<i64>, AppError> {
    let Some(company_id) = tour.company_id else {
        return Ok(None);
    };

    let owner = sqlx::query_scalar::<_, Option<i64>>("SELECT owner_id FROM companies WHERE id = $1")
        .bind(company_id)
        .fetch_optional(pool)
        .await?
        .flatten();

    Ok(owner)
}

pub async fn create(pool: &DbPool, request: &CreateTourRequest) -> Result<Tour, AppError> {
    let tour = sqlx::query_as::<_, Tour>(
        r#"
        INSERT INTO tours (
            title, image_url, description, schedule, price, location,
            duration, capacity, latitude, longitude, company_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(&request.title)
    .bind(request.image_url.as_deref())
    .bind(request.description.as_deref())
    .bind(request.schedule.as_ref())
    .bind(request.price)
    .bind(&request.location)
    .bind(&request.duration)
    .bind(request.capacity)
    .bind(request.latitude)
    .bind(request.longitude)
    .bind(request.company_id)
    .fetch_one(pool)
    .await?;

    Ok(tour)
}

const LIST_FILTER: &str = r#"
    WHERE ($1::TEXT IS NULL OR location ILIKE $1)
      AND ($2::FLOAT8 IS NULL OR price >= $2)
      AND ($3::FLOAT8 IS NULL OR price <= $3)
      AND ($4::TEXT IS NULL OR title ILIKE $4 OR description ILIKE $4)
      AND ($5::BIGINT IS NULL OR company_id = $5)
      AND ($6::BOOLEAN IS NULL OR is_active = $6)
"#;

/// Public catalogue search.
pub async fn list(
    pool: &DbPool,
    query: &TourListQuery,
    pagination: Pagination,
) -> Result<(Vec<Tour>, i64), AppError> {
    let location = like_pattern(query.location.as_deref());
    let search = like_pattern(query.search.as_deref());
    let order_by = query.sort_by.unwrap_or_default().order_by();

    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM tours {LIST_FILTER}"))
        .bind(location.as_deref())
        .bind(query.min_price)
        .bind(query.max_price)
        .bind(search.as_deref())
        .bind(query.company_id)
        .bind(query.is_active)
        .fetch_one(pool)
        .await?;

    // order_by comes from a fixed set of clauses, never from user input
    let tours = sqlx::query_as::<_, Tour>(&format!(
        "SELECT * FROM tours {LIST_FILTER} ORDER BY {order_by} LIMIT $7 OFFSET $8"
    ))
    .bind(location.as_deref())
    .bind(query.min_price)
    .bind(query.max_price)
    .bind(search.as_deref())
    .bind(query.company_id)
    .bind(query.is_active)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok((tours, total))
}

pub async fn list_by_company(
    pool: &DbPool,
    company_id: i64,
    pagination: Pagination,
) -> Result<(Vec<Tour>, i64), AppError> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tours WHERE company_id = $1")
        .bind(company_id)
        .fetch_one(pool)
        .await?;

    let tours = sqlx::query_as::<_, Tour>(
        "SELECT * FROM tours WHERE company_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3",
    )
    .bind(company_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok((tours, total))
}

pub async fn update(pool: &DbPool, id: i64, changes: &UpdateTourRequest) -> Result<Tour, AppError> {
    let tour = sqlx::query_as::<_, Tour>(
        r#"
        UPDATE tours
        SET title = COALESCE($2, title),
            image_url = COALESCE($3, image_url),
            description = COALESCE($4, description),
            schedule = COALESCE($5, schedule),
            price = COALESCE($6, price),
            location = COALESCE($7, location),
            duration = COALESCE($8, duration),
            capacity = COALESCE($9, capacity),
            is_active = COALESCE($10, is_active),
            latitude = COALESCE($11, latitude),
            longitude = COALESCE($12, longitude)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.title.as_deref())
    .bind(changes.image_url.as_deref())
    .bind(changes.description.as_deref())
    .bind(changes.schedule.as_ref())
    .bind(changes.price)
    .bind(changes.location.as_deref())
    .bind(changes.duration.as_deref())
    .bind(changes.capacity)
    .bind(changes.is_active)
    .bind(changes.latitude)
    .bind(changes.longitude)
    .fetch_optional(pool)
    .await?
    .ok_or_else(not_found)?;

    Ok(tour)
}

pub async fn delete(pool: &DbPool, id: i64) -> Result<(), AppError> {
    let deleted = sqlx::query("DELETE FROM tours WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(not_found());
    }
    Ok(())
}
