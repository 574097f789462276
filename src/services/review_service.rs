//! Reviews and tour rating maintenance.
//!
//! A tour's `rating` column caches the average of its reviews. It is
//! recomputed inside the same transaction that adds or removes a review.

use sqlx::PgConnection;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        pagination::Pagination,
        review::{CreateReviewRequest, Review, ReviewListQuery, ReviewTarget},
    },
};

fn not_found() -> AppError {
    AppError::NotFound("Review not found".to_string())
}

/// Recompute a tour's average rating, rounded to two decimals (0 without reviews).
pub async fn refresh_tour_rating(conn: &mut PgConnection, tour_id: i64) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE tours
        SET rating = COALESCE(
            (SELECT ROUND(AVG(rating)::NUMERIC, 2)::FLOAT8 FROM reviews WHERE tour_id = $1),
            0
        )
        WHERE id = $1
        "#,
    )
    .bind(tour_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Leave a review on a tour or company.
///
/// # Errors
///
/// - `Validation`: rating out of range
/// - `BadRequest`: the author already reviewed the target
/// - `NotFound`: the target does not exist
pub async fn create(
    pool: &DbPool,
    author_id: i64,
    request: &CreateReviewRequest,
) -> Result<Review, AppError> {
    request.validate()?;

    let (table, column, missing, duplicate) = match request.target_type {
        ReviewTarget::Tour => (
            "tours",
            "tour_id",
            "Tour not found",
            "You have already reviewed this tour",
        ),
        ReviewTarget::Company => (
            "companies",
            "company_id",
            "Company not found",
            "You have already reviewed this company",
        ),
    };

    let mut tx = pool.begin().await?;

    let exists = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)"
    ))
    .bind(request.target_id)
    .fetch_one(&mut *tx)
    .await?;
    if !exists {
        return Err(AppError::NotFound(missing.to_string()));
    }

    let already_reviewed = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM reviews WHERE author_id = $1 AND {column} = $2)"
    ))
    .bind(author_id)
    .bind(request.target_id)
    .fetch_one(&mut *tx)
    .await?;
    if already_reviewed {
        return Err(AppError::BadRequest(duplicate.to_string()));
    }

    let (tour_id, company_id) = match request.target_type {
        ReviewTarget::Tour => (Some(request.target_id), None),
        ReviewTarget::Company => (None, Some(request.target_id)),
    };

    let review = sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (author_id, target_type, tour_id, company_id, rating, comment)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(author_id)
    .bind(request.target_type.as_str())
    .bind(tour_id)
    .bind(company_id)
    .bind(request.rating)
    .bind(request.comment.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    if let Some(tour_id) = tour_id {
        refresh_tour_rating(&mut *tx, tour_id).await?;
    }

    tx.commit().await?;

    Ok(review)
}

pub async fn list(
    pool: &DbPool,
    query: &ReviewListQuery,
    pagination: Pagination,
) -> Result<(Vec<Review>, i64), AppError> {
    let target_type = query.target_type.map(|t| t.as_str());
    // A bare target_id is ambiguous between tours and companies
    let target_id = query.target_type.and(query.target_id);

    const FILTER: &str = r#"
        WHERE ($1::TEXT IS NULL OR target_type = $1)
          AND ($2::BIGINT IS NULL OR tour_id = $2 OR company_id = $2)
          AND ($3::BOOLEAN IS NULL OR is_moderated = $3)
    "#;

    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM reviews {FILTER}"))
        .bind(target_type)
        .bind(target_id)
        .bind(query.is_moderated)
        .fetch_one(pool)
        .await?;

    let reviews = sqlx::query_as::<_, Review>(&format!(
        "SELECT * FROM reviews {FILTER} ORDER BY id DESC LIMIT $4 OFFSET $5"
    ))
    .bind(target_type)
    .bind(target_id)
    .bind(query.is_moderated)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok((reviews, total))
}

pub async fn get(pool: &DbPool, id: i64) -> Result<Review, AppError> {
    sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(not_found)
}

/// Mark a review as checked by an admin.
pub async fn moderate(pool: &DbPool, id: i64) -> Result<Review, AppError> {
    sqlx::query_as::<_, Review>("UPDATE reviews SET is_moderated = TRUE WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(not_found)
}

/// Remove a review and, for tour reviews, refresh the tour's rating.
pub async fn delete(pool: &DbPool, review: &Review) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(review.id)
        .execute(&mut *tx)
        .await?;

    if let Some(tour_id) = review.tour_id {
        refresh_tour_rating(&mut *tx, tour_id).await?;
    }

    tx.commit().await?;
    Ok(())
}
