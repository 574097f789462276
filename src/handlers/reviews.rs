//! Review endpoints.

use axum::{Extension, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::AppError,
    extract::{Json, Path, Query},
    logging,
    middleware::auth::AuthContext,
    models::{
        pagination::{Paginated, Pagination},
        review::{CreateReviewRequest, ReviewListQuery, ReviewResponse},
    },
    policy,
    services::review_service,
};

/// `POST /api/v1/reviews` → 201. Tour reviews update the tour's rating.
pub async fn create_review(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), AppError> {
    let review = review_service::create(&pool, auth.user_id, &request).await?;
    logging::log_review_action(auth.user_id, review.id, "create");

    Ok((StatusCode::CREATED, Json(review.into())))
}

pub async fn list_reviews(
    State(pool): State<DbPool>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<Paginated<ReviewResponse>>, AppError> {
    let pagination = Pagination::new(query.page, query.per_page)?;

    let (reviews, total) = review_service::list(&pool, &query, pagination).await?;

    Ok(Json(Paginated::new(reviews, total, pagination).map(ReviewResponse::from)))
}

pub async fn get_review(
    State(pool): State<DbPool>,
    Path(id): Path<i64>,
) -> Result<Json<ReviewResponse>, AppError> {
    let review = review_service::get(&pool, id).await?;
    Ok(Json(review.into()))
}

/// `PATCH /api/v1/reviews/{id}/moderate` (admin).
pub async fn moderate_review(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ReviewResponse>, AppError> {
    policy::require_admin(&auth)?;

    let review = review_service::moderate(&pool, id).await?;
    logging::log_admin_action(auth.user_id, "moderate_review", &format!("review:{id}"), "");

    Ok(Json(review.into()))
}

/// `DELETE /api/v1/reviews/{id}` → 204 (author or admin).
pub async fn delete_review(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let review = review_service::get(&pool, id).await?;

    if !policy::can_delete_review(&auth, review.author_id) {
        return Err(AppError::Forbidden(
            "Not enough permissions to delete this review".to_string(),
        ));
    }

    review_service::delete(&pool, &review).await?;
    logging::log_review_action(auth.user_id, id, "delete");

    Ok(StatusCode::NO_CONTENT)
}
