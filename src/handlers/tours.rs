//! Tour endpoints.
//!
//! Listing and detail are public. Creating, editing and deleting a tour is
//! reserved for the owner of its company and admins.

use axum::{Extension, extract::State, http::StatusCode};
use serde::Deserialize;

use crate::{
    error::AppError,
    extract::{Json, Path, Query},
    logging,
    middleware::auth::AuthContext,
    models::{
        pagination::{Paginated, Pagination},
        tour::{CreateTourRequest, TourListQuery, TourResponse, UpdateTourRequest},
    },
    policy,
    services::{company_service, tour_service},
    state::AppState,
};

/// `POST /api/v1/tours` → 201.
///
/// # Request Body
///
/// See [`CreateTourRequest`]. `company_id` must name a company the caller owns
/// (admins may add tours to any company).
///
/// # Response
///
/// - **Success (201 Created)**: The created tour
/// - **Error (400)**: Price is not positive
/// - **Error (403)**: Caller does not manage the company
/// - **Error (404)**: Company does not exist
/// - **Error (422)**: Out-of-range capacity, coordinates or text lengths
pub async fn create_tour(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateTourRequest>,
) -> Result<(StatusCode, Json<TourResponse>), AppError> {
    request.validate(state.config.max_tour_capacity)?;

    let company = company_service::get(&state.pool, request.company_id).await?;
    if !policy::can_manage_company(&auth, company.owner_id) {
        return Err(AppError::Forbidden(
            "Not enough permissions to add tours to this company".to_string(),
        ));
    }

    let tour = tour_service::create(&state.pool, &request).await?;
    logging::log_user_action(
        auth.user_id,
        "tour_created",
        &format!("tour={} company={}", tour.id, company.id),
    );

    Ok((StatusCode::CREATED, Json(tour.into())))
}

/// Public catalogue: filter by location, price range, text, company; sort by
/// `price_asc`, `price_desc`, `rating` or `newest`.
pub async fn list_tours(
    State(state): State<AppState>,
    Query(query): Query<TourListQuery>,
) -> Result<Json<Paginated<TourResponse>>, AppError> {
    let pagination = Pagination::new(query.page, query.per_page)?;
    query.validate()?;

    let (tours, total) = tour_service::list(&state.pool, &query, pagination).await?;

    Ok(Json(Paginated::new(tours, total, pagination).map(TourResponse::from)))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Tours of the caller's company, newest first.
pub async fn my_tours(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<TourResponse>>, AppError> {
    let pagination = Pagination::new(query.page, query.per_page)?;

    let company = company_service::find_by_owner(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("You do not have a company".to_string()))?;

    let (tours, total) = tour_service::list_by_company(&state.pool, company.id, pagination).await?;

    Ok(Json(Paginated::new(tours, total, pagination).map(TourResponse::from)))
}

pub async fn get_tour(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TourResponse>, AppError> {
    let tour = tour_service::get(&state.pool, id).await?;
    Ok(Json(tour.into()))
}

pub async fn update_tour(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTourRequest>,
) -> Result<Json<TourResponse>, AppError> {
    let tour = tour_service::get(&state.pool, id).await?;
    let owner_id = tour_service::owner_of(&state.pool, &tour).await?;

    if !policy::can_manage_tour(&auth, owner_id) {
        return Err(AppError::Forbidden(
            "Not enough permissions to edit this tour".to_string(),
        ));
    }
    request.validate(state.config.max_tour_capacity)?;

    let tour = tour_service::update(&state.pool, id, &request).await?;
    logging::log_user_action(auth.user_id, "tour_updated", &format!("tour={id}"));

    Ok(Json(tour.into()))
}

/// `DELETE /api/v1/tours/{id}` → 204.
pub async fn delete_tour(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let tour = tour_service::get(&state.pool, id).await?;
    let owner_id = tour_service::owner_of(&state.pool, &tour).await?;

    if !policy::can_manage_tour(&auth, owner_id) {
        return Err(AppError::Forbidden(
            "Not enough permissions to delete this tour".to_string(),
        ));
    }

    tour_service::delete(&state.pool, id).await?;
    logging::log_user_action(auth.user_id, "tour_deleted", &format!("tour={id}"));

    Ok(StatusCode::NO_CONTENT)
}
