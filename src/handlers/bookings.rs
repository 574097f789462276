//! Booking endpoints.
//!
//! - POST /api/v1/bookings - Reserve seats (rate limited)
//! - GET /api/v1/bookings - Bookings visible to the caller
//! - GET /api/v1/bookings/{id} - Booking with tour and company
//! - PATCH /api/v1/bookings/{id}/status - Change status
//! - DELETE /api/v1/bookings/{id} - Remove (admin)

use axum::{Extension, extract::State};
use serde_json::{Value, json};

use crate::{
    error::AppError,
    extract::{Json, Path, Query},
    logging,
    middleware::auth::AuthContext,
    models::{
        booking::{
            BookingDetailResponse, BookingListQuery, BookingResponse, CreateBookingRequest,
            UpdateBookingStatusRequest,
        },
        pagination::{Paginated, Pagination},
    },
    policy,
    services::{booking_service, user_service},
    state::AppState,
};

/// Create a booking.
///
/// # Request Body
///
/// ```json
/// {
///   "tour_id": 12,
///   "participants_count": 2,
///   "date": "2026-05-01T09:00:00Z"
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: The pending booking
/// - **Error (400)**: Inactive tour, date too soon, not enough capacity, duplicate booking
/// - **Error (404)**: Tour not found
/// - **Error (429)**: Booking rate limit exceeded
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = booking_service::create(
        &state.pool,
        auth.user_id,
        &request,
        state.config.min_advance_booking_hours,
    )
    .await?;

    logging::log_booking_action(
        auth.user_id,
        booking.id,
        "create",
        &format!(
            "tour={} participants={} date={}",
            booking.tour_id, booking.participants_count, booking.date
        ),
    );

    Ok(Json(booking.into()))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Paginated<BookingResponse>>, AppError> {
    let pagination = Pagination::new(query.page, query.per_page)?;

    let (bookings, total) = booking_service::list(&state.pool, &auth, query.status, pagination).await?;

    Ok(Json(Paginated::new(bookings, total, pagination).map(BookingResponse::from)))
}

/// Booking detail. The booking user is only disclosed to admins and the company owner.
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<BookingDetailResponse>, AppError> {
    let booking = booking_service::get(&state.pool, id).await?;
    let (tour, company) = booking_service::context(&state.pool, &booking).await?;
    let owner_id = company.as_ref().and_then(|c| c.owner_id);

    if !policy::can_view_booking(&auth, booking.user_id, owner_id) {
        return Err(AppError::Forbidden("Not enough permissions".to_string()));
    }

    let user = match booking.user_id {
        Some(user_id) if policy::can_see_booking_user(&auth, owner_id) => {
            user_service::find_by_id(&state.pool, user_id).await?.map(Into::into)
        }
        _ => None,
    };

    Ok(Json(BookingDetailResponse {
        booking: booking.into(),
        tour: tour.into(),
        company: company.map(Into::into),
        user,
    }))
}

pub async fn update_booking_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = booking_service::update_status(&state.pool, &auth, id, request.status).await?;

    logging::log_booking_action(
        auth.user_id,
        booking.id,
        "status_change",
        &format!("status={}", request.status),
    );

    Ok(Json(booking.into()))
}

/// Admin only.
pub async fn delete_booking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if !auth.is_admin() {
        return Err(AppError::Forbidden("Only admins can delete bookings".to_string()));
    }

    booking_service::delete(&state.pool, id).await?;
    logging::log_admin_action(auth.user_id, "delete_booking", &format!("booking:{id}"), "");

    Ok(Json(json!({ "detail": "Booking deleted successfully" })))
}
