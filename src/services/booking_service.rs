//! Booking service - capacity-checked reservations.
//!
//! # Concurrency
//!
//! Creating a booking locks the tour row (`SELECT ... FOR UPDATE`) for the
//! duration of the transaction. Every concurrent booking for the same tour
//! queues behind that lock, so the capacity sum it reads cannot be changed
//! underneath it. PostgreSQL does not allow `FOR UPDATE` on an aggregate, so
//! the tour row is the serialisation point.

use chrono::{DateTime, Duration, Utc};

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        booking::{Booking, BookingStatus, CreateBookingRequest},
        company::Company,
        pagination::Pagination,
        tour::Tour,
        user::Role,
    },
    policy,
};

fn not_found() -> AppError {
    AppError::NotFound("Booking not found".to_string())
}

/// Reject departures closer than `min_hours` from `now`.
pub fn check_advance(date: DateTime<Utc>, now: DateTime<Utc>, min_hours: i64) -> Result<(), AppError> {
    if date < now + Duration::hours(min_hours) {
        return Err(AppError::BadRequest(format!(
            "Bookings must be made at least {min_hours} hours in advance"
        )));
    }
    Ok(())
}

/// Reject a request for more seats than remain.
pub fn check_capacity(capacity: i32, already_booked: i64, requested: i32) -> Result<(), AppError> {
    let available = (i64::from(capacity) - already_booked).max(0);
    if i64::from(requested) > available {
        return Err(AppError::BadRequest(format!(
            "Not enough capacity. Available: {available}, Requested: {requested}"
        )));
    }
    Ok(())
}

/// Reserve seats on a tour for `user_id`.
///
/// # Process
///
/// 1. Start database transaction
/// 2. Lock the tour row
/// 3. Check the tour is active, the date far enough ahead and the count positive
/// 4. Sum seats held by pending, confirmed and paid bookings for that date
/// 5. Refuse a second active booking by the same user
/// 6. Insert the booking as pending and commit
pub async fn create(
    pool: &DbPool,
    user_id: i64,
    request: &CreateBookingRequest,
    min_advance_hours: i64,
) -> Result<Booking, AppError> {
    let mut tx = pool.begin().await?;

    let tour = sqlx::query_as::<_, Tour>("SELECT * FROM tours WHERE id = $1 FOR UPDATE")
        .bind(request.tour_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Tour not found".to_string()))?;

    if !tour.is_active {
        return Err(AppError::BadRequest("Tour is not active".to_string()));
    }

    check_advance(request.date, Utc::now(), min_advance_hours)?;

    if request.participants_count < 1 {
        return Err(AppError::BadRequest(
            "Participants count must be at least 1".to_string(),
        ));
    }

    let booked = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COALESCE(SUM(participants_count), 0)::BIGINT
        FROM bookings
        WHERE tour_id = $1
          AND date = $2
          AND status IN ('pending', 'confirmed', 'paid')
        "#,
    )
    .bind(tour.id)
    .bind(request.date)
    .fetch_one(&mut *tx)
    .await?;

    check_capacity(tour.capacity, booked, request.participants_count)?;

    let duplicate = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM bookings
            WHERE user_id = $1 AND tour_id = $2 AND date = $3 AND status <> 'cancelled'
        )
        "#,
    )
    .bind(user_id)
    .bind(tour.id)
    .bind(request.date)
    .fetch_one(&mut *tx)
    .await?;

    if duplicate {
        return Err(AppError::BadRequest(
            "You already have a booking for this tour on this date".to_string(),
        ));
    }

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (tour_id, user_id, participants_count, date, status)
        VALUES ($1, $2, $3, $4, 'pending')
        RETURNING *
        "#,
    )
    .bind(tour.id)
    .bind(user_id)
    .bind(request.participants_count)
    .bind(request.date)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(booking)
}

/// Bookings visible to `actor`: clients see their own, company users the
/// bookings on their tours, admins everything.
pub async fn list(
    pool: &DbPool,
    actor: &AuthContext,
    status: Option<BookingStatus>,
    pagination: Pagination,
) -> Result<(Vec<Booking>, i64), AppError> {
    let (user_filter, owner_filter) = match actor.role {
        Role::Admin => (None, None),
        Role::Company => (None, Some(actor.user_id)),
        Role::Client => (Some(actor.user_id), None),
    };
    let status = status.map(|s| s.as_str());

    const FROM: &str = r#"
        FROM bookings b
        JOIN tours t ON t.id = b.tour_id
        LEFT JOIN companies c ON c.id = t.company_id
        WHERE ($1::BIGINT IS NULL OR b.user_id = $1)
          AND ($2::BIGINT IS NULL OR c.owner_id = $2)
          AND ($3::TEXT IS NULL OR b.status = $3)
    "#;

    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {FROM}"))
        .bind(user_filter)
        .bind(owner_filter)
        .bind(status)
        .fetch_one(pool)
        .await?;

    let bookings = sqlx::query_as::<_, Booking>(&format!(
        "SELECT b.* {FROM} ORDER BY b.id DESC LIMIT $4 OFFSET $5"
    ))
    .bind(user_filter)
    .bind(owner_filter)
    .bind(status)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok((bookings, total))
}

pub async fn get(pool: &DbPool, id: i64) -> Result<Booking, AppError> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(not_found)
}

/// Tour and company a booking belongs to.
pub async fn context(pool: &DbPool, booking: &Booking) -> Result<(Tour, Option<Company>), AppError> {
    let tour = sqlx::query_as::<_, Tour>("SELECT * FROM tours WHERE id = $1")
        .bind(booking.tour_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Tour not found".to_string()))?;

    let company = match tour.company_id {
        Some(company_id) => {
            sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
                .bind(company_id)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    Ok((tour, company))
}

/// Change a booking's status under the rules of [`policy::booking_status_change`].
///
/// The booking row is locked so two concurrent changes cannot both pass the
/// "cancelled is final" check.
pub async fn update_status(
    pool: &DbPool,
    actor: &AuthContext,
    id: i64,
    requested: BookingStatus,
) -> Result<Booking, AppError> {
    let mut tx = pool.begin().await?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(not_found)?;

    let owner_id = sqlx::query_scalar::<_, Option<i64>>(
        r#"
        SELECT c.owner_id
        FROM tours t
        LEFT JOIN companies c ON c.id = t.company_id
        WHERE t.id = $1
        "#,
    )
    .bind(booking.tour_id)
    .fetch_optional(&mut *tx)
    .await?
    .flatten();

    policy::booking_status_change(actor, booking.user_id, owner_id, booking.status(), requested)?;

    let updated = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(booking.id)
    .bind(requested.as_str())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(updated)
}

pub async fn delete(pool: &DbPool, id: i64) -> Result<(), AppError> {
    let deleted = sqlx::query("DELETE FROM bookings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(not_found());
    }
    Ok(())
}
