//! Booking data models and API request/response types.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{company::CompanyResponse, tour::TourResponse, user::UserResponse},
};

/// Lifecycle state of a booking.
///
/// Pending, confirmed and paid bookings consume tour capacity; cancelled ones
/// do not and can no longer be modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Paid,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Paid => "paid",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Whether a booking in this state holds seats on the tour.
    pub fn holds_capacity(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "paid" => Ok(BookingStatus::Paid),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(AppError::Validation(format!("unknown booking status: {other}"))),
        }
    }
}

/// Represents a booking record from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Booking {
    pub id: i64,
    pub tour_id: i64,

    /// `NULL` once the booking user has been deleted.
    pub user_id: Option<i64>,
    pub participants_count: i32,

    /// Date and time of the tour departure being booked.
    pub date: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn status(&self) -> BookingStatus {
        self.status.parse().unwrap_or(BookingStatus::Pending)
    }
}

fn default_participants() -> i32 {
    1
}

/// Request body for `POST /bookings`.
///
/// ```json
/// {
///   "tour_id": 12,
///   "participants_count": 2,
///   "date": "2026-05-01T09:00:00Z"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub tour_id: i64,
    #[serde(default = "default_participants")]
    pub participants_count: i32,
    pub date: DateTime<Utc>,
}

/// Request body for `PATCH /bookings/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

/// Query parameters for `GET /bookings`.
#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingResponse {
    pub id: i64,
    pub tour_id: i64,
    pub user_id: Option<i64>,
    pub participants_count: i32,
    pub date: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            status: booking.status(),
            id: booking.id,
            tour_id: booking.tour_id,
            user_id: booking.user_id,
            participants_count: booking.participants_count,
            date: booking.date,
            created_at: booking.created_at,
        }
    }
}

/// Booking together with the tour, its company and (for staff) the booking user.
#[derive(Debug, Serialize)]
pub struct BookingDetailResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    pub tour: TourResponse,
    pub company: Option<CompanyResponse>,

    /// Only disclosed to admins and the owner of the tour's company.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}
