//! Role and ownership rules.
//!
//! Every function here is pure: handlers load the rows, these decide. Keeping
//! them free of I/O means the whole permission matrix is unit tested.

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{application::ApplicationStatus, booking::BookingStatus, user::Role},
};

fn forbidden() -> AppError {
    AppError::Forbidden("Not enough permissions".to_string())
}

pub fn require_admin(actor: &AuthContext) -> Result<(), AppError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(forbidden())
    }
}

/// Admins manage every company, owners manage their own.
pub fn can_manage_company(actor: &AuthContext, owner_id: Option<i64>) -> bool {
    actor.is_admin() || owner_id == Some(actor.user_id)
}

/// Tours are managed through their company.
pub fn can_manage_tour(actor: &AuthContext, company_owner_id: Option<i64>) -> bool {
    can_manage_company(actor, company_owner_id)
}

/// The booker, the owner of the tour's company and admins may see a booking.
pub fn can_view_booking(
    actor: &AuthContext,
    booking_user_id: Option<i64>,
    company_owner_id: Option<i64>,
) -> bool {
    actor.is_admin()
        || booking_user_id == Some(actor.user_id)
        || company_owner_id == Some(actor.user_id)
}

/// Whether the booking user's contact details may be disclosed.
pub fn can_see_booking_user(actor: &AuthContext, company_owner_id: Option<i64>) -> bool {
    can_manage_company(actor, company_owner_id)
}

/// Decide whether `actor` may move a booking from `current` to `requested`.
///
/// Cancelled bookings are final. Admins and the company owner may set any
/// status; the booker may only cancel.
pub fn booking_status_change(
    actor: &AuthContext,
    booking_user_id: Option<i64>,
    company_owner_id: Option<i64>,
    current: BookingStatus,
    requested: BookingStatus,
) -> Result<(), AppError> {
    if current == BookingStatus::Cancelled {
        return Err(AppError::BadRequest("Cannot modify cancelled booking".to_string()));
    }

    if can_manage_company(actor, company_owner_id) {
        return Ok(());
    }

    if booking_user_id == Some(actor.user_id) {
        return if requested == BookingStatus::Cancelled {
            Ok(())
        } else {
            Err(AppError::Forbidden("Clients can only cancel bookings".to_string()))
        };
    }

    Err(forbidden())
}

pub fn can_delete_review(actor: &AuthContext, author_id: Option<i64>) -> bool {
    actor.is_admin() || author_id == Some(actor.user_id)
}

pub fn can_view_application(actor: &AuthContext, applicant_id: i64) -> bool {
    actor.is_admin() || applicant_id == actor.user_id
}

/// Applicants may withdraw anything not yet approved; admins may delete any application.
pub fn can_delete_application(
    actor: &AuthContext,
    applicant_id: i64,
    status: ApplicationStatus,
) -> bool {
    actor.is_admin() || (applicant_id == actor.user_id && status != ApplicationStatus::Approved)
}

/// Only clients file company applications.
pub fn can_apply_for_company(actor: &AuthContext) -> bool {
    actor.role == Role::Client
}
