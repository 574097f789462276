//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Checks permissions against the caller's `AuthContext`
//! 3. Delegates to a service
//! 4. Returns HTTP response (JSON, status code)

/// Company application endpoints
pub mod applications;
/// Registration, login and token endpoints
pub mod auth;
/// Booking endpoints
pub mod bookings;
/// Company endpoints
pub mod companies;
/// Liveness, database check and welcome message
pub mod health;
/// Review endpoints
pub mod reviews;
/// Tour endpoints
pub mod tours;
/// Admin user management endpoints
pub mod users;
