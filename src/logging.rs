//! Tracing setup and audit events.
//!
//! Audit events carry an `audit` field so they can be filtered out of the
//! regular request log by whatever collects stdout.

use tracing_subscriber::EnvFilter;

use crate::{config::Config, models::user::Role};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `LOG_LEVEL` from the configuration is
/// used. Production emits JSON lines, other environments human-readable text.
pub fn init(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_ascii_lowercase()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    // try_init: tests and the admin CLI may install a subscriber more than once
    if config.is_production() {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Login, registration and token refresh outcomes. Failures are logged at WARN.
pub fn log_auth_attempt(email: &str, success: bool, ip: &str, reason: Option<&str>) {
    if success {
        tracing::info!(audit = "auth", email, ip, success, "authentication succeeded");
    } else {
        tracing::warn!(
            audit = "auth",
            email,
            ip,
            success,
            reason = reason.unwrap_or("unknown"),
            "authentication failed"
        );
    }
}

pub fn log_user_action(user_id: i64, action: &str, details: &str) {
    tracing::info!(audit = "user", user_id, action, details, "user action");
}

/// Privileged operations: user management, application review, moderation.
pub fn log_admin_action(admin_id: i64, action: &str, subject: &str, details: &str) {
    tracing::warn!(audit = "admin", admin_id, action, subject, details, "admin action");
}

pub fn log_booking_action(user_id: i64, booking_id: i64, action: &str, details: &str) {
    tracing::info!(audit = "booking", user_id, booking_id, action, details, "booking action");
}

pub fn log_review_action(user_id: i64, review_id: i64, action: &str) {
    tracing::info!(audit = "review", user_id, review_id, action, "review action");
}

pub fn log_company_action(user_id: i64, role: Role, company_id: i64, action: &str) {
    tracing::info!(
        audit = "company",
        user_id,
        role = %role,
        company_id,
        action,
        "company action"
    );
}
