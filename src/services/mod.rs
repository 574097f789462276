//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They own the SQL, run multi-step changes inside database transactions and
//! return domain errors that handlers pass straight through.

pub mod application_service;
pub mod auth_service;
pub mod booking_service;
pub mod company_service;
pub mod review_service;
pub mod tour_service;
pub mod user_service;

/// Build an `ILIKE` pattern matching `term` anywhere, with wildcards in the
/// term itself escaped. Blank terms mean "no filter".
pub(crate) fn like_pattern(term: Option<&str>) -> Option<String> {
    let term = term.map(str::trim).filter(|t| !t.is_empty())?;

    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}
