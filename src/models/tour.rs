//! Tour data models and API request/response types.
//!
//! This module defines:
//! - `Tour`: Database entity representing a tour offered by a company
//! - Request types for creating, updating and listing tours
//! - `TourResponse`: Response body returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::check_length};

/// Represents a tour record from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Tour {
    pub id: i64,
    pub title: String,
    pub image_url: Option<String>,
    pub description: Option<String>,

    /// Free-form itinerary, stored as JSONB.
    pub schedule: Option<serde_json::Value>,

    /// Price per participant. Always positive (CHECK constraint).
    pub price: f64,
    pub location: Option<String>,
    pub duration: Option<String>,

    /// Average review rating rounded to two decimals, 0 without reviews.
    pub rating: f64,

    /// Maximum participants per date across all active bookings.
    pub capacity: i32,

    /// Inactive tours stay visible but cannot be booked.
    pub is_active: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub company_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

fn default_capacity() -> i32 {
    50
}

/// Request body for `POST /tours`.
///
/// # JSON Example
///
/// ```json
/// {
///   "title": "Charyn Canyon day trip",
///   "price": 15000,
///   "location": "Almaty region",
///   "duration": "12 hours",
///   "capacity": 20,
///   "company_id": 3
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateTourRequest {
    pub title: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub schedule: Option<serde_json::Value>,
    pub price: f64,
    pub location: String,
    pub duration: String,
    #[serde(default = "default_capacity")]
    pub capacity: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub company_id: i64,
}

impl CreateTourRequest {
    pub fn validate(&self, max_capacity: i32) -> Result<(), AppError> {
        check_length("title", &self.title, 3, 200)?;
        check_length("location", &self.location, 2, 200)?;
        check_length("duration", &self.duration, 2, 100)?;
        check_price(self.price)?;
        check_capacity(self.capacity, max_capacity)?;
        check_coordinates(self.latitude, self.longitude)
    }
}

/// Request body for `PATCH /tours/{id}`. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTourRequest {
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub schedule: Option<serde_json::Value>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub capacity: Option<i32>,
    pub is_active: Option<bool>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl UpdateTourRequest {
    pub fn validate(&self, max_capacity: i32) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            check_length("title", title, 3, 200)?;
        }
        if let Some(location) = &self.location {
            check_length("location", location, 2, 200)?;
        }
        if let Some(duration) = &self.duration {
            check_length("duration", duration, 2, 100)?;
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        if let Some(capacity) = self.capacity {
            check_capacity(capacity, max_capacity)?;
        }
        check_coordinates(self.latitude, self.longitude)
    }
}

fn check_price(price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::BadRequest("Price must be greater than zero".to_string()));
    }
    Ok(())
}

fn check_capacity(capacity: i32, max: i32) -> Result<(), AppError> {
    if capacity < 1 || capacity > max {
        return Err(AppError::Validation(format!(
            "capacity must be between 1 and {max}"
        )));
    }
    Ok(())
}

fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), AppError> {
    if latitude.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
        return Err(AppError::Validation("latitude must be between -90 and 90".into()));
    }
    if longitude.is_some_and(|lon| !(-180.0..=180.0).contains(&lon)) {
        return Err(AppError::Validation("longitude must be between -180 and 180".into()));
    }
    Ok(())
}

/// Sort orders accepted by `GET /tours`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TourSort {
    PriceAsc,
    PriceDesc,
    Rating,
    #[default]
    Newest,
}

impl TourSort {
    /// SQL `ORDER BY` clause. Ties fall back to newest first so paging is stable.
    pub fn order_by(&self) -> &'static str {
        match self {
            TourSort::PriceAsc => "price ASC, id DESC",
            TourSort::PriceDesc => "price DESC, id DESC",
            TourSort::Rating => "rating DESC, id DESC",
            TourSort::Newest => "id DESC",
        }
    }
}

/// Query parameters for `GET /tours`.
#[derive(Debug, Default, Deserialize)]
pub struct TourListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub location: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    pub sort_by: Option<TourSort>,
    pub company_id: Option<i64>,
    pub is_active: Option<bool>,
}

impl TourListQuery {
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, value) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if value.is_some_and(|v| v < 0.0) {
                return Err(AppError::Validation(format!("{name} must not be negative")));
            }
        }
        Ok(())
    }
}

/// Response body for tour endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct TourResponse {
    pub id: i64,
    pub title: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub schedule: Option<serde_json::Value>,
    pub price: f64,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub capacity: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub company_id: Option<i64>,
    pub rating: f64,
    pub is_active: bool,
}

impl From<Tour> for TourResponse {
    fn from(tour: Tour) -> Self {
        Self {
            id: tour.id,
            title: tour.title,
            image_url: tour.image_url,
            description: tour.description,
            schedule: tour.schedule,
            price: tour.price,
            location: tour.location,
            duration: tour.duration,
            capacity: tour.capacity,
            latitude: tour.latitude,
            longitude: tour.longitude,
            company_id: tour.company_id,
            rating: tour.rating,
            is_active: tour.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateTourRequest {
        CreateTourRequest {
            title: "Charyn Canyon".into(),
            image_url: None,
            description: None,
            schedule: None,
            price: 15000.0,
            location: "Almaty".into(),
            duration: "12 hours".into(),
            capacity: 20,
            latitude: Some(43.35),
            longitude: Some(79.08),
            company_id: 1,
        }
    }

    #[test]
    fn valid_tour_passes() {
        assert!(create_request().validate(1000).is_ok());
    }

    #[test]
    fn price_must_be_positive() {
        let mut request = create_request();
        request.price = 0.0;
        assert!(matches!(request.validate(1000), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn capacity_respects_configured_maximum() {
        let mut request = create_request();
        request.capacity = 1001;
        assert!(request.validate(1000).is_err());
        request.capacity = 0;
        assert!(request.validate(1000).is_err());
    }

    #[test]
    fn coordinates_are_range_checked() {
        let update = UpdateTourRequest {
            latitude: Some(91.0),
            ..Default::default()
        };
        assert!(update.validate(1000).is_err());

        let update = UpdateTourRequest {
            longitude: Some(-180.0),
            ..Default::default()
        };
        assert!(update.validate(1000).is_ok());
    }

    #[test]
    fn default_capacity_applies_when_missing() {
        let request: CreateTourRequest = serde_json::from_value(serde_json::json!({
            "title": "City walk",
            "price": 10.0,
            "location": "Astana",
            "duration": "2h",
            "company_id": 4
        }))
        .unwrap();
        assert_eq!(request.capacity, 50);
    }

    #[test]
    fn sort_orders_parse_from_query_values() {
        let sort: TourSort = serde_json::from_value(serde_json::json!("price_desc")).unwrap();
        assert_eq!(sort.order_by(), "price DESC, id DESC");
        assert_eq!(TourSort::default(), TourSort::Newest);
    }
}
