//! Review model and API types.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// What a review is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewTarget {
    Tour,
    Company,
}

impl ReviewTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewTarget::Tour => "tour",
            ReviewTarget::Company => "company",
        }
    }
}

impl fmt::Display for ReviewTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewTarget {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tour" => Ok(ReviewTarget::Tour),
            "company" => Ok(ReviewTarget::Company),
            other => Err(AppError::Validation(format!(
                "target_type must be 'tour' or 'company', got '{other}'"
            ))),
        }
    }
}

/// Represents a row of the `reviews` table.
///
/// Exactly one of `tour_id` / `company_id` is set, matching `target_type`
/// (enforced by the `check_review_target` constraint).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub author_id: Option<i64>,
    pub target_type: String,
    pub tour_id: Option<i64>,
    pub company_id: Option<i64>,
    pub rating: i32,
    pub comment: Option<String>,
    pub is_moderated: bool,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// The reviewed entity, derived from whichever foreign key is set.
    pub fn target(&self) -> (ReviewTarget, i64) {
        match (self.tour_id, self.company_id) {
            (Some(tour_id), _) => (ReviewTarget::Tour, tour_id),
            (None, Some(company_id)) => (ReviewTarget::Company, company_id),
            (None, None) => (
                self.target_type.parse().unwrap_or(ReviewTarget::Tour),
                0,
            ),
        }
    }
}

/// Request body for `POST /reviews`.
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub target_type: ReviewTarget,
    pub target_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
}

impl CreateReviewRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::Validation("Rating must be between 1 and 5".to_string()));
        }
        Ok(())
    }
}

/// Query parameters for `GET /reviews`.
///
/// `target_id` only applies together with `target_type`.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub target_type: Option<ReviewTarget>,
    pub target_id: Option<i64>,
    pub is_moderated: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub author_id: Option<i64>,
    pub target_type: ReviewTarget,
    pub target_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub is_moderated: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        let (target_type, target_id) = review.target();
        Self {
            id: review.id,
            author_id: review.author_id,
            target_type,
            target_id,
            rating: review.rating,
            comment: review.comment,
            is_moderated: review.is_moderated,
            created_at: review.created_at,
        }
    }
}
