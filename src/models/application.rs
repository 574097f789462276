//! Company application model.
//!
//! A client asks to become a company owner by filing an application; an
//! admin approves it (which creates the company and promotes the user) or
//! rejects it with a reason.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::check_length};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(AppError::Validation(format!(
                "unknown application status: {other}"
            ))),
        }
    }
}

/// Represents a row of the `company_applications` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyApplication {
    pub id: i64,
    pub user_id: i64,
    pub company_name: String,
    pub company_address: String,
    pub company_website: Option<String>,
    pub work_hours: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by_admin_id: Option<i64>,
    pub rejection_reason: Option<String>,
}

impl CompanyApplication {
    pub fn status(&self) -> ApplicationStatus {
        self.status.parse().unwrap_or(ApplicationStatus::Pending)
    }
}

/// Request body for `POST /applications`.
#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub company_name: String,
    pub company_address: String,
    pub company_website: Option<String>,
    pub work_hours: Option<String>,
}

impl CreateApplicationRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        check_length("company_name", &self.company_name, 2, 200)?;
        check_length("company_address", &self.company_address, 5, 300)?;
        if let Some(website) = &self.company_website {
            check_length("company_website", website, 0, 200)?;
        }
        if let Some(hours) = &self.work_hours {
            check_length("work_hours", hours, 0, 100)?;
        }
        Ok(())
    }
}

/// Request body for `POST /applications/{id}/reject`.
#[derive(Debug, Default, Deserialize)]
pub struct RejectApplicationRequest {
    pub rejection_reason: Option<String>,
}

impl RejectApplicationRequest {
    /// The trimmed, non-empty reason.
    pub fn reason(&self) -> Result<&str, AppError> {
        let reason = self
            .rejection_reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| AppError::BadRequest("A rejection reason is required".to_string()))?;

        check_length("rejection_reason", reason, 1, 500)?;
        Ok(reason)
    }
}

/// Query parameters for `GET /applications`. `status` is honoured for admins only.
#[derive(Debug, Default, Deserialize)]
pub struct ApplicationListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationResponse {
    pub id: i64,
    pub user_id: i64,
    pub company_name: String,
    pub company_address: String,
    pub company_website: Option<String>,
    pub work_hours: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by_admin_id: Option<i64>,
    pub rejection_reason: Option<String>,
}

impl From<CompanyApplication> for ApplicationResponse {
    fn from(application: CompanyApplication) -> Self {
        Self {
            status: application.status(),
            id: application.id,
            user_id: application.user_id,
            company_name: application.company_name,
            company_address: application.company_address,
            company_website: application.company_website,
            work_hours: application.work_hours,
            created_at: application.created_at,
            reviewed_at: application.reviewed_at,
            reviewed_by_admin_id: application.reviewed_by_admin_id,
            rejection_reason: application.rejection_reason,
        }
    }
}
