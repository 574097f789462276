//! Company model and API request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::check_length};

/// Represents a row of the `companies` table.
///
/// `owner_id` becomes `NULL` when the owning user is deleted; the company and
/// its tours survive.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub work_hours: Option<String>,
    pub website: Option<String>,
    pub owner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /companies`.
#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub address: Option<String>,
    pub work_hours: Option<String>,
    pub website: Option<String>,
}

impl CreateCompanyRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        check_length("name", &self.name, 2, 200)
    }
}

/// Request body for `PATCH /companies/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub work_hours: Option<String>,
    pub website: Option<String>,
}

impl UpdateCompanyRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            check_length("name", name, 2, 200)?;
        }
        Ok(())
    }
}

/// Query parameters for `GET /companies`.
#[derive(Debug, Default, Deserialize)]
pub struct CompanyListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Case-insensitive substring of the company name.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyResponse {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub work_hours: Option<String>,
    pub website: Option<String>,
    pub owner_id: Option<i64>,
}

impl From<Company> for CompanyResponse {
    fn from(company: Company) -> Self {
        Self {
            id: company.id,
            name: company.name,
            address: company.address,
            work_hours: company.work_hours,
            website: company.website,
            owner_id: company.owner_id,
        }
    }
}
