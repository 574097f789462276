//! Company endpoints.

use axum::{Extension, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::AppError,
    extract::{Json, Path, Query},
    logging,
    middleware::auth::AuthContext,
    models::{
        company::{CompanyListQuery, CompanyResponse, CreateCompanyRequest, UpdateCompanyRequest},
        pagination::{Paginated, Pagination},
        user::Role,
    },
    policy,
    services::company_service,
};

/// `POST /api/v1/companies` → 201.
///
/// Company users and admins only; clients go through an application.
pub async fn create_company(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<CompanyResponse>), AppError> {
    if auth.role == Role::Client {
        return Err(AppError::Forbidden(
            "Clients must apply for a company through /applications".to_string(),
        ));
    }
    request.validate()?;

    let company = company_service::create(&pool, auth.user_id, &request).await?;
    logging::log_company_action(auth.user_id, auth.role, company.id, "create");

    Ok((StatusCode::CREATED, Json(company.into())))
}

/// Public company directory with optional name `search`.
pub async fn list_companies(
    State(pool): State<DbPool>,
    Query(query): Query<CompanyListQuery>,
) -> Result<Json<Paginated<CompanyResponse>>, AppError> {
    let pagination = Pagination::new(query.page, query.per_page)?;

    let (companies, total) = company_service::list(&pool, query.search.as_deref(), pagination).await?;

    Ok(Json(Paginated::new(companies, total, pagination).map(CompanyResponse::from)))
}

/// The caller's own company.
pub async fn my_company(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<CompanyResponse>, AppError> {
    let company = company_service::find_by_owner(&pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("You do not have a company".to_string()))?;

    Ok(Json(company.into()))
}

pub async fn get_company(
    State(pool): State<DbPool>,
    Path(id): Path<i64>,
) -> Result<Json<CompanyResponse>, AppError> {
    let company = company_service::get(&pool, id).await?;
    Ok(Json(company.into()))
}

pub async fn update_company(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCompanyRequest>,
) -> Result<Json<CompanyResponse>, AppError> {
    let company = company_service::get(&pool, id).await?;

    if !policy::can_manage_company(&auth, company.owner_id) {
        return Err(AppError::Forbidden(
            "Not enough permissions to edit this company".to_string(),
        ));
    }
    request.validate()?;

    let company = company_service::update(&pool, &company, &request).await?;
    logging::log_company_action(auth.user_id, auth.role, company.id, "update");

    Ok(Json(company.into()))
}

/// `DELETE /api/v1/companies/{id}` → 204. Tours, their bookings and reviews go with it.
pub async fn delete_company(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let company = company_service::get(&pool, id).await?;

    if !policy::can_manage_company(&auth, company.owner_id) {
        return Err(AppError::Forbidden(
            "Not enough permissions to delete this company".to_string(),
        ));
    }

    company_service::delete(&pool, id).await?;
    logging::log_company_action(auth.user_id, auth.role, id, "delete");

    Ok(StatusCode::NO_CONTENT)
}
