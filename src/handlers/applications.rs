//! Company application endpoints.
//!
//! Clients file applications; admins approve or reject them. Approval creates
//! the company and promotes the applicant in one transaction.

use axum::{Extension, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::AppError,
    extract::{Json, Path, Query},
    logging,
    middleware::auth::AuthContext,
    models::{
        application::{
            ApplicationListQuery, ApplicationResponse, CreateApplicationRequest,
            RejectApplicationRequest,
        },
        pagination::{Paginated, Pagination},
    },
    policy,
    services::application_service,
};

/// `POST /api/v1/applications` (clients only) → 201.
pub async fn create_application(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationResponse>), AppError> {
    if !policy::can_apply_for_company(&auth) {
        return Err(AppError::BadRequest(
            "Only users with the 'client' role can apply for a company".to_string(),
        ));
    }

    let application = application_service::create(&pool, auth.user_id, &request).await?;
    logging::log_user_action(
        auth.user_id,
        "company_application_created",
        &format!("application={} company={}", application.id, application.company_name),
    );

    Ok((StatusCode::CREATED, Json(application.into())))
}

/// `GET /api/v1/applications`. Non-admins only ever see their own applications.
pub async fn list_applications(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<Json<Paginated<ApplicationResponse>>, AppError> {
    let pagination = Pagination::new(query.page, query.per_page)?;

    let (applications, total) =
        application_service::list(&pool, &auth, query.status, pagination).await?;

    Ok(Json(
        Paginated::new(applications, total, pagination).map(ApplicationResponse::from),
    ))
}

pub async fn get_application(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let application = application_service::get(&pool, id).await?;

    if !policy::can_view_application(&auth, application.user_id) {
        return Err(AppError::Forbidden(
            "Not enough permissions to view this application".to_string(),
        ));
    }

    Ok(Json(application.into()))
}

/// `POST /api/v1/applications/{id}/approve` (admin).
pub async fn approve_application(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApplicationResponse>, AppError> {
    policy::require_admin(&auth)?;

    let application = application_service::approve(&pool, auth.user_id, id).await?;
    logging::log_admin_action(
        auth.user_id,
        "approve_application",
        &format!("application:{id}"),
        &format!("user={} company={}", application.user_id, application.company_name),
    );

    Ok(Json(application.into()))
}

/// `POST /api/v1/applications/{id}/reject` (admin). A reason is required.
pub async fn reject_application(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(request): Json<RejectApplicationRequest>,
) -> Result<Json<ApplicationResponse>, AppError> {
    policy::require_admin(&auth)?;
    let reason = request.reason()?;

    let application = application_service::reject(&pool, auth.user_id, id, reason).await?;
    logging::log_admin_action(
        auth.user_id,
        "reject_application",
        &format!("application:{id}"),
        &format!("reason={reason}"),
    );

    Ok(Json(application.into()))
}

/// `DELETE /api/v1/applications/{id}` → 204. Approved applications can only be removed by admins.
pub async fn delete_application(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let application = application_service::get(&pool, id).await?;

    if !policy::can_delete_application(&auth, application.user_id, application.status()) {
        return Err(if application.user_id == auth.user_id {
            AppError::BadRequest("Cannot delete an approved application".to_string())
        } else {
            AppError::Forbidden("Not enough permissions to delete this application".to_string())
        });
    }

    application_service::delete(&pool, id).await?;
    logging::log_user_action(auth.user_id, "company_application_deleted", &format!("application={id}"));

    Ok(StatusCode::NO_CONTENT)
}
