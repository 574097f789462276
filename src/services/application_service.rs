//! Company applications: filing, review and withdrawal.

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        application::{ApplicationStatus, CompanyApplication, CreateApplicationRequest},
        pagination::Pagination,
        user::Role,
    },
    services::company_service,
};

fn not_found() -> AppError {
    AppError::NotFound("Application not found".to_string())
}

fn already_processed(status: ApplicationStatus) -> AppError {
    AppError::BadRequest(format!("Application has already been processed. Status: {status}"))
}

/// File an application for `user_id`.
///
/// # Errors
///
/// - `BadRequest`: the user already owns a company or has a pending application
pub async fn create(
    pool: &DbPool,
    user_id: i64,
    request: &CreateApplicationRequest,
) -> Result<CompanyApplication, AppError> {
    request.validate()?;

    if company_service::find_by_owner(pool, user_id).await?.is_some() {
        return Err(AppError::BadRequest("You already own a company".to_string()));
    }

    let pending = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM company_applications WHERE user_id = $1 AND status = 'pending')",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    if pending {
        return Err(AppError::BadRequest(
            "You already have a pending application. Please wait for it to be reviewed.".to_string(),
        ));
    }

    let application = sqlx::query_as::<_, CompanyApplication>(
        r#"
        INSERT INTO company_applications (user_id, company_name, company_address, company_website, work_hours)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&request.company_name)
    .bind(&request.company_address)
    .bind(request.company_website.as_deref())
    .bind(request.work_hours.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(application)
}

/// Admins see every application (optionally by status), everyone else only their own.
pub async fn list(
    pool: &DbPool,
    actor: &AuthContext,
    status: Option<ApplicationStatus>,
    pagination: Pagination,
) -> Result<(Vec<CompanyApplication>, i64), AppError> {
    let (user_filter, status) = if actor.role == Role::Admin {
        (None, status.map(|s| s.as_str()))
    } else {
        (Some(actor.user_id), None)
    };

    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM company_applications
        WHERE ($1::BIGINT IS NULL OR user_id = $1)
          AND ($2::TEXT IS NULL OR status = $2)
        "#,
    )
    .bind(user_filter)
    .bind(status)
    .fetch_one(pool)
    .await?;

    let applications = sqlx::query_as::<_, CompanyApplication>(
        r#"
        SELECT * FROM company_applications
        WHERE ($1::BIGINT IS NULL OR user_id = $1)
          AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY created_at DESC, id DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_filter)
    .bind(status)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok((applications, total))
}

pub async fn get(pool: &DbPool, id: i64) -> Result<CompanyApplication, AppError> {
    sqlx::query_as::<_, CompanyApplication>("SELECT * FROM company_applications WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(not_found)
}

/// Approve a pending application.
///
/// # Process
///
/// 1. Lock the application row and check it is pending
/// 2. Check the applicant still exists and owns no company
/// 3. Create the company owned by the applicant
/// 4. Promote the applicant to the company role
/// 5. Mark the application approved by `admin_id`
///
/// All five steps commit together or not at all.
pub async fn approve(pool: &DbPool, admin_id: i64, id: i64) -> Result<CompanyApplication, AppError> {
    let mut tx = pool.begin().await?;

    let application = sqlx::query_as::<_, CompanyApplication>(
        "SELECT * FROM company_applications WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(not_found)?;

    if application.status() != ApplicationStatus::Pending {
        return Err(already_processed(application.status()));
    }

    let applicant_exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(application.user_id)
        .fetch_one(&mut *tx)
        .await?;
    if !applicant_exists {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let owns_company = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM companies WHERE owner_id = $1)")
        .bind(application.user_id)
        .fetch_one(&mut *tx)
        .await?;
    if owns_company {
        return Err(AppError::BadRequest("User already owns a company".to_string()));
    }

    sqlx::query(
        r#"
        INSERT INTO companies (name, address, work_hours, website, owner_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&application.company_name)
    .bind(&application.company_address)
    .bind(application.work_hours.as_deref())
    .bind(application.company_website.as_deref())
    .bind(application.user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
        .bind(application.user_id)
        .bind(Role::Company.as_str())
        .execute(&mut *tx)
        .await?;

    let approved = sqlx::query_as::<_, CompanyApplication>(
        r#"
        UPDATE company_applications
        SET status = 'approved', reviewed_at = NOW(), reviewed_by_admin_id = $2
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(application.id)
    .bind(admin_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(approved)
}

/// Reject a pending application with a reason shown to the applicant.
pub async fn reject(
    pool: &DbPool,
    admin_id: i64,
    id: i64,
    reason: &str,
) -> Result<CompanyApplication, AppError> {
    let application = get(pool, id).await?;
    if application.status() != ApplicationStatus::Pending {
        return Err(already_processed(application.status()));
    }

    // status guard in the WHERE clause covers a concurrent approve
    sqlx::query_as::<_, CompanyApplication>(
        r#"
        UPDATE company_applications
        SET status = 'rejected', reviewed_at = NOW(), reviewed_by_admin_id = $2, rejection_reason = $3
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(admin_id)
    .bind(reason)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::BadRequest("Application has already been processed".to_string()))
}

pub async fn delete(pool: &DbPool, id: i64) -> Result<(), AppError> {
    let deleted = sqlx::query("DELETE FROM company_applications WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(not_found());
    }
    Ok(())
}
