//! Service tests against a real PostgreSQL database.
//!
//! `#[sqlx::test]` creates a fresh database per test from `DATABASE_URL` and
//! applies the migrations before handing over the pool.

use axum::{http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use genbi_backend::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        application::CreateApplicationRequest,
        booking::{BookingStatus, CreateBookingRequest},
        company::CreateCompanyRequest,
        pagination::Pagination,
        review::{CreateReviewRequest, Review, ReviewListQuery, ReviewTarget},
        tour::{CreateTourRequest, Tour},
        user::{Role, UpdateUserRequest, User},
    },
    services::{
        application_service, booking_service, company_service, review_service, tour_service,
        user_service::{self, NewUser},
    },
};
use sqlx::PgPool;

const MIN_ADVANCE_HOURS: i64 = 24;

async fn user(pool: &PgPool, email: &str, role: Role) -> User {
    user_service::create_user(
        pool,
        NewUser {
            email,
            full_name: Some("Test User"),
            phone: None,
            password_hash: "$argon2id$not-a-real-hash",
            role,
            is_active: true,
        },
    )
    .await
    .unwrap()
}

fn context(user: &User) -> AuthContext {
    AuthContext {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role(),
    }
}

async fn tour(pool: &PgPool, capacity: i32) -> Tour {
    let owner = user(pool, "owner@tours.test", Role::Company).await;
    let company = company_service::create(
        pool,
        owner.id,
        &CreateCompanyRequest {
            name: "Steppe Tours".into(),
            address: None,
            work_hours: None,
            website: None,
        },
    )
    .await
    .unwrap();

    tour_service::create(
        pool,
        &CreateTourRequest {
            title: "Charyn Canyon".into(),
            image_url: None,
            description: None,
            schedule: None,
            price: 100.0,
            location: "Almaty".into(),
            duration: "1 day".into(),
            capacity,
            latitude: None,
            longitude: None,
            company_id: company.id,
        },
    )
    .await
    .unwrap()
}

fn booking(tour_id: i64, participants_count: i32, days_ahead: i64) -> CreateBookingRequest {
    // Whole seconds so the value survives the round trip through TIMESTAMPTZ unchanged
    let departure = Utc::now().date_naive().and_hms_opt(10, 0, 0).unwrap().and_utc();
    let date = departure + Duration::days(days_ahead);
    CreateBookingRequest {
        tour_id,
        participants_count,
        date,
    }
}

fn bad_request(result: Result<impl std::fmt::Debug, AppError>) -> String {
    match result {
        Err(AppError::BadRequest(message)) => message,
        other => panic!("expected BadRequest, got {other:?}"),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn booking_capacity_is_exhausted_by_active_bookings(pool: PgPool) {
    let tour = tour(&pool, 5).await;
    let alice = user(&pool, "alice@test.com", Role::Client).await;
    let bob = user(&pool, "bob@test.com", Role::Client).await;
    let carol = user(&pool, "carol@test.com", Role::Client).await;

    let alices = booking_service::create(&pool, alice.id, &booking(tour.id, 3, 3), MIN_ADVANCE_HOURS)
        .await
        .unwrap();
    assert_eq!(alices.status(), BookingStatus::Pending);

    let message = bad_request(
        booking_service::create(&pool, bob.id, &booking(tour.id, 3, 3), MIN_ADVANCE_HOURS).await,
    );
    assert_eq!(message, "Not enough capacity. Available: 2, Requested: 3");

    booking_service::create(&pool, bob.id, &booking(tour.id, 2, 3), MIN_ADVANCE_HOURS)
        .await
        .unwrap();

    let message = bad_request(
        booking_service::create(&pool, carol.id, &booking(tour.id, 1, 3), MIN_ADVANCE_HOURS).await,
    );
    assert_eq!(message, "Not enough capacity. Available: 0, Requested: 1");

    // Other departure dates have their own capacity
    booking_service::create(&pool, carol.id, &booking(tour.id, 5, 4), MIN_ADVANCE_HOURS)
        .await
        .unwrap();

    // Cancelled bookings release their seats
    booking_service::update_status(&pool, &context(&alice), alices.id, BookingStatus::Cancelled)
        .await
        .unwrap();
    booking_service::create(&pool, carol.id, &booking(tour.id, 3, 3), MIN_ADVANCE_HOURS)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn second_active_booking_for_the_same_date_is_refused(pool: PgPool) {
    let tour = tour(&pool, 10).await;
    let alice = user(&pool, "alice@test.com", Role::Client).await;

    let first = booking_service::create(&pool, alice.id, &booking(tour.id, 1, 3), MIN_ADVANCE_HOURS)
        .await
        .unwrap();

    let message = bad_request(
        booking_service::create(&pool, alice.id, &booking(tour.id, 1, 3), MIN_ADVANCE_HOURS).await,
    );
    assert_eq!(message, "You already have a booking for this tour on this date");

    booking_service::update_status(&pool, &context(&alice), first.id, BookingStatus::Cancelled)
        .await
        .unwrap();
    booking_service::create(&pool, alice.id, &booking(tour.id, 1, 3), MIN_ADVANCE_HOURS)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn cancelled_booking_is_final(pool: PgPool) {
    let tour = tour(&pool, 10).await;
    let alice = user(&pool, "alice@test.com", Role::Client).await;
    let admin = user(&pool, "admin@test.com", Role::Admin).await;

    let created = booking_service::create(&pool, alice.id, &booking(tour.id, 2, 3), MIN_ADVANCE_HOURS)
        .await
        .unwrap();

    // Two cancellations racing on the same row: the lock lets exactly one through
    let alice_ctx = context(&alice);
    let (first, second) = tokio::join!(
        booking_service::update_status(&pool, &alice_ctx, created.id, BookingStatus::Cancelled),
        booking_service::update_status(&pool, &alice_ctx, created.id, BookingStatus::Cancelled),
    );
    assert_eq!(u8::from(first.is_ok()) + u8::from(second.is_ok()), 1);

    let message = bad_request(
        booking_service::update_status(&pool, &context(&admin), created.id, BookingStatus::Confirmed)
            .await,
    );
    assert_eq!(message, "Cannot modify cancelled booking");
    assert_eq!(
        booking_service::get(&pool, created.id).await.unwrap().status(),
        BookingStatus::Cancelled
    );
}

fn application(name: &str) -> CreateApplicationRequest {
    CreateApplicationRequest {
        company_name: name.into(),
        company_address: "12 Abay Avenue, Almaty".into(),
        company_website: Some("https://tours.example".into()),
        work_hours: Some("9-18".into()),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn approving_an_application_creates_company_and_promotes_user(pool: PgPool) {
    let admin = user(&pool, "admin@test.com", Role::Admin).await;
    let applicant = user(&pool, "applicant@test.com", Role::Client).await;

    let pending = application_service::create(&pool, applicant.id, &application("Nomad Trails"))
        .await
        .unwrap();
    let approved = application_service::approve(&pool, admin.id, pending.id).await.unwrap();

    assert_eq!(approved.status, "approved");
    assert_eq!(approved.reviewed_by_admin_id, Some(admin.id));
    assert!(approved.reviewed_at.is_some());

    let company = company_service::find_by_owner(&pool, applicant.id)
        .await
        .unwrap()
        .expect("company created for applicant");
    assert_eq!(company.name, "Nomad Trails");
    assert_eq!(company.website.as_deref(), Some("https://tours.example"));

    let promoted = user_service::find_by_id(&pool, applicant.id).await.unwrap().unwrap();
    assert_eq!(promoted.role(), Role::Company);

    // A processed application cannot be approved twice
    let message = bad_request(application_service::approve(&pool, admin.id, pending.id).await);
    assert!(message.contains("approved"), "{message}");
}

#[sqlx::test(migrations = "./migrations")]
async fn failed_approval_changes_nothing(pool: PgPool) {
    let admin = user(&pool, "admin@test.com", Role::Admin).await;
    let applicant = user(&pool, "applicant@test.com", Role::Client).await;

    let pending = application_service::create(&pool, applicant.id, &application("Steppe Tours"))
        .await
        .unwrap();
    // Another company takes the name before the admin gets to the application
    tour(&pool, 10).await;

    let err = application_service::approve(&pool, admin.id, pending.id)
        .await
        .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

    let unchanged = application_service::get(&pool, pending.id).await.unwrap();
    assert_eq!(unchanged.status, "pending");
    assert_eq!(unchanged.reviewed_by_admin_id, None);

    let applicant = user_service::find_by_id(&pool, applicant.id).await.unwrap().unwrap();
    assert_eq!(applicant.role(), Role::Client);
    assert!(company_service::find_by_owner(&pool, applicant.id).await.unwrap().is_none());
}

async fn review(pool: &PgPool, author: &User, tour_id: i64, rating: i32) -> Review {
    review_service::create(
        pool,
        author.id,
        &CreateReviewRequest {
            target_type: ReviewTarget::Tour,
            target_id: tour_id,
            rating,
            comment: None,
        },
    )
    .await
    .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn tour_rating_follows_reviews(pool: PgPool) {
    let tour = tour(&pool, 10).await;
    assert_eq!(tour.rating, 0.0);

    let alice = user(&pool, "alice@test.com", Role::Client).await;
    let bob = user(&pool, "bob@test.com", Role::Client).await;
    let carol = user(&pool, "carol@test.com", Role::Client).await;

    let five = review(&pool, &alice, tour.id, 5).await;
    review(&pool, &bob, tour.id, 4).await;
    review(&pool, &carol, tour.id, 4).await;

    let rating = |id: i64| {
        let pool = pool.clone();
        async move { tour_service::get(&pool, id).await.unwrap().rating }
    };
    assert_eq!(rating(tour.id).await, 4.33);

    let message = bad_request(
        review_service::create(
            &pool,
            alice.id,
            &CreateReviewRequest {
                target_type: ReviewTarget::Tour,
                target_id: tour.id,
                rating: 1,
                comment: None,
            },
        )
        .await,
    );
    assert_eq!(message, "You have already reviewed this tour");

    review_service::delete(&pool, &five).await.unwrap();
    assert_eq!(rating(tour.id).await, 4.0);

    let (remaining, _) = review_service::list(
        &pool,
        &ReviewListQuery::default(),
        Pagination::new(None, None).unwrap(),
    )
    .await
    .unwrap();
    for remaining in remaining {
        review_service::delete(&pool, &remaining).await.unwrap();
    }
    assert_eq!(rating(tour.id).await, 0.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn user_update_guards_role_and_uniqueness(pool: PgPool) {
    let admin = user(&pool, "admin@test.com", Role::Admin).await;
    let taken = user_service::create_user(
        &pool,
        NewUser {
            email: "taken@test.com",
            full_name: None,
            phone: Some("+77011234567"),
            password_hash: "$argon2id$not-a-real-hash",
            role: Role::Client,
            is_active: true,
        },
    )
    .await
    .unwrap();
    let client = user(&pool, "client@test.com", Role::Client).await;

    let demote_self = UpdateUserRequest {
        role: Some(Role::Client),
        ..Default::default()
    };
    assert!(matches!(
        user_service::update(&pool, admin.id, admin.id, &demote_self).await,
        Err(AppError::Forbidden(message)) if message == "Cannot change your own role"
    ));

    // Restating the current role is not a change
    let same_role = UpdateUserRequest {
        role: Some(Role::Admin),
        full_name: Some("Head Admin".into()),
        ..Default::default()
    };
    let renamed = user_service::update(&pool, admin.id, admin.id, &same_role).await.unwrap();
    assert_eq!(renamed.full_name.as_deref(), Some("Head Admin"));

    let email_clash = UpdateUserRequest {
        email: Some("taken@test.com".into()),
        ..Default::default()
    };
    let err = user_service::update(&pool, admin.id, client.id, &email_clash)
        .await
        .unwrap_err();
    assert!(matches!(&err, AppError::Conflict(message) if message == "Email already registered"));
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

    let phone_clash = UpdateUserRequest {
        phone: Some("+77011234567".into()),
        ..Default::default()
    };
    assert!(matches!(
        user_service::update(&pool, admin.id, client.id, &phone_clash).await,
        Err(AppError::Conflict(message)) if message == "Phone number already registered"
    ));

    // A user keeping their own phone is not a clash
    let own_phone = UpdateUserRequest {
        phone: Some("+77011234567".into()),
        is_active: Some(false),
        ..Default::default()
    };
    let updated = user_service::update(&pool, admin.id, taken.id, &own_phone).await.unwrap();
    assert!(!updated.is_active);
}

#[sqlx::test(migrations = "./migrations")]
async fn unique_violations_surface_as_conflicts(pool: PgPool) {
    user(&pool, "dup@test.com", Role::Client).await;

    let err = user_service::create_user(
        &pool,
        NewUser {
            email: "dup@test.com",
            full_name: None,
            phone: None,
            password_hash: "$argon2id$not-a-real-hash",
            role: Role::Client,
            is_active: true,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(&err, AppError::Database(sqlx::Error::Database(db)) if db.is_unique_violation()));

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "conflict");
    assert_eq!(body["detail"], "Resource already exists");

    // The partial index backs up the duplicate booking check
    let tour = tour(&pool, 10).await;
    let alice = user(&pool, "alice@test.com", Role::Client).await;
    let request = booking(tour.id, 1, 3);
    booking_service::create(&pool, alice.id, &request, MIN_ADVANCE_HOURS)
        .await
        .unwrap();

    let raw = sqlx::query(
        "INSERT INTO bookings (tour_id, user_id, participants_count, date, status) VALUES ($1, $2, 1, $3, 'confirmed')",
    )
    .bind(tour.id)
    .bind(alice.id)
    .bind(request.date)
    .execute(&pool)
    .await
    .unwrap_err();
    let err = AppError::from(raw);
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}
