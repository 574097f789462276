//! Router assembly: routes, per-route rate limits and the outer middleware stack.

use axum::{
    Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    config::API_V1_STR,
    handlers::{applications, auth, bookings, companies, health, reviews, tours, users},
    middleware::{
        auth::auth_middleware,
        rate_limit::{LimitClass, rate_limit_middleware},
        trusted_host::{TrustedHosts, trusted_host_middleware},
    },
    state::AppState,
};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the complete application router.
///
/// Layout:
/// - `/`, `/health`, `/health/db`: unauthenticated service endpoints
/// - `/api/v1/...`: the REST API, with the general API rate limit applied to
///   every route and stricter limits on registration, login and booking
pub fn router(state: AppState) -> Router {
    let limit = |class: LimitClass| {
        axum_middleware::from_fn_with_state(
            (state.limiter.clone(), state.proxies.clone(), class),
            rate_limit_middleware,
        )
    };

    // Public routes (no authentication required)
    let register = Router::new()
        .route("/auth/register", post(auth::register))
        .route_layer(limit(LimitClass::Register));

    let login = Router::new()
        .route("/auth/login", post(auth::login_form))
        .route("/auth/login/json", post(auth::login_json))
        .route_layer(limit(LimitClass::Login));

    let public = Router::new()
        .route("/auth/refresh", post(auth::refresh))
        .route("/companies", get(companies::list_companies))
        .route("/companies/{id}", get(companies::get_company))
        .route("/tours", get(tours::list_tours))
        .route("/tours/{id}", get(tours::get_tour))
        .route("/reviews", get(reviews::list_reviews))
        .route("/reviews/{id}", get(reviews::get_review))
        .merge(register)
        .merge(login);

    let create_booking = Router::new()
        .route("/bookings", post(bookings::create_booking))
        .route_layer(limit(LimitClass::Booking));

    let authenticated = Router::new()
        .route("/auth/me", get(auth::me))
        // Admin user management
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        // Company applications
        .route(
            "/applications",
            post(applications::create_application).get(applications::list_applications),
        )
        .route(
            "/applications/{id}",
            get(applications::get_application).delete(applications::delete_application),
        )
        .route("/applications/{id}/approve", post(applications::approve_application))
        .route("/applications/{id}/reject", post(applications::reject_application))
        // Companies
        .route("/companies", post(companies::create_company))
        .route("/companies/my", get(companies::my_company))
        .route(
            "/companies/{id}",
            patch(companies::update_company).delete(companies::delete_company),
        )
        // Tours
        .route("/tours", post(tours::create_tour))
        .route("/tours/my", get(tours::my_tours))
        .route(
            "/tours/{id}",
            patch(tours::update_tour).delete(tours::delete_tour),
        )
        // Bookings
        .route("/bookings", get(bookings::list_bookings))
        .route(
            "/bookings/{id}",
            get(bookings::get_booking).delete(bookings::delete_booking),
        )
        .route("/bookings/{id}/status", patch(bookings::update_booking_status))
        .merge(create_booking)
        // Reviews
        .route("/reviews", post(reviews::create_review))
        .route("/reviews/{id}/moderate", patch(reviews::moderate_review))
        .route("/reviews/{id}", delete(reviews::delete_review))
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = public
        .merge(authenticated)
        .layer(limit(LimitClass::Api));

    let trusted_hosts = TrustedHosts::from_config(&state.config);
    let cors = cors_layer(&state.config.cors_origins());

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/health/db", get(health::database_health))
        .nest(API_V1_STR, api)
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            trusted_hosts,
            trusted_host_middleware,
        ))
        .layer(cors)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    MakeRequestUuid,
                ))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                ))),
        )
}

/// Credentialed CORS for the configured origins. Methods and headers are
/// mirrored from the preflight since a wildcard is not allowed with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
