//! Router-level tests driving the full middleware stack with `oneshot`.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use genbi_backend::security::jwt::TokenKind;
use serde_json::json;

mod common;

use common::{app, app_with, config, from_peer, get, json_body, post_json, send};

#[tokio::test]
async fn health_reports_service_and_environment() {
    let response = send(&app(), get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "Genbi Admin Panel");
    assert_eq!(body["environment"], "development");
}

#[tokio::test]
async fn root_welcomes() {
    let response = send(&app(), get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Welcome to Genbi Admin Panel");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn me_requires_bearer_token() {
    let response = send(&app(), get("/api/v1/auth/me")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let body = json_body(response).await;
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn me_rejects_malformed_token() {
    let request = Request::builder()
        .uri("/api/v1/auth/me")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();

    let response = send(&app(), request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["detail"], "Could not validate credentials");
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() {
    let (router, state) = app_with(config(&[]));
    let refresh = state.tokens.issue(42, TokenKind::Refresh).unwrap();

    let request = Request::builder()
        .uri("/api/v1/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
        .body(Body::empty())
        .unwrap();

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rejects_access_and_garbage_tokens() {
    let (router, state) = app_with(config(&[]));
    let access = state.tokens.issue(42, TokenKind::Access).unwrap();

    for token in [access.as_str(), "garbage"] {
        let response = send(
            &router,
            post_json("/api/v1/auth/refresh", json!({ "refresh_token": token })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["detail"], "Invalid refresh token");
    }
}

#[tokio::test]
async fn register_rejects_invalid_email() {
    let response = send(
        &app(),
        post_json(
            "/api/v1/auth/register",
            json!({
                "email": "not-an-email",
                "full_name": "Test User",
                "password": "Str0ngPassword"
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn malformed_bodies_use_the_error_shape() {
    let router = app();

    let missing_field = post_json(
        "/api/v1/auth/register",
        json!({ "email": "new@example.com", "full_name": "No Password" }),
    );
    let response = send(&router, missing_field).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let body = json_body(response).await;
    assert_eq!(body["code"], "validation_error");
    assert!(body["detail"].as_str().unwrap().contains("password"));

    let not_json = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login/json")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&router, not_json).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["code"], "validation_error");

    let empty_form = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=someone"))
        .unwrap();
    let response = send(&router, empty_form).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["code"], "validation_error");
}

#[tokio::test]
async fn register_rejects_weak_password() {
    let response = send(
        &app(),
        post_json(
            "/api/v1/auth/register",
            json!({
                "email": "weak@example.com",
                "full_name": "Weak Password",
                "password": "short"
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let detail = json_body(response).await["detail"].as_str().unwrap().to_lowercase();
    assert!(detail.contains("password"));
}

fn bad_registration() -> Request<Body> {
    post_json(
        "/api/v1/auth/register",
        json!({ "email": "bad", "full_name": "Rate Limited", "password": "Str0ngPassword" }),
    )
}

fn forwarded_for(mut request: Request<Body>, value: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert("x-forwarded-for", value.parse().unwrap());
    request
}

#[tokio::test]
async fn register_is_rate_limited_per_client() {
    let router = app();

    // Default REGISTER_RATE_LIMIT is 3/hour
    for _ in 0..3 {
        let response = send(&router, from_peer(bad_registration(), [198, 51, 100, 23])).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    let response = send(&router, from_peer(bad_registration(), [198, 51, 100, 23])).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        json_body(response).await["detail"],
        "Too many requests. Please try again later."
    );

    // A different client still has its own budget
    let other = from_peer(bad_registration(), [198, 51, 100, 24]);
    assert_eq!(send(&router, other).await.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn spoofed_forwarded_for_does_not_reset_the_limit() {
    let router = app();
    let mut statuses = Vec::new();

    for i in 0..10 {
        let request = forwarded_for(
            from_peer(bad_registration(), [198, 51, 100, 23]),
            &format!("10.0.0.{i}"),
        );
        statuses.push(send(&router, request).await.status());
    }

    assert!(statuses[..3].iter().all(|s| *s == StatusCode::UNPROCESSABLE_ENTITY));
    assert!(statuses[3..].iter().all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn forwarded_for_is_honoured_behind_a_trusted_proxy() {
    let (router, _) = app_with(config(&[("TRUSTED_PROXIES", "10.0.0.2")]));
    let via_proxy = |client: &str| forwarded_for(from_peer(bad_registration(), [10, 0, 0, 2]), client);

    for _ in 0..3 {
        let response = send(&router, via_proxy("203.0.113.7")).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
    assert_eq!(
        send(&router, via_proxy("203.0.113.7")).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    // Another client behind the same proxy is counted separately
    assert_eq!(
        send(&router, via_proxy("203.0.113.8")).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn rate_limits_can_be_disabled() {
    let (router, _) = app_with(config(&[("RATE_LIMIT_ENABLED", "false")]));

    for _ in 0..5 {
        let response = send(
            &router,
            post_json(
                "/api/v1/auth/register",
                json!({ "email": "bad", "full_name": "No Limit", "password": "Str0ngPassword" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

#[tokio::test]
async fn production_rejects_untrusted_hosts() {
    let (router, _) = app_with(config(&[
        ("ENVIRONMENT", "production"),
        ("ALLOWED_HOSTS", "api.yourdomain.com"),
    ]));

    let untrusted = Request::builder()
        .uri("/health")
        .header(header::HOST, "evil.example.com")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&router, untrusted).await.status(), StatusCode::BAD_REQUEST);

    let trusted = Request::builder()
        .uri("/health")
        .header(header::HOST, "api.yourdomain.com:443")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, trusted).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["environment"], "production");
}

#[tokio::test]
async fn development_accepts_any_host() {
    let request = Request::builder()
        .uri("/health")
        .header(header::HOST, "whatever.local")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app(), request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/v1/tours")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
        .body(Body::empty())
        .unwrap();

    let response = send(&app(), request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:5173");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn cors_ignores_unknown_origin() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/v1/tours")
        .header(header::ORIGIN, "https://attacker.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();

    let response = send(&app(), request).await;
    assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn pagination_bounds_are_validated() {
    for uri in ["/api/v1/tours?per_page=0", "/api/v1/tours?per_page=101", "/api/v1/companies?page=0"] {
        let response = send(&app(), get(uri)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert_eq!(json_body(response).await["code"], "validation_error");
    }
}

#[tokio::test]
async fn unknown_tour_sort_is_rejected() {
    let response = send(&app(), get("/api/v1/tours?sort_by=cheapest")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["code"], "validation_error");
}

#[tokio::test]
async fn non_numeric_ids_are_validation_errors() {
    for uri in ["/api/v1/tours/abc", "/api/v1/companies/abc", "/api/v1/tours?page=first"] {
        let response = send(&app(), get(uri)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert_eq!(json_body(response).await["code"], "validation_error");
    }
}
