//! HTTP backend against the stub API: wire format, error mapping and
//! request correlation.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use axum::http::StatusCode;
use secrecy::SecretString;
use serde_json::json;

use sealen_client::MarineApi;
use sealen_client::api::{ApiError, Credentials};
use sealen_core::{BookingKind, Email, ProductId, Role};
use sealen_integration_tests::{Failure, PASSWORD, StubApi};

fn credentials(email: &str, password: &str) -> Credentials {
    Credentials {
        email: Email::parse(email).expect("valid email"),
        password: SecretString::from(password.to_string()),
    }
}

#[tokio::test]
async fn test_login_decodes_tokens_and_user() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();

    let auth = api
        .login(&credentials("operator@sealen.test", PASSWORD))
        .await
        .expect("login should succeed");

    assert_eq!(auth.user.role, Role::Operator);
    assert_eq!(auth.user.full_name, "Budi Operator");
    assert!(auth.tokens.refresh.is_some());
    assert_eq!(stub.request_log(), vec!["POST /api/auth/login"]);
}

#[tokio::test]
async fn test_bad_credentials_use_error_field() {
    let stub = StubApi::spawn().await;
    let err = stub
        .http_api()
        .login(&credentials("operator@sealen.test", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Invalid credentials"));
}

#[tokio::test]
async fn test_expired_token_uses_msg_field() {
    let stub = StubApi::spawn().await;
    let err = stub
        .http_api()
        .current_user(&SecretString::from("stale".to_string()))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Unauthorized: Token has expired");
}

#[tokio::test]
async fn test_status_codes_map_to_errors() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();

    stub.fail_next(Failure::new(StatusCode::FORBIDDEN, json!({ "error": "Access denied" })));
    assert!(matches!(api.products(None).await, Err(ApiError::Forbidden(_))));

    let err = api.product(ProductId::new(99)).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(ref m) if m == "Product not found"));

    stub.fail_next(Failure::new(
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "error": "Start date is in the past" }),
    ));
    let err = api.products(None).await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { status: 422, .. }));
    assert_eq!(err.server_message(), Some("Start date is in the past"));

    stub.fail_next(Failure::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "database unavailable" }),
    ));
    let err = api.products(None).await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 500, .. }));
    assert_eq!(err.server_message(), None);
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();

    stub.fail_next(
        Failure::new(StatusCode::TOO_MANY_REQUESTS, json!({})).with_retry_after(7),
    );
    assert!(matches!(api.products(None).await, Err(ApiError::RateLimited(7))));

    // Missing header falls back to a minute
    stub.fail_next(Failure::new(StatusCode::TOO_MANY_REQUESTS, json!({})));
    assert!(matches!(api.products(None).await, Err(ApiError::RateLimited(60))));
}

#[tokio::test]
async fn test_error_without_body_uses_reason_phrase() {
    let stub = StubApi::spawn().await;
    stub.fail_next(Failure::new(StatusCode::BAD_GATEWAY, json!(null)));
    let err = stub.http_api().products(None).await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 502, ref message } if message == "Bad Gateway"));
}

#[tokio::test]
async fn test_every_request_carries_unique_request_id() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();

    for _ in 0..3 {
        api.products(None).await.expect("products should load");
    }

    let ids: HashSet<String> = stub
        .requests()
        .into_iter()
        .map(|r| r.request_id.expect("request id header"))
        .collect();
    assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn test_query_parameters() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();

    api.products(Some("robot")).await.expect("products should load");
    let auth = api
        .login(&credentials("customer@sealen.test", PASSWORD))
        .await
        .expect("login should succeed");
    api.bookings(&auth.tokens.access, Some(sealen_core::BookingStatus::Active))
        .await
        .expect("bookings should load");

    let queries: Vec<Option<String>> = stub.requests().into_iter().map(|r| r.query).collect();
    assert_eq!(
        queries,
        vec![
            Some("category=robot".to_string()),
            None,
            Some("status=active".to_string())
        ]
    );
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();
    let auth = api
        .login(&credentials("customer@sealen.test", PASSWORD))
        .await
        .expect("login should succeed");

    api.current_user(&auth.tokens.access)
        .await
        .expect("token should be accepted");

    let bearers: Vec<Option<String>> = stub.requests().into_iter().map(|r| r.bearer).collect();
    assert_eq!(bearers.first(), Some(&None));
    assert!(
        bearers
            .get(1)
            .and_then(Option::as_deref)
            .is_some_and(|t| t.starts_with("access-"))
    );
}

#[tokio::test]
async fn test_malformed_booking_records_are_skipped() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();
    let auth = api
        .login(&credentials("customer@sealen.test", PASSWORD))
        .await
        .expect("login should succeed");

    let base = json!({
        "user_id": 3,
        "start_date": "2025-04-01T00:00:00",
        "status": "confirmed",
        "total_cost": 40500000
    });
    let with = |fields: serde_json::Value| {
        let mut record = base.clone();
        for (key, value) in fields.as_object().expect("object") {
            record[key] = value.clone();
        }
        record
    };

    stub.insert_booking(with(json!({
        "booking_id": 1, "booking_type": "rental", "robot_id": 2, "duration_days": 30
    })));
    // Both a robot and a product: ambiguous
    stub.insert_booking(with(json!({
        "booking_id": 2, "booking_type": "rental", "robot_id": 2, "product_id": 1,
        "duration_days": 30
    })));
    stub.insert_booking(with(json!({
        "booking_id": 3, "booking_type": "purchase", "product_id": 1
    })));

    let bookings = api
        .bookings(&auth.tokens.access, None)
        .await
        .expect("bookings should load");

    let kinds: Vec<(i64, BookingKind)> = bookings
        .iter()
        .map(|b| (b.id.as_i64(), b.kind()))
        .collect();
    assert_eq!(kinds, vec![(1, BookingKind::Rental), (3, BookingKind::Purchase)]);
}
