// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Callable transport, ID token and CORS tests.
//!
//! These tests verify that:
//! 1. Malformed envelopes and wrong methods are rejected
//! 2. Bad or foreign ID tokens are rejected as UNAUTHENTICATED
//! 3. Storage failures surface as INTERNAL without details
//! 4. Health and CORS preflight behave for browser clients

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use subscription_pricing::db::FirestoreDb;
use tower::ServiceExt;

mod common;
use common::{
    call, create_test_app, create_test_app_with_db, create_test_id_token, error_status,
    now_secs, seed_user, sign_id_token, TestClaims, TEST_KID,
};

#[tokio::test]
async fn test_envelope_without_data_rejected() {
    let (app, state) = create_test_app();
    seed_user(&state, "admin", true).await;
    let token = create_test_id_token("admin", &state.config);

    let (status, body) = call(app, Some(&token), json!({"monthlyPrice": 9.99})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_status(&body), "INVALID_ARGUMENT");
    assert_eq!(body["error"]["message"], "Bad Request.");
}

#[tokio::test]
async fn test_non_json_body_rejected() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/updateSubscriptionPricing")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("monthlyPrice=9.99"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_not_allowed() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/updateSubscriptionPricing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_garbage_token_unauthenticated() {
    let (app, _) = create_test_app();

    let (status, body) = call(
        app,
        Some("invalid.token.here"),
        json!({"data": {"monthlyPrice": 1, "yearlyPrice": 2}}),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_status(&body), "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_non_bearer_header_unauthenticated() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/updateSubscriptionPricing")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, "Basic YWRtaW46YWRtaW4=")
                .body(Body::from(r#"{"data": {}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_unauthenticated() {
    let (app, state) = create_test_app();
    seed_user(&state, "admin", true).await;

    let mut claims = TestClaims::for_uid("admin", &state.config);
    claims.iat = now_secs() - 7200;
    claims.auth_time = claims.iat;
    claims.exp = now_secs() - 3600;
    let token = sign_id_token(&claims, TEST_KID);

    let (status, _) = call(
        app,
        Some(&token),
        json!({"data": {"monthlyPrice": 1, "yearlyPrice": 2}}),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_other_project_unauthenticated() {
    let (app, state) = create_test_app();
    seed_user(&state, "admin", true).await;

    let mut claims = TestClaims::for_uid("admin", &state.config);
    claims.aud = "someone-elses-project".to_string();
    claims.iss = "https://securetoken.google.com/someone-elses-project".to_string();
    let token = sign_id_token(&claims, TEST_KID);

    let (status, _) = call(
        app,
        Some(&token),
        json!({"data": {"monthlyPrice": 1, "yearlyPrice": 2}}),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_kid_unauthenticated() {
    let (app, state) = create_test_app();
    seed_user(&state, "admin", true).await;

    let token = sign_id_token(&TestClaims::for_uid("admin", &state.config), "rotated-key");

    let (status, _) = call(
        app,
        Some(&token),
        json!({"data": {"monthlyPrice": 1, "yearlyPrice": 2}}),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_storage_failure_is_internal() {
    let (app, state) = create_test_app_with_db(FirestoreDb::new_offline());
    let token = create_test_id_token("admin", &state.config);

    let (status, body) = call(
        app,
        Some(&token),
        json!({"data": {"monthlyPrice": 1, "yearlyPrice": 2}}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": {"status": "INTERNAL", "message": "INTERNAL"}}));
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/updateSubscriptionPricing")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"data": {}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get("X-Frame-Options").unwrap(), "DENY");
    assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/updateSubscriptionPricing")
                .header(header::ORIGIN, "https://admin.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://admin.example.com"
    );
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/updateSubscriptionPricing")
                .header(header::ORIGIN, "https://evil.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(!response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_health_no_auth_required() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
