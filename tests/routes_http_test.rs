// ABOUTME: HTTP integration tests for the access management routes
// ABOUTME: Exercises signup, login, refresh, logout, and token endpoints
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use ams_server::routes;
use ams_server::routes::types::{SessionExpiryResponse, ThresholdsResponse};
use axum::http::StatusCode;
use axum::Router;
use helpers::axum_test::TestRequest;
use serde_json::json;
use uuid::Uuid;

fn app(harness: &common::Harness) -> Router {
    routes::router(harness.resources.clone())
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = common::harness();
    let response = TestRequest::get("/api/v1/ams/health").send(app(&harness)).await;
    assert_eq!(response.status, StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store_backend"], "memory");
}

#[tokio::test]
async fn test_signup_then_verify_then_protected_call() {
    let harness = common::harness();

    // Signup returns 201 with the new account's identifiers.
    let response = TestRequest::post("/api/v1/ams/signup")
        .json(&json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com"
        }))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    let user_id = body["user_id"].as_str().unwrap().to_owned();

    // The verification token travels in the outbound email.
    let token = harness.email.last_token().unwrap();

    let response = TestRequest::get(&format!("/api/v1/ams/verify/email?t={token}"))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let expiries: SessionExpiryResponse = response.json();
    assert!(expiries.refresh_expires_at > expiries.access_expires_at);

    let access_cookie = response.cookie_value("ams_at").unwrap();

    // The fresh session can read its own thresholds.
    let response = TestRequest::get(&format!("/api/v1/ams/users/{user_id}/tokens/thresholds"))
        .header("authorization", &format!("Bearer {access_cookie}"))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let thresholds: ThresholdsResponse = response.json();
    assert_eq!(thresholds.role, "default");
    assert_eq!(thresholds.permanent_in_use, 0);
}

#[tokio::test]
async fn test_magic_link_login_flow() {
    let harness = common::harness();
    harness.active_user("b@c.example").await;

    // Initiation always answers 202, known address or not.
    let response = TestRequest::post("/api/v1/ams/login")
        .json(&json!({"email": "b@c.example"}))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    let response = TestRequest::post("/api/v1/ams/login")
        .json(&json!({"email": "nobody@c.example"}))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    // Exactly one email went out, for the real account.
    let outbox = harness.email.outbox();
    assert_eq!(outbox.len(), 1);
    let token = outbox[0].token.clone();

    let response = TestRequest::get(&format!("/api/v1/ams/login?t={token}"))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.cookie_value("ams_at").is_some());
    assert!(response.cookie_value("ams_rt").is_some());

    // The link is single-use.
    let response = TestRequest::get(&format!("/api/v1/ams/login?t={token}"))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AM00-012");
}

#[tokio::test]
async fn test_refresh_rotation_via_cookies() {
    let harness = common::harness();
    let user = harness.active_user("rotate@example.com").await;
    let pair = harness.access.issue_session(&user).await.unwrap();

    let response = TestRequest::post("/api/v1/ams/tokens/refresh")
        .header(
            "cookie",
            &format!("ams_at={}; ams_rt={}", pair.access_token, pair.refresh_token),
        )
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let new_refresh = response.cookie_value("ams_rt").unwrap();
    assert_ne!(new_refresh, pair.refresh_token);

    // The old refresh token is dead.
    let response = TestRequest::post("/api/v1/ams/tokens/refresh")
        .header("cookie", &format!("ams_rt={}", pair.refresh_token))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AM00-017");
}

#[tokio::test]
async fn test_logout_asymmetry() {
    let harness = common::harness();

    // Without an auth cookie logout answers 202 up front.
    let response = TestRequest::get("/api/v1/ams/logout").send(app(&harness)).await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert!(response.set_cookies().is_empty());

    // With a session it retires the access entry and answers 200.
    let user = harness.active_user("out@example.com").await;
    let pair = harness.access.issue_session(&user).await.unwrap();

    let response = TestRequest::get("/api/v1/ams/logout")
        .header("cookie", &format!("ams_at={}", pair.access_token))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    // All four session cookies are cleared.
    assert_eq!(response.set_cookies().len(), 4);
}

#[tokio::test]
async fn test_token_endpoints_enforce_requestor_identity() {
    let harness = common::harness();
    let user = harness.active_user("mine@example.com").await;
    let pair = harness.access.issue_session(&user).await.unwrap();

    // Acting on someone else's tokens is forbidden.
    let other = Uuid::new_v4();
    let response = TestRequest::get(&format!("/api/v1/ams/users/{other}/tokens"))
        .header("authorization", &format!("Bearer {}", pair.access_token))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AM00-021");

    // Acting on one's own works.
    let response = TestRequest::get(&format!("/api/v1/ams/users/{}/tokens", user.id))
        .header("authorization", &format!("Bearer {}", pair.access_token))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_api_token_lifecycle_over_http() {
    let harness = common::harness();
    let user = harness.active_user("lifecycle@example.com").await;
    let pair = harness.access.issue_session(&user).await.unwrap();
    let bearer = format!("Bearer {}", pair.access_token);
    let base = format!("/api/v1/ams/users/{}/tokens", user.id);

    // Create a permanent token; the secret appears exactly once.
    let response = TestRequest::post(&base)
        .header("authorization", &bearer)
        .json(&json!({"ttl_seconds": 0}))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let created: serde_json::Value = response.json();
    let token_id = created["id"].as_str().unwrap().to_owned();
    let secret = created["secret"].as_str().unwrap().to_owned();

    // The listing carries no secrets.
    let response = TestRequest::get(&base)
        .header("authorization", &bearer)
        .send(app(&harness))
        .await;
    let listed: serde_json::Value = response.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert!(listed[0].get("secret").is_none());

    // The secret authenticates via the X-Api-Token channel.
    let response = TestRequest::get(&base)
        .header("x-api-token", &secret)
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    // Revoke, then the secret stops working.
    let response = TestRequest::put(&format!("{base}/{token_id}/revoke"))
        .header("authorization", &bearer)
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = TestRequest::get(&base)
        .header("x-api-token", &secret)
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    // Reactivate and delete.
    let response = TestRequest::put(&format!("{base}/{token_id}/activate"))
        .header("authorization", &bearer)
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = TestRequest::delete(&format!("{base}/{token_id}"))
        .header("authorization", &bearer)
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = TestRequest::get(&base)
        .header("authorization", &bearer)
        .send(app(&harness))
        .await;
    let listed: serde_json::Value = response.json();
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_quota_rejection_over_http() {
    let harness = common::harness();
    let user = harness.active_user("quota@example.com").await;
    let pair = harness.access.issue_session(&user).await.unwrap();
    let bearer = format!("Bearer {}", pair.access_token);
    let base = format!("/api/v1/ams/users/{}/tokens", user.id);

    // DEFAULT role allows a single permanent token.
    let response = TestRequest::post(&base)
        .header("authorization", &bearer)
        .json(&json!({"ttl_seconds": 0}))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = TestRequest::post(&base)
        .header("authorization", &bearer)
        .json(&json!({"ttl_seconds": 0}))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AM00-024");
    assert_eq!(body["status_code"], 409);
}

#[tokio::test]
async fn test_logout_other_sessions_over_http() {
    let harness = common::harness();
    let user = harness.active_user("others@example.com").await;

    let stale = harness.access.issue_session(&user).await.unwrap();
    let current = harness.access.issue_session(&user).await.unwrap();

    let response = TestRequest::get("/api/v1/ams/logout/other-sessions")
        .header(
            "cookie",
            &format!(
                "ams_at={}; ams_rt={}",
                current.access_token, current.refresh_token
            ),
        )
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    assert!(harness
        .store
        .fetch_auth(user.id, stale.access_uuid)
        .await
        .unwrap()
        .is_none());
    assert!(harness
        .store
        .fetch_auth(user.id, current.access_uuid)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_correlation_id_is_attached() {
    let harness = common::harness();
    let response = TestRequest::get("/api/v1/ams/health").send(app(&harness)).await;
    assert!(response.headers.contains_key("x-correlation-id"));
}

#[tokio::test]
async fn test_error_envelope_shape() {
    let harness = common::harness();
    let response = TestRequest::post("/api/v1/ams/signup")
        .json(&json!({"first_name": "", "last_name": "", "email": ""}))
        .send(app(&harness))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AM00-002");
    assert_eq!(body["status_code"], 400);
    assert!(body["title"].is_string());
    assert!(body["detail"].is_string());
}
