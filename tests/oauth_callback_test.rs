// ABOUTME: Integration tests for the OAuth callback protocol
// ABOUTME: CSRF protection, redirect decoding, and account linking paths
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::collections::HashMap;

use ams_server::errors::ErrorCode;
use ams_server::models::UserStatus;
use ams_server::oauth::AdapterRegistry;
use ams_server::services::{AuditEvent, UserService};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

fn sso_harness(email: &str, verified: bool) -> common::Harness {
    let mut registry = AdapterRegistry::new();
    registry.register(Box::new(common::FakeProvider::new("fake", email, verified)));
    common::harness_with_registry(registry)
}

fn callback_inputs(state: &str, cookie: &str) -> (HashMap<String, String>, HashMap<String, String>) {
    let mut query = HashMap::new();
    query.insert("state".to_owned(), state.to_owned());
    query.insert("code".to_owned(), "authcode".to_owned());
    let mut cookies = HashMap::new();
    cookies.insert("fake_oauth_state".to_owned(), cookie.to_owned());
    (query, cookies)
}

#[tokio::test]
async fn test_missing_state_cookie_rejected() {
    let harness = sso_harness("sso@example.com", true);
    let (query, _) = callback_inputs("XYZ", "XYZ");

    let err = harness
        .access
        .handle_provider_callback("fake", &query, &HashMap::new())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ProviderCookieNotFound);
}

#[tokio::test]
async fn test_state_mismatch_rejected() {
    let harness = sso_harness("sso@example.com", true);
    let (query, cookies) = callback_inputs("ABC", "XYZ");

    let err = harness
        .access
        .handle_provider_callback("fake", &query, &cookies)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ProviderInvalidProtectionStateToken);
}

#[tokio::test]
async fn test_unknown_provider_rejected() {
    let harness = sso_harness("sso@example.com", true);
    let (query, cookies) = callback_inputs("XYZ", "XYZ");

    let err = harness
        .access
        .handle_provider_callback("nonesuch", &query, &cookies)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequest);
}

#[tokio::test]
async fn test_first_sso_login_creates_active_verified_account() {
    let harness = sso_harness("fresh@example.com", true);
    let (query, cookies) = callback_inputs("XYZ", "XYZ");

    let login = harness
        .access
        .handle_provider_callback("fake", &query, &cookies)
        .await
        .unwrap();

    assert_eq!(login.state_cookie_name, "fake_oauth_state");
    assert!(login.redirect.is_none());

    let user = harness
        .users
        .user_by_email("fresh@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.status, UserStatus::Active);
    assert!(user.email_verified);

    // No verification email went out for the SSO signup.
    assert!(harness.email.outbox().is_empty());

    // Session entries are live.
    assert!(harness
        .store
        .fetch_auth(login.pair.user_id, login.pair.access_uuid)
        .await
        .unwrap()
        .is_some());

    // New-account and login events both audited.
    let events: Vec<_> = harness.audit.events().into_iter().map(|(e, _)| e).collect();
    assert!(events.contains(&AuditEvent::UserAccountNew));
    assert!(events.contains(&AuditEvent::UserAccountNewSso));
    assert!(events.contains(&AuditEvent::UserLoginSso));
}

#[tokio::test]
async fn test_existing_user_adopts_provider_verification() {
    let harness = sso_harness("known@example.com", true);
    let user = harness.provisioned_user("known@example.com").await;
    assert!(!user.email_verified);

    let (query, cookies) = callback_inputs("XYZ", "XYZ");
    let login = harness
        .access
        .handle_provider_callback("fake", &query, &cookies)
        .await
        .unwrap();
    assert_eq!(login.pair.user_id, user.id);

    let user = harness.users.user_by_id(user.id).await.unwrap().unwrap();
    assert!(user.email_verified);
    assert!(user.last_fresh_login_at.is_some());
}

#[tokio::test]
async fn test_unverified_provider_email_is_not_adopted() {
    let harness = sso_harness("shaky@example.com", false);
    harness.active_user("shaky@example.com").await;

    let mut expected = harness
        .users
        .user_by_email("shaky@example.com")
        .await
        .unwrap()
        .unwrap();
    expected.email_verified = false;
    expected.email_verified_at = None;
    harness.users.save_user(&expected).await.unwrap();

    let (query, cookies) = callback_inputs("XYZ", "XYZ");
    harness
        .access
        .handle_provider_callback("fake", &query, &cookies)
        .await
        .unwrap();

    let user = harness
        .users
        .user_by_email("shaky@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(!user.email_verified);
}

#[tokio::test]
async fn test_redirect_suffix_round_trip() {
    let harness = sso_harness("redir@example.com", true);

    let cookie_value = format!("XYZ.{}", BASE64.encode("https://app.example.com/after"));
    let (query, cookies) = callback_inputs("XYZ", &cookie_value);

    let login = harness
        .access
        .handle_provider_callback("fake", &query, &cookies)
        .await
        .unwrap();
    assert_eq!(
        login.redirect.as_deref(),
        Some("https://app.example.com/after")
    );
}

#[tokio::test]
async fn test_begin_provider_login_encodes_redirect() {
    let harness = sso_harness("begin@example.com", true);

    let start = harness
        .access
        .begin_provider_login("fake", Some("https://app.example.com/dash"))
        .unwrap();

    assert!(start.auth_url.starts_with("https://sso.example.com/auth?state="));
    assert_eq!(start.cookie_name, "fake_oauth_state");
    assert_eq!(start.cookie_max_age_secs, 1_200);

    let (nonce, suffix) = start.cookie_value.split_once('.').unwrap();
    assert!(start.auth_url.ends_with(nonce));
    assert_eq!(
        BASE64.decode(suffix).unwrap(),
        b"https://app.example.com/dash"
    );
}
