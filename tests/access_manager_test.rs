// ABOUTME: Integration tests for the access manager identity flows
// ABOUTME: Signup, verification, magic-link login, refresh, and logout
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use ams_server::errors::ErrorCode;
use ams_server::models::UserStatus;
use ams_server::services::dev::{OutboundEmailKind, RecordingBillingHook};
use ams_server::services::{AuditEvent, UserService};
use ams_server::store::combined_key;
use std::sync::Arc;

#[tokio::test]
async fn test_signup_sends_verification_and_audits() {
    let harness = common::harness();

    let user = harness
        .access
        .create_user("ada", "lovelace", "Ada@Example.com", false)
        .await
        .unwrap();

    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.status, UserStatus::Provisioned);

    let outbox = harness.email.outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].kind, OutboundEmailKind::Verification);
    assert_eq!(outbox[0].to, "ada@example.com");

    let events = harness.audit.events();
    assert_eq!(events[0].0, AuditEvent::UserAccountNew);
}

#[tokio::test]
async fn test_signup_with_disabled_verification_sends_nothing() {
    let harness = common::harness();
    harness
        .access
        .create_user("Ada", "Lovelace", "quiet@example.com", true)
        .await
        .unwrap();
    assert!(harness.email.outbox().is_empty());
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let harness = common::harness();
    harness
        .access
        .create_user("Ada", "Lovelace", "dup@example.com", true)
        .await
        .unwrap();
    let err = harness
        .access
        .create_user("Grace", "Hopper", "dup@example.com", true)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidUserEmail);
}

#[tokio::test]
async fn test_verification_activates_and_issues_live_session() {
    let harness = common::harness();
    harness
        .access
        .create_user("Ada", "Lovelace", "verify@example.com", false)
        .await
        .unwrap();
    let token = harness.email.last_token().unwrap();

    let pair = harness
        .access
        .validate_email_verification_code(&token)
        .await
        .unwrap();

    // The account is now ACTIVE and verified.
    let user = harness
        .users
        .user_by_email("verify@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.status, UserStatus::Active);
    assert!(user.email_verified);
    assert!(user.activated_at.is_some());

    // Both fresh entries are live in the store.
    assert!(harness
        .store
        .fetch_auth(pair.user_id, pair.access_uuid)
        .await
        .unwrap()
        .is_some());
    assert!(harness
        .store
        .fetch_auth(pair.user_id, pair.refresh_uuid)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_verification_token_is_single_use() {
    let harness = common::harness();
    harness
        .access
        .create_user("Ada", "Lovelace", "oneshot@example.com", false)
        .await
        .unwrap();
    let token = harness.email.last_token().unwrap();

    harness
        .access
        .validate_email_verification_code(&token)
        .await
        .unwrap();
    let err = harness
        .access
        .validate_email_verification_code(&token)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidVerificationToken);
}

#[tokio::test]
async fn test_magic_link_for_active_user() {
    let harness = common::harness();
    let user = harness.active_user("b@c.example").await;

    harness
        .access
        .create_initial_login_or_verification("b@c.example")
        .await
        .unwrap();

    let outbox = harness.email.outbox();
    assert_eq!(outbox[0].kind, OutboundEmailKind::Login);

    let token = harness.email.last_token().unwrap();
    let pair = harness.access.login_user(&token).await.unwrap();
    assert_eq!(pair.user_id, user.id);

    // Second use of the same link fails.
    let err = harness.access.login_user(&token).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidVerificationToken);

    // Login timestamps moved.
    let user = harness.users.user_by_id(user.id).await.unwrap().unwrap();
    assert!(user.last_login_at.is_some());
    assert!(user.last_fresh_login_at.is_some());
}

#[tokio::test]
async fn test_magic_link_for_provisioned_user_resends_verification() {
    let harness = common::harness();
    harness.provisioned_user("pending@example.com").await;

    harness
        .access
        .create_initial_login_or_verification("pending@example.com")
        .await
        .unwrap();

    let outbox = harness.email.outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].kind, OutboundEmailKind::Verification);
}

#[tokio::test]
async fn test_magic_link_uncaught_status() {
    let harness = common::harness();
    let mut user = harness.active_user("locked@example.com").await;
    user.transition_to(UserStatus::LockedOut).unwrap();
    harness.users.save_user(&user).await.unwrap();

    let err = harness
        .access
        .create_initial_login_or_verification("locked@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::UserStatusUncaught);
}

#[tokio::test]
async fn test_refresh_rotates_and_kills_old_refresh() {
    let harness = common::harness();
    let user = harness.active_user("rotate@example.com").await;
    let old = harness.access.issue_session(&user).await.unwrap();

    let new = harness
        .access
        .refresh(&old.refresh_token, Some(&old.access_token))
        .await
        .unwrap();

    // Fresh UUIDs on both sides.
    assert_ne!(new.access_uuid, old.access_uuid);
    assert_ne!(new.refresh_uuid, old.refresh_uuid);

    // The old refresh entry is gone, the new ones are live.
    assert!(harness
        .store
        .fetch_auth(user.id, old.refresh_uuid)
        .await
        .unwrap()
        .is_none());
    assert!(harness
        .store
        .fetch_auth(user.id, new.refresh_uuid)
        .await
        .unwrap()
        .is_some());

    // Replaying the old refresh token fails the cache-deletion check.
    let err = harness
        .access
        .refresh(&old.refresh_token, None)
        .await
        .unwrap_err();
    assert_eq!(
        err.code,
        ErrorCode::UnauthorizedRefreshTokenCacheDeletionFailure
    );
}

#[tokio::test]
async fn test_logout_retires_access_but_not_refresh() {
    let harness = common::harness();
    let user = harness.active_user("logout@example.com").await;
    let pair = harness.access.issue_session(&user).await.unwrap();

    harness.access.logout(&pair.access_token).await.unwrap();

    // Access entry revoked.
    assert!(harness
        .store
        .fetch_auth(user.id, pair.access_uuid)
        .await
        .unwrap()
        .is_none());
    // The refresh entry survives to its TTL.
    assert!(harness
        .store
        .fetch_auth(user.id, pair.refresh_uuid)
        .await
        .unwrap()
        .is_some());

    // Logout is audited.
    assert!(harness
        .audit
        .events()
        .iter()
        .any(|(e, id)| *e == AuditEvent::UserLogout && *id == user.id));

    // A second logout with the same token fails.
    let err = harness.access.logout(&pair.access_token).await.unwrap_err();
    assert_eq!(
        err.code,
        ErrorCode::UnauthorizedAccessTokenCacheDeletionFailure
    );
}

#[tokio::test]
async fn test_logout_other_sessions_spares_only_current() {
    let harness = common::harness();
    let user = harness.active_user("sessions@example.com").await;

    let old_one = harness.access.issue_session(&user).await.unwrap();
    let old_two = harness.access.issue_session(&user).await.unwrap();
    let current = harness.access.issue_session(&user).await.unwrap();

    let removed = harness
        .access
        .logout_other_sessions(user.id, &current.access_token, &current.refresh_token)
        .await
        .unwrap();
    assert_eq!(removed, 4);

    for uuid in [
        old_one.access_uuid,
        old_one.refresh_uuid,
        old_two.access_uuid,
        old_two.refresh_uuid,
    ] {
        assert!(harness.store.fetch_auth(user.id, uuid).await.unwrap().is_none());
    }
    assert!(harness
        .store
        .fetch_auth(user.id, current.access_uuid)
        .await
        .unwrap()
        .is_some());
    assert!(harness
        .store
        .fetch_auth(user.id, current.refresh_uuid)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_billing_linkage_is_offered_on_signup() {
    let harness = common::harness();
    let billing = Arc::new(RecordingBillingHook::new());
    let access = harness.access.clone().with_billing(billing.clone());

    access
        .create_user("Ada", "Lovelace", "billed@example.com", true)
        .await
        .unwrap();
    assert_eq!(billing.linked(), vec!["billed@example.com".to_owned()]);
}

#[tokio::test]
async fn test_issued_access_token_is_immediately_live() {
    let harness = common::harness();
    let user = harness.active_user("live@example.com").await;
    let pair = harness.access.issue_session(&user).await.unwrap();

    let descriptor = harness
        .authority
        .parse_access_string(&pair.access_token)
        .unwrap();
    assert_eq!(
        harness
            .store
            .fetch_auth(descriptor.user_id, descriptor.access_uuid)
            .await
            .unwrap(),
        Some(user.id)
    );

    let key = combined_key(descriptor.user_id, descriptor.access_uuid);
    assert_eq!(harness.store.delete_auth(&key).await.unwrap(), 1);
    assert_eq!(
        harness
            .store
            .fetch_auth(descriptor.user_id, descriptor.access_uuid)
            .await
            .unwrap(),
        None
    );
}
