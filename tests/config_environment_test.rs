// ABOUTME: Tests for environment-variable configuration parsing
// ABOUTME: Serialised because they mutate process-wide environment state
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use ams_server::config::environment::{Environment, ServerConfig};
use serial_test::serial;
use std::env;

fn clear_config_env() {
    for key in [
        "ENVIRONMENT",
        "HTTP_PORT",
        "PUBLIC_BASE_URL",
        "AMS_ACCESS_SECRET",
        "AMS_REFRESH_SECRET",
        "ACCESS_TOKEN_TTL_SECS",
        "REFRESH_TOKEN_TTL_SECS",
        "EPHEMERAL_TOKEN_TTL_SECS",
        "COOKIE_PREFIX",
        "REDIS_URL",
        "GOOGLE_CLIENT_ID",
        "GOOGLE_CLIENT_SECRET",
        "GOOGLE_REDIRECT_URI",
        "GITHUB_CLIENT_ID",
        "GITHUB_CLIENT_SECRET",
        "GITHUB_REDIRECT_URI",
    ] {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_config_env();

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.http_port, 8087);
    assert_eq!(config.environment, Environment::Local);
    assert_eq!(config.tokens.access_ttl_secs, 900);
    assert_eq!(config.tokens.refresh_ttl_secs, 604_800);
    assert_eq!(config.tokens.ephemeral_ttl_secs, 600);
    assert!(config.redis_url.is_none());
    assert!(config.oauth.google.is_none());
    // Secrets are generated when unset outside production.
    assert!(!config.tokens.access_secret.is_empty());
    assert_ne!(config.tokens.access_secret, config.tokens.refresh_secret);
}

#[test]
#[serial]
fn test_explicit_values_override_defaults() {
    clear_config_env();
    env::set_var("HTTP_PORT", "9090");
    env::set_var("ENVIRONMENT", "testing");
    env::set_var("ACCESS_TOKEN_TTL_SECS", "120");
    env::set_var("COOKIE_PREFIX", "sess");
    env::set_var("GOOGLE_CLIENT_ID", "gid");
    env::set_var("GOOGLE_CLIENT_SECRET", "gsecret");

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.http_port, 9090);
    assert_eq!(config.environment, Environment::Testing);
    assert_eq!(config.tokens.access_ttl_secs, 120);
    assert_eq!(config.cookies.prefix, "sess");

    let google = config.oauth.google.unwrap();
    assert_eq!(google.client_id, "gid");
    // The redirect URI falls back to the service callback path.
    assert!(google.redirect_uri.ends_with("/api/v1/ams/oauth/google/callback"));

    clear_config_env();
}

#[test]
#[serial]
fn test_production_requires_secrets() {
    clear_config_env();
    env::set_var("ENVIRONMENT", "production");

    assert!(ServerConfig::from_env().is_err());

    env::set_var("AMS_ACCESS_SECRET", "a".repeat(64));
    env::set_var("AMS_REFRESH_SECRET", "b".repeat(64));
    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.environment, Environment::Production);

    clear_config_env();
}

#[test]
#[serial]
fn test_invalid_port_is_rejected() {
    clear_config_env();
    env::set_var("HTTP_PORT", "not-a-port");
    assert!(ServerConfig::from_env().is_err());
    clear_config_env();
}
