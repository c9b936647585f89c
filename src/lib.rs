// ABOUTME: Library entry point for the access management service
// ABOUTME: Passwordless identity, two-tier sessions, and API token quotas
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

#![deny(unsafe_code)]

//! # AMS Server
//!
//! An identity and session management backend: passwordless login via
//! email magic links and OAuth providers, short-lived access tokens paired
//! with long-lived refresh tokens backed by an ephemeral revocation store,
//! and long-lived API tokens governed by per-role quotas.
//!
//! ## Architecture
//!
//! - **Token authority** (`auth`): mints and validates every bearer kind
//! - **Ephemeral store** (`store`): revocation-checked TTL store; deletion
//!   is the authoritative revocation mechanism
//! - **Access manager** (`access`): orchestrates signup, verification,
//!   login, refresh, logout, OAuth callbacks, and API token quotas
//! - **OAuth adapters** (`oauth`): pluggable per-provider capability set
//! - **Middleware gates** (`middleware`): per-route authentication policies
//!
//! Persistence of user records and API tokens is externally owned; the
//! core consumes the contracts in [`services`].

/// Access manager orchestrating every identity flow
pub mod access;

/// Token authority minting and validating bearer credentials
pub mod auth;

/// Environment-based configuration management
pub mod config;

/// Service-wide constants
pub mod constants;

/// Per-request context values
pub mod context;

/// Unified error handling with stable error codes
pub mod errors;

/// Structured logging setup
pub mod logging;

/// HTTP middleware policy gates
pub mod middleware;

/// Core data models
pub mod models;

/// OAuth provider adapters
pub mod oauth;

/// Shared server resources
pub mod resources;

/// HTTP routes under `/api/v1/ams`
pub mod routes;

/// Cookie handling
pub mod security;

/// Collaborator service contracts
pub mod services;

/// Ephemeral revocation and rate-limit store
pub mod store;
