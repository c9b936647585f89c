// ABOUTME: Router assembly for the versioned access management surface
// ABOUTME: Open identity routes plus gated per-user token routes
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

//! HTTP routes for the access management service, versioned under
//! `/api/v1/ams`.

/// Identity endpoint handlers
pub mod auth;
/// API token and session endpoints
pub mod tokens;
/// Request and response DTOs
pub mod types;

use axum::extract::State;
use axum::http::HeaderName;
use axum::routing::{delete, get, post, put};
use axum::{middleware as axum_middleware, Json, Router};
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::constants::{headers, routes as route_constants};
use crate::middleware::auth::gate_api_token_or_active_jwt;
use crate::resources::ServerResources;
use types::HealthResponse;

/// Assemble the full service router
#[must_use]
pub fn router(resources: Arc<ServerResources>) -> Router {
    let correlation_id = HeaderName::from_static(headers::CORRELATION_ID);

    let open = Router::new()
        .route("/health", get(health))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login_begin).get(auth::login_complete))
        .route("/logout", get(auth::logout))
        .route("/verify/email", get(auth::verify_email))
        .route("/tokens/refresh", post(auth::refresh))
        .route("/oauth/:provider/login", get(auth::oauth_login))
        .route("/oauth/:provider/callback", get(auth::oauth_callback));

    let per_user = Router::new()
        .route(
            "/users/:user_id/tokens",
            post(tokens::create).get(tokens::list),
        )
        .route(
            "/users/:user_id/tokens/thresholds",
            get(tokens::thresholds),
        )
        .route("/users/:user_id/tokens/:token_id", delete(tokens::delete))
        .route(
            "/users/:user_id/tokens/:token_id/activate",
            put(tokens::activate),
        )
        .route(
            "/users/:user_id/tokens/:token_id/revoke",
            put(tokens::revoke),
        )
        .route("/logout/other-sessions", get(tokens::logout_other_sessions))
        .layer(axum_middleware::from_fn_with_state(
            resources.clone(),
            gate_api_token_or_active_jwt,
        ));

    Router::new()
        .nest(route_constants::API_BASE, open.merge(per_user))
        .layer(PropagateRequestIdLayer::new(correlation_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(correlation_id, MakeRequestUuid))
        .with_state(resources)
}

/// GET `/health`: service and store status
async fn health(State(resources): State<Arc<ServerResources>>) -> Json<HealthResponse> {
    let store = resources.access.store();
    let store_healthy = store.health_check().await.is_ok();
    Json(HealthResponse {
        status: if store_healthy { "ok" } else { "degraded" },
        store_backend: store.backend_name(),
        store_healthy,
    })
}
