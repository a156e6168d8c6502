// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers and router assembly.

pub mod auth;
pub mod groups;
pub mod orders;
pub mod roles;
pub mod tasks;
pub mod users;
pub mod webhook;

use crate::middleware::{add_security_headers, require_auth, require_tasks_auth};
use crate::AppState;
use axum::http::{header, request::Parts, HeaderValue, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub build_id: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        build_id: option_env!("BUILD_ID").unwrap_or("unknown"),
    })
}

/// Local dev servers are always allowed alongside the configured frontend.
fn is_allowed_origin(origin: &str, frontend_url: &str) -> bool {
    origin == frontend_url
        || origin.starts_with("http://localhost")
        || origin.starts_with("http://127.0.0.1")
}

fn cors_layer(frontend_url: String) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| is_allowed_origin(origin, &frontend_url))
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Build the complete router.
///
/// * `/health`, `/auth/*` and `/webhook/{vendor}` are public; postbacks carry
///   their own signature.
/// * `/tasks/*` only accepts Cloud Tasks OIDC tokens.
/// * `/api/*` requires a session token.
pub fn create_router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/health", get(health_check))
        .merge(auth::routes())
        .merge(webhook::routes());

    let task_handlers = tasks::routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_tasks_auth,
    ));

    let api = users::routes()
        .merge(roles::routes())
        .merge(groups::routes())
        .merge(orders::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(task_handlers)
        .merge(api)
        .layer(middleware::from_fn(add_security_headers))
        .layer(cors_layer(state.config.frontend_url.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_origins() {
        let frontend = "https://orders.example.com";
        assert!(is_allowed_origin(frontend, frontend));
        assert!(is_allowed_origin("http://localhost:5173", frontend));
        assert!(is_allowed_origin("http://127.0.0.1:8080", frontend));
        assert!(!is_allowed_origin("https://orders.example.com.evil.net", frontend));
        assert!(!is_allowed_origin("https://localhost", frontend));
    }
}
