// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Tasks authentication middleware.
//!
//! A task request must name the order submission queue in
//! `X-CloudTasks-QueueName` and carry a Google-signed OIDC token for our task
//! service account. The header alone is trivially forged from outside; the
//! token is what actually authenticates the call.

use crate::config::ORDER_QUEUE_NAME;
use crate::services::google_oidc::OidcError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

const QUEUE_NAME_HEADER: &str = "x-cloudtasks-queuename";

/// Require the queue header and a valid task OIDC token.
///
/// On success the verified principal is added to the request extensions.
pub async fn require_tasks_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !from_order_queue(request.headers()) {
        tracing::warn!(
            queue = ?request.headers().get(QUEUE_NAME_HEADER),
            path = %request.uri().path(),
            "Blocked task request from unexpected queue"
        );
        return Err(StatusCode::FORBIDDEN);
    }

    let principal = state
        .google_oidc_verifier
        .verify_cloud_tasks_token(request.headers().get(header::AUTHORIZATION))
        .await
        .map_err(|err| match err {
            OidcError::Forbidden(reason) => {
                tracing::warn!(reason = %reason, "Blocked task request: invalid OIDC token");
                StatusCode::FORBIDDEN
            }
            // 500 so Cloud Tasks retries once Google's keys are reachable
            OidcError::Transient(reason) => {
                tracing::error!(reason = %reason, "Task OIDC verification unavailable");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    tracing::debug!(email = %principal.email, subject = %principal.subject, "Task caller verified");
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

fn from_order_queue(headers: &HeaderMap) -> bool {
    headers
        .get(QUEUE_NAME_HEADER)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|name| name == ORDER_QUEUE_NAME)
}
