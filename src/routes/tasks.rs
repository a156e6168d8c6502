// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Task handler routes for Cloud Tasks callbacks.
//!
//! These endpoints are called by Cloud Tasks, not directly by users.
//! `require_tasks_auth` is applied to them in `routes/mod.rs`.

use crate::services::tasks::{SubmitOrderPayload, SUBMIT_ORDER_PATH};
use crate::services::{OrderService, SubmitResult, VerifiedTaskPrincipal};
use crate::AppState;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Extension, Router,
};
use std::sync::Arc;

/// Task handler routes (called by Cloud Tasks).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(SUBMIT_ORDER_PATH, post(submit_order))
}

/// Submit one pending order to its vendor.
///
/// Any non-2xx makes Cloud Tasks retry, so only transient failures
/// return 500.
async fn submit_order(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<VerifiedTaskPrincipal>,
    Json(payload): Json<SubmitOrderPayload>,
) -> StatusCode {
    tracing::info!(
        order_id = %payload.order_id,
        caller = %caller.email,
        "Submitting order from Cloud Task"
    );

    match OrderService::new(&state)
        .submit_pending(&payload.order_id)
        .await
    {
        Ok(SubmitResult::Completed(status)) => {
            tracing::info!(
                order_id = %payload.order_id,
                status = status.as_str(),
                "Vendor submission complete"
            );
            StatusCode::OK
        }
        Ok(SubmitResult::Skipped) => StatusCode::OK,
        Err(e) => {
            tracing::error!(
                order_id = %payload.order_id,
                error = %e,
                "Vendor submission failed, will retry"
            );
            // Return 500 to trigger Cloud Tasks retry
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
