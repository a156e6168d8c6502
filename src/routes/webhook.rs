// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook routes for vendor postbacks.
//!
//! Vendors push later status changes (e.g. a chargeback turning an approved
//! order into a decline) to `/webhook/{vendor}`, signed with a per-vendor key.

use crate::error::AppError;
use crate::services::postback::{self, SIGNATURE_HEADER};
use crate::services::{OrderService, PostbackResult};
use crate::vendors::VendorKind;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use std::sync::Arc;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook/{vendor}", post(handle_postback))
}

/// Handle a vendor postback (POST).
///
/// The signature covers the raw body, so the body is read as bytes and
/// parsed only after verification.
async fn handle_postback(
    State(state): State<Arc<AppState>>,
    Path(vendor): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let Ok(vendor) = vendor.parse::<VendorKind>() else {
        tracing::warn!(vendor = %vendor, "Postback for unknown vendor");
        return StatusCode::NOT_FOUND;
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    if !postback::verify(&state.config.postback_signing_key, vendor, &body, signature) {
        tracing::warn!(
            vendor = %vendor,
            has_signature = !signature.is_empty(),
            "Security Alert: Postback signature mismatch"
        );
        return StatusCode::UNAUTHORIZED;
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(vendor = %vendor, error = %e, "Failed to parse postback body");
            return StatusCode::BAD_REQUEST;
        }
    };

    match OrderService::new(&state)
        .apply_postback(vendor, &payload)
        .await
    {
        Ok(PostbackResult::Applied(_))
        | Ok(PostbackResult::UnknownOrder)
        | Ok(PostbackResult::Ignored(_)) => StatusCode::OK,
        // Non-2xx makes the vendor deliver again once the submission settles.
        Ok(PostbackResult::Deferred) => StatusCode::CONFLICT,
        Err(AppError::BadRequest(reason)) => {
            tracing::warn!(vendor = %vendor, reason = %reason, "Rejected postback");
            StatusCode::BAD_REQUEST
        }
        Err(e) => {
            tracing::error!(vendor = %vendor, error = %e, "Failed to apply postback");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
