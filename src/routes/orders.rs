// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Order submission and history, plus the vendor form schemas.

use crate::error::{AppError, Result};
use crate::middleware::auth::{load_actor, require_permission, AuthUser};
use crate::models::{Order, OrderForm, Permission, ValidationStatus};
use crate::services::OrderService;
use crate::vendors::{VendorKind, VendorSchema};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;

/// Order routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/vendors", get(list_vendors))
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/{id}", get(get_order))
}

// ─── Vendors ─────────────────────────────────────────────────

async fn list_vendors(
    State(state): State<Arc<AppState>>,
    Extension(_auth): Extension<AuthUser>,
) -> Json<Vec<VendorSchema>> {
    Json(
        VendorKind::ALL
            .into_iter()
            .map(|kind| VendorSchema::for_vendor(kind, state.vendor_gateway.is_configured(kind)))
            .collect(),
    )
}

// ─── Orders ──────────────────────────────────────────────────

/// Validate an order and queue it for vendor submission.
///
/// Orders failing the vendor's rules are still stored (status `invalid`)
/// and returned with 201 so the user sees every violation at once.
async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(form): Json<OrderForm>,
) -> Result<(StatusCode, Json<Order>)> {
    require_permission(&state, &auth, Permission::SubmitOrders).await?;
    form.validate()?;

    let actor = load_actor(&state, &auth).await?;
    let order = OrderService::new(&state).create_order(&actor, form).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Deserialize)]
struct OrdersQuery {
    vendor: Option<String>,
    status: Option<String>,
    /// Opaque cursor from a previous page's `next_cursor`
    cursor: Option<String>,
    limit: Option<u32>,
}

#[derive(Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
    pub next_cursor: Option<String>,
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<OrdersQuery>,
) -> Result<Json<OrdersResponse>> {
    require_order_visibility(&state, &auth).await?;

    let vendor = params
        .vendor
        .as_deref()
        .map(str::parse::<VendorKind>)
        .transpose()
        .map_err(AppError::BadRequest)?;
    let status = params
        .status
        .as_deref()
        .map(str::parse::<ValidationStatus>)
        .transpose()
        .map_err(AppError::BadRequest)?;
    let before = parse_cursor(params.cursor.as_deref())?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    tracing::debug!(
        user_id = %auth.user_id,
        vendor = ?vendor,
        status = ?status,
        cursor = ?before,
        limit,
        "Listing orders"
    );

    let actor = load_actor(&state, &auth).await?;
    let orders = OrderService::new(&state)
        .list_orders(&actor, vendor, status, before, limit)
        .await?;

    let next_cursor = if orders.len() as u32 == limit {
        orders.last().map(|o| encode_cursor(&o.created_at))
    } else {
        None
    };

    Ok(Json(OrdersResponse {
        orders,
        next_cursor,
    }))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>> {
    require_order_visibility(&state, &auth).await?;

    let actor = load_actor(&state, &auth).await?;
    let order = OrderService::new(&state).get_order(&actor, &order_id).await?;
    Ok(Json(order))
}

/// Either order-viewing permission, checked before any user lookup.
async fn require_order_visibility(state: &AppState, auth: &AuthUser) -> Result<()> {
    let permissions = state.permissions_for(&auth.role_id).await?;
    if permissions.contains(&Permission::ViewOrders)
        || permissions.contains(&Permission::ViewAllOrders)
    {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Requires {} or {}",
            Permission::ViewOrders,
            Permission::ViewAllOrders
        )))
    }
}

fn parse_cursor(cursor: Option<&str>) -> Result<Option<String>> {
    cursor
        .map(|raw| {
            let invalid_cursor = || AppError::BadRequest("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let created_at = String::from_utf8(decoded).map_err(|_| invalid_cursor())?;
            chrono::DateTime::parse_from_rfc3339(&created_at).map_err(|_| invalid_cursor())?;
            Ok(created_at)
        })
        .transpose()
}

fn encode_cursor(created_at: &str) -> String {
    URL_SAFE_NO_PAD.encode(created_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trip() {
        let ts = "2026-03-01T12:00:00.000000123Z";
        let cursor = encode_cursor(ts);
        assert_eq!(parse_cursor(Some(&cursor)).unwrap().as_deref(), Some(ts));
    }

    #[test]
    fn malformed_cursor_rejected() {
        assert!(parse_cursor(Some("!!!")).is_err());
        let not_a_time = URL_SAFE_NO_PAD.encode("yesterday");
        assert!(parse_cursor(Some(&not_a_time)).is_err());
        assert!(parse_cursor(None).unwrap().is_none());
    }
}
