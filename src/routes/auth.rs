// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password login and logout.

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::models::{user::normalize_email, Permission, UserView};
use crate::services::password::verify_password;
use crate::time_utils::now_sortable;
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Verified against when the email is unknown, so both failure paths cost
/// one PBKDF2 run.
const DUMMY_HASH: &str =
    "pbkdf2_sha256$100000$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Auth routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserView,
    pub permissions: Vec<Permission>,
}

/// Exchange email + password for a session token (also set as a cookie).
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("email and password are required".to_string()));
    }

    let user = state.db.get_user_by_email(&email).await?;

    let stored_hash = user
        .as_ref()
        .map(|u| u.password_hash.as_str())
        .unwrap_or(DUMMY_HASH);
    let password_ok = verify_password(&req.password, stored_hash);

    let mut user = match user {
        Some(user) if password_ok && user.active => user,
        Some(user) if password_ok => {
            tracing::warn!(user_id = %user.id, "Login attempt for inactive user");
            return Err(AppError::Unauthorized);
        }
        _ => {
            tracing::info!("Failed login attempt");
            return Err(AppError::Unauthorized);
        }
    };

    let now = now_sortable();
    user.last_login_at = Some(now.clone());
    user.updated_at = now;
    state.db.upsert_user(&user).await?;

    let token = create_jwt(&user.id, &user.role_id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let mut permissions: Vec<Permission> = state
        .permissions_for(&user.role_id)
        .await?
        .into_iter()
        .collect();
    permissions.sort_by_key(|p| p.as_str());

    tracing::info!(user_id = %user.id, role = %user.role_id, "User logged in");

    let cookie = session_cookie(
        token.clone(),
        state.config.frontend_url.starts_with("https://"),
    );

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token,
            user: UserView::from(&user),
            permissions,
        }),
    ))
}

/// Clear the session cookie. Tokens are stateless; the client drops its copy.
///
/// The removal cookie repeats the creation attributes so browsers match it.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let secure = state.config.frontend_url.starts_with("https://");
    (
        jar.remove(session_cookie(String::new(), secure)),
        StatusCode::NO_CONTENT,
    )
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64))
        .build()
}
