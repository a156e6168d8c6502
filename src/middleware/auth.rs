// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication and permission checks.
//!
//! The session JWT carries the user ID and the role the user had at login.
//! Permission checks resolve the role through the role cache, then reload
//! the user so deactivation and role changes take effect immediately.

use crate::error::{AppError, Result};
use crate::models::{Permission, User};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "order_desk_token";

/// Session lifetime.
pub const SESSION_TTL_SECS: usize = 12 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Role ID at login
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role_id: String,
}

/// A loaded, active user with their effective permissions.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: User,
    pub permissions: HashSet<Permission>,
}

impl Actor {
    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("Requires {}", permission)))
        }
    }
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, StatusCode> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) => token.to_string(),
            None => return Err(StatusCode::UNAUTHORIZED),
        }
    };

    let claims = decode_jwt(&token, &state.config.jwt_signing_key)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    if claims.sub.is_empty() || claims.role.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        role_id: claims.role,
    });

    Ok(next.run(request).await)
}

/// Check one permission and load the acting user.
///
/// The permission is first checked against the role in the token, so a
/// request lacking it is refused without a user lookup.
pub async fn authorize(state: &AppState, auth: &AuthUser, permission: Permission) -> Result<Actor> {
    require_permission(state, auth, permission).await?;

    let actor = load_actor(state, auth).await?;
    actor.require(permission)?;
    Ok(actor)
}

/// Check a permission against the role in the token only.
pub async fn require_permission(
    state: &AppState,
    auth: &AuthUser,
    permission: Permission,
) -> Result<()> {
    if state.permissions_for(&auth.role_id).await?.contains(&permission) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Requires {}", permission)))
    }
}

/// Load the acting user with the permissions of their current role.
pub async fn load_actor(state: &AppState, auth: &AuthUser) -> Result<Actor> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .filter(|u| u.active)
        .ok_or(AppError::InvalidToken)?;

    let permissions = state.permissions_for(&user.role_id).await?;
    Ok(Actor { user, permissions })
}

/// Decode and validate a session token.
pub fn decode_jwt(token: &str, signing_key: &[u8]) -> anyhow::Result<Claims> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);
    Ok(decode::<Claims>(token, &key, &validation)?.claims)
}

/// Create a JWT for a user session.
pub fn create_jwt(user_id: &str, role_id: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role_id.to_string(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
