// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User administration and the current user's profile.

use crate::error::{AppError, Result};
use crate::middleware::auth::{authorize, load_actor, AuthUser};
use crate::models::{user::normalize_email, Permission, User, UserView};
use crate::services::password::{check_policy, hash_password, new_id, verify_password};
use crate::time_utils::now_sortable;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// User routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/me/password", put(change_own_password))
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/users/{id}/password", put(set_user_password))
}

// ─── Current User ────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    pub user: UserView,
    pub permissions: Vec<Permission>,
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let actor = load_actor(&state, &auth).await?;

    let mut permissions: Vec<Permission> = actor.permissions.into_iter().collect();
    permissions.sort_by_key(|p| p.as_str());

    Ok(Json(MeResponse {
        user: UserView::from(&actor.user),
        permissions,
    }))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

async fn change_own_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    check_policy(&req.new_password)?;

    let mut user = load_actor(&state, &auth).await?.user;
    if !verify_password(&req.current_password, &user.password_hash) {
        return Err(AppError::Forbidden("Current password is incorrect".to_string()));
    }

    user.password_hash = hash_password(&req.new_password)?;
    user.updated_at = now_sortable();
    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %user.id, "User changed own password");
    Ok(StatusCode::NO_CONTENT)
}

// ─── Administration ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email, length(max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub password: String,
    #[validate(length(min = 1))]
    pub role_id: String,
    #[serde(default)]
    pub group_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email, length(max = 254))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub role_id: Option<String>,
    pub group_ids: Option<Vec<String>>,
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct SetPasswordRequest {
    pub password: String,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<UserView>>> {
    authorize(&state, &auth, Permission::ManageUsers).await?;

    let users = state.db.list_users().await?;
    Ok(Json(users.iter().map(UserView::from).collect()))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<UserView>> {
    authorize(&state, &auth, Permission::ManageUsers).await?;

    let user = find_user(&state, &user_id).await?;
    Ok(Json(UserView::from(&user)))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserView>)> {
    authorize(&state, &auth, Permission::ManageUsers).await?;
    req.validate()?;
    check_policy(&req.password)?;

    let email = normalize_email(&req.email);
    ensure_email_free(&state, &email, None).await?;
    ensure_role_exists(&state, &req.role_id).await?;
    let group_ids = checked_groups(&state, req.group_ids).await?;

    let now = now_sortable();
    let user = User {
        id: new_id("usr")?,
        email,
        name: req.name.trim().to_string(),
        password_hash: hash_password(&req.password)?,
        role_id: req.role_id,
        group_ids,
        active: true,
        created_at: now.clone(),
        updated_at: now,
        last_login_at: None,
    };
    state.db.upsert_user(&user).await?;

    tracing::info!(
        user_id = %user.id,
        role = %user.role_id,
        created_by = %auth.user_id,
        "User created"
    );
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserView>> {
    let actor = authorize(&state, &auth, Permission::ManageUsers).await?;
    req.validate()?;

    if actor.user.id == user_id && req.active == Some(false) {
        return Err(AppError::BadRequest("You cannot deactivate yourself".to_string()));
    }

    let mut user = find_user(&state, &user_id).await?;

    if let Some(email) = req.email {
        let email = normalize_email(&email);
        if email != user.email {
            ensure_email_free(&state, &email, Some(&user.id)).await?;
            user.email = email;
        }
    }
    if let Some(name) = req.name {
        user.name = name.trim().to_string();
    }
    if let Some(role_id) = req.role_id {
        ensure_role_exists(&state, &role_id).await?;
        user.role_id = role_id;
    }
    if let Some(group_ids) = req.group_ids {
        user.group_ids = checked_groups(&state, group_ids).await?;
    }
    if let Some(active) = req.active {
        user.active = active;
    }

    user.updated_at = now_sortable();
    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %user.id, updated_by = %auth.user_id, "User updated");
    Ok(Json(UserView::from(&user)))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<StatusCode> {
    let actor = authorize(&state, &auth, Permission::ManageUsers).await?;

    if actor.user.id == user_id {
        return Err(AppError::BadRequest("You cannot delete yourself".to_string()));
    }

    find_user(&state, &user_id).await?;
    state.db.delete_user(&user_id).await?;

    tracing::info!(user_id = %user_id, deleted_by = %auth.user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn set_user_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(req): Json<SetPasswordRequest>,
) -> Result<StatusCode> {
    authorize(&state, &auth, Permission::ManageUsers).await?;
    check_policy(&req.password)?;

    let mut user = find_user(&state, &user_id).await?;
    user.password_hash = hash_password(&req.password)?;
    user.updated_at = now_sortable();
    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %user.id, set_by = %auth.user_id, "Password set by administrator");
    Ok(StatusCode::NO_CONTENT)
}

// ─── Helpers ─────────────────────────────────────────────────

async fn find_user(state: &AppState, user_id: &str) -> Result<User> {
    state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))
}

async fn ensure_email_free(state: &AppState, email: &str, except: Option<&str>) -> Result<()> {
    match state.db.get_user_by_email(email).await? {
        Some(existing) if Some(existing.id.as_str()) != except => Err(AppError::Conflict(
            format!("A user with email {} already exists", email),
        )),
        _ => Ok(()),
    }
}

async fn ensure_role_exists(state: &AppState, role_id: &str) -> Result<()> {
    match state.role(role_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::BadRequest(format!("Unknown role {}", role_id))),
    }
}

/// Deduplicate group IDs and check each one exists.
async fn checked_groups(state: &AppState, group_ids: Vec<String>) -> Result<Vec<String>> {
    let mut checked: Vec<String> = Vec::with_capacity(group_ids.len());
    for group_id in group_ids {
        if checked.contains(&group_id) {
            continue;
        }
        if state.db.get_group(&group_id).await?.is_none() {
            return Err(AppError::BadRequest(format!("Unknown group {}", group_id)));
        }
        checked.push(group_id);
    }
    Ok(checked)
}
