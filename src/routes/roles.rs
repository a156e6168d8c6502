// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role administration.

use crate::error::{AppError, Result};
use crate::middleware::auth::{authorize, AuthUser};
use crate::models::{Permission, Role};
use crate::services::password::new_id;
use crate::time_utils::now_sortable;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Role routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/roles", get(list_roles).post(create_role))
        .route(
            "/api/roles/{id}",
            get(get_role).put(update_role).delete(delete_role),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub permissions: Option<Vec<Permission>>,
}

async fn list_roles(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Role>>> {
    authorize(&state, &auth, Permission::ManageRoles).await?;
    Ok(Json(state.db.list_roles().await?))
}

async fn get_role(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(role_id): Path<String>,
) -> Result<Json<Role>> {
    authorize(&state, &auth, Permission::ManageRoles).await?;
    Ok(Json(find_role(&state, &role_id).await?))
}

async fn create_role(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>)> {
    authorize(&state, &auth, Permission::ManageRoles).await?;
    req.validate()?;

    let name = req.name.trim().to_string();
    ensure_name_free(&state, &name, None).await?;

    let now = now_sortable();
    let role = Role {
        id: new_id("role")?,
        name,
        description: req.description,
        permissions: dedup_permissions(req.permissions),
        built_in: false,
        created_at: now.clone(),
        updated_at: now,
    };
    state.db.upsert_role(&role).await?;

    tracing::info!(role_id = %role.id, name = %role.name, created_by = %auth.user_id, "Role created");
    Ok((StatusCode::CREATED, Json(role)))
}

async fn update_role(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(role_id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<Role>> {
    authorize(&state, &auth, Permission::ManageRoles).await?;
    req.validate()?;

    let mut role = find_role(&state, &role_id).await?;

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        if !name.eq_ignore_ascii_case(&role.name) {
            ensure_name_free(&state, &name, Some(&role.id)).await?;
        }
        role.name = name;
    }
    if let Some(description) = req.description {
        role.description = description;
    }
    if let Some(permissions) = req.permissions {
        let permissions = dedup_permissions(permissions);
        if role.built_in && permissions.len() != Permission::ALL.len() {
            return Err(AppError::BadRequest(
                "Permissions of a built-in role cannot be changed".to_string(),
            ));
        }
        role.permissions = permissions;
    }

    role.updated_at = now_sortable();
    state.db.upsert_role(&role).await?;
    state.role_cache.invalidate(&role.id);

    tracing::info!(role_id = %role.id, updated_by = %auth.user_id, "Role updated");
    Ok(Json(role))
}

async fn delete_role(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(role_id): Path<String>,
) -> Result<StatusCode> {
    authorize(&state, &auth, Permission::ManageRoles).await?;

    let role = find_role(&state, &role_id).await?;
    if role.built_in {
        return Err(AppError::BadRequest("Built-in roles cannot be deleted".to_string()));
    }
    if state.db.role_in_use(&role.id).await? {
        return Err(AppError::Conflict(format!(
            "Role {} is assigned to users",
            role.name
        )));
    }

    state.db.delete_role(&role.id).await?;
    state.role_cache.invalidate(&role.id);

    tracing::info!(role_id = %role.id, deleted_by = %auth.user_id, "Role deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_role(state: &AppState, role_id: &str) -> Result<Role> {
    state
        .db
        .get_role(role_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Role {}", role_id)))
}

/// Role names are unique, ignoring case.
async fn ensure_name_free(state: &AppState, name: &str, except: Option<&str>) -> Result<()> {
    let taken = state
        .db
        .list_roles()
        .await?
        .iter()
        .any(|r| r.name.eq_ignore_ascii_case(name) && Some(r.id.as_str()) != except);
    if taken {
        return Err(AppError::Conflict(format!("Role {} already exists", name)));
    }
    Ok(())
}

/// Sorted, without duplicates.
fn dedup_permissions(mut permissions: Vec<Permission>) -> Vec<Permission> {
    permissions.sort_by_key(|p| p.as_str());
    permissions.dedup();
    permissions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissions_are_deduplicated() {
        let perms = dedup_permissions(vec![
            Permission::ViewOrders,
            Permission::SubmitOrders,
            Permission::ViewOrders,
        ]);
        assert_eq!(perms, vec![Permission::SubmitOrders, Permission::ViewOrders]);
    }
}
