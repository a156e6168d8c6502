// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Group administration and membership.

use crate::error::{AppError, Result};
use crate::middleware::auth::{authorize, AuthUser};
use crate::models::{Group, Permission, UserView};
use crate::services::password::new_id;
use crate::time_utils::now_sortable;
use crate::vendors::VendorKind;
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

/// Group routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/groups", get(list_groups).post(create_group))
        .route(
            "/api/groups/{id}",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route(
            "/api/groups/{id}/members/{user_id}",
            put(add_member).delete(remove_member),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    #[serde(default)]
    pub allowed_vendors: Vec<VendorKind>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGroupRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub allowed_vendors: Option<Vec<VendorKind>>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<UserView>,
}

async fn list_groups(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Group>>> {
    authorize(&state, &auth, Permission::ManageGroups).await?;
    Ok(Json(state.db.list_groups().await?))
}

async fn get_group(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(group_id): Path<String>,
) -> Result<Json<GroupDetail>> {
    authorize(&state, &auth, Permission::ManageGroups).await?;

    let group = find_group(&state, &group_id).await?;
    let members = state.db.list_users_in_group(&group.id).await?;

    Ok(Json(GroupDetail {
        group,
        members: members.iter().map(UserView::from).collect(),
    }))
}

async fn create_group(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>)> {
    authorize(&state, &auth, Permission::ManageGroups).await?;
    req.validate()?;

    let name = req.name.trim().to_string();
    ensure_name_free(&state, &name, None).await?;

    let now = now_sortable();
    let group = Group {
        id: new_id("grp")?,
        name,
        description: req.description,
        allowed_vendors: dedup_vendors(req.allowed_vendors),
        created_at: now.clone(),
        updated_at: now,
    };
    state.db.upsert_group(&group).await?;

    tracing::info!(group_id = %group.id, name = %group.name, created_by = %auth.user_id, "Group created");
    Ok((StatusCode::CREATED, Json(group)))
}

async fn update_group(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(group_id): Path<String>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<Json<Group>> {
    authorize(&state, &auth, Permission::ManageGroups).await?;
    req.validate()?;

    let mut group = find_group(&state, &group_id).await?;

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        if !name.eq_ignore_ascii_case(&group.name) {
            ensure_name_free(&state, &name, Some(&group.id)).await?;
        }
        group.name = name;
    }
    if let Some(description) = req.description {
        group.description = description;
    }
    if let Some(vendors) = req.allowed_vendors {
        group.allowed_vendors = dedup_vendors(vendors);
    }

    group.updated_at = now_sortable();
    state.db.upsert_group(&group).await?;

    tracing::info!(group_id = %group.id, updated_by = %auth.user_id, "Group updated");
    Ok(Json(group))
}

async fn delete_group(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(group_id): Path<String>,
) -> Result<StatusCode> {
    authorize(&state, &auth, Permission::ManageGroups).await?;

    let group = find_group(&state, &group_id).await?;
    let members = state.db.delete_group(&group.id, &now_sortable()).await?;

    tracing::info!(
        group_id = %group.id,
        members_removed = members,
        deleted_by = %auth.user_id,
        "Group deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn add_member(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((group_id, user_id)): Path<(String, String)>,
) -> Result<Json<UserView>> {
    authorize(&state, &auth, Permission::ManageGroups).await?;

    let group = find_group(&state, &group_id).await?;
    let mut user = state
        .db
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

    if !user.group_ids.contains(&group.id) {
        user.group_ids.push(group.id.clone());
        user.updated_at = now_sortable();
        state.db.upsert_user(&user).await?;
        tracing::info!(group_id = %group.id, user_id = %user.id, "Member added to group");
    }

    Ok(Json(UserView::from(&user)))
}

async fn remove_member(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((group_id, user_id)): Path<(String, String)>,
) -> Result<Json<UserView>> {
    authorize(&state, &auth, Permission::ManageGroups).await?;

    let mut user = state
        .db
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

    let before = user.group_ids.len();
    user.group_ids.retain(|g| g != &group_id);
    if user.group_ids.len() != before {
        user.updated_at = now_sortable();
        state.db.upsert_user(&user).await?;
        tracing::info!(group_id = %group_id, user_id = %user.id, "Member removed from group");
    }

    Ok(Json(UserView::from(&user)))
}

async fn find_group(state: &AppState, group_id: &str) -> Result<Group> {
    state
        .db
        .get_group(group_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {}", group_id)))
}

async fn ensure_name_free(state: &AppState, name: &str, except: Option<&str>) -> Result<()> {
    let taken = state
        .db
        .list_groups()
        .await?
        .iter()
        .any(|g| g.name.eq_ignore_ascii_case(name) && Some(g.id.as_str()) != except);
    if taken {
        return Err(AppError::Conflict(format!("Group {} already exists", name)));
    }
    Ok(())
}

fn dedup_vendors(mut vendors: Vec<VendorKind>) -> Vec<VendorKind> {
    vendors.sort();
    vendors.dedup();
    vendors
}
