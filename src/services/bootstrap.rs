// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! First-start provisioning: the built-in admin role and, when configured,
//! an initial admin account.

use crate::config::Config;
use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{user::normalize_email, Permission, Role, User, ADMIN_ROLE_ID};
use crate::services::password::{hash_password, new_id};
use crate::time_utils::now_sortable;

/// Make sure the admin role exists with every permission.
///
/// Returns true when the role was created or repaired.
pub async fn ensure_admin_role(db: &FirestoreDb) -> Result<bool, AppError> {
    let now = now_sortable();

    match db.get_role(ADMIN_ROLE_ID).await? {
        None => {
            db.upsert_role(&Role::admin(&now)).await?;
            tracing::info!("Created built-in admin role");
            Ok(true)
        }
        Some(mut role) => {
            if role.built_in && Permission::ALL.iter().all(|p| role.has(*p)) {
                return Ok(false);
            }
            role.permissions = Permission::ALL.to_vec();
            role.built_in = true;
            role.updated_at = now;
            db.upsert_role(&role).await?;
            tracing::warn!("Restored permissions of built-in admin role");
            Ok(true)
        }
    }
}

/// Create the bootstrap admin account if credentials are configured and
/// no user with that email exists. Existing accounts are never modified.
pub async fn ensure_admin_user(db: &FirestoreDb, config: &Config) -> Result<Option<User>, AppError> {
    let (Some(email), Some(password)) = (
        config.bootstrap_admin_email.as_deref(),
        config.bootstrap_admin_password.as_deref(),
    ) else {
        return Ok(None);
    };

    let email = normalize_email(email);
    if db.get_user_by_email(&email).await?.is_some() {
        tracing::debug!(email = %email, "Bootstrap admin already exists");
        return Ok(None);
    }

    let now = now_sortable();
    let user = User {
        id: new_id("usr")?,
        email: email.clone(),
        name: "Administrator".to_string(),
        password_hash: hash_password(password)?,
        role_id: ADMIN_ROLE_ID.to_string(),
        group_ids: Vec::new(),
        active: true,
        created_at: now.clone(),
        updated_at: now,
        last_login_at: None,
    };
    db.upsert_user(&user).await?;

    tracing::info!(email = %email, user_id = %user.id, "Created bootstrap admin user");
    Ok(Some(user))
}

/// Run all startup provisioning.
pub async fn run(db: &FirestoreDb, config: &Config) -> Result<(), AppError> {
    ensure_admin_role(db).await?;
    ensure_admin_user(db, config).await?;
    Ok(())
}
