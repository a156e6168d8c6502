// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User account stored in Firestore (`users/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Random user ID (also used as document ID)
    pub id: String,
    /// Login email, always lowercase
    pub email: String,
    /// Display name
    pub name: String,
    /// PBKDF2 hash, see `services::password`
    pub password_hash: String,
    /// Role document ID
    pub role_id: String,
    /// Groups the user belongs to
    #[serde(default)]
    pub group_ids: Vec<String>,
    /// Inactive users cannot log in
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub last_login_at: Option<String>,
}

fn default_active() -> bool {
    true
}

/// User as returned by the API (no password hash).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role_id: String,
    pub group_ids: Vec<String>,
    pub active: bool,
    pub created_at: String,
    pub last_login_at: Option<String>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role_id: user.role_id.clone(),
            group_ids: user.group_ids.clone(),
            active: user.active,
            created_at: user.created_at.clone(),
            last_login_at: user.last_login_at.clone(),
        }
    }
}

/// Normalize an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
