// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Roles and the permissions they grant.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Document ID of the built-in administrator role.
pub const ADMIN_ROLE_ID: &str = "admin";

/// A single capability that a role can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Permission {
    ManageUsers,
    ManageRoles,
    ManageGroups,
    SubmitOrders,
    /// Orders created by the user or by members of the user's groups
    ViewOrders,
    ViewAllOrders,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::ManageUsers,
        Permission::ManageRoles,
        Permission::ManageGroups,
        Permission::SubmitOrders,
        Permission::ViewOrders,
        Permission::ViewAllOrders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageUsers => "manage_users",
            Permission::ManageRoles => "manage_roles",
            Permission::ManageGroups => "manage_groups",
            Permission::SubmitOrders => "submit_orders",
            Permission::ViewOrders => "view_orders",
            Permission::ViewAllOrders => "view_all_orders",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role stored in Firestore (`roles/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Built-in roles cannot be deleted or stripped of permissions
    #[serde(default)]
    pub built_in: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Role {
    /// The built-in administrator role with every permission.
    pub fn admin(now: &str) -> Self {
        Self {
            id: ADMIN_ROLE_ID.to_string(),
            name: "Administrator".to_string(),
            description: "Full access to users, roles, groups and orders".to_string(),
            permissions: Permission::ALL.to_vec(),
            built_in: true,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}
