// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Order Desk: role-based admin backend for multi-vendor order submission
//!
//! This crate provides the backend API for managing users, roles and groups,
//! and for validating orders against per-vendor rules before submitting
//! them to the upstream order-processing vendors.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod vendors;

use config::Config;
use db::FirestoreDb;
use models::{Permission, Role};
use services::{GoogleOidcVerifier, KmsService, RoleCache, TasksService};
use std::collections::HashSet;
use std::sync::Arc;
use vendors::VendorGateway;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub kms: KmsService,
    pub tasks_service: TasksService,
    pub google_oidc_verifier: Arc<GoogleOidcVerifier>,
    pub vendor_gateway: VendorGateway,
    pub role_cache: RoleCache,
}

impl AppState {
    /// Resolve a role, going through the in-memory cache first.
    pub async fn role(&self, role_id: &str) -> error::Result<Option<Role>> {
        if let Some(role) = self.role_cache.get(role_id) {
            return Ok(Some(role));
        }

        let role = self.db.get_role(role_id).await?;
        if let Some(role) = &role {
            self.role_cache.insert(role.clone());
        }
        Ok(role)
    }

    /// Effective permission set for a role. Unknown roles grant nothing.
    pub async fn permissions_for(&self, role_id: &str) -> error::Result<HashSet<Permission>> {
        Ok(self
            .role(role_id)
            .await?
            .map(|r| r.permissions.into_iter().collect())
            .unwrap_or_default())
    }
}
