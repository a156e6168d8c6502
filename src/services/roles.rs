// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory role cache.
//!
//! Every authenticated request needs its role's permissions. Roles change
//! rarely, so they are cached for a short TTL and dropped explicitly when a
//! role is updated or deleted on this instance.

use crate::models::Role;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const ROLE_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct CachedRole {
    role: Role,
    expires_at: Instant,
}

/// Role cache shared across request handlers.
#[derive(Clone)]
pub struct RoleCache {
    entries: Arc<DashMap<String, CachedRole>>,
    ttl: Duration,
}

impl Default for RoleCache {
    fn default() -> Self {
        Self::new(ROLE_CACHE_TTL)
    }
}

impl RoleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Cached role, if present and not expired.
    pub fn get(&self, role_id: &str) -> Option<Role> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(role_id) {
            if entry.expires_at > now {
                return Some(entry.role.clone());
            }
        }
        // Expired: drop it so the next lookup goes to Firestore.
        self.entries.remove_if(role_id, |_, entry| entry.expires_at <= now);
        None
    }

    pub fn insert(&self, role: Role) {
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .insert(role.id.clone(), CachedRole { role, expires_at });
    }

    pub fn invalidate(&self, role_id: &str) {
        if self.entries.remove(role_id).is_some() {
            tracing::debug!(role_id, "Invalidated cached role");
        }
    }
}
