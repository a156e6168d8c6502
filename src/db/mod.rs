// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{submission_claim_live, FirestoreDb, GuardedUpdate, OrderQuery, OrderScope};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ROLES: &str = "roles";
    pub const GROUPS: &str = "groups";
    pub const ORDERS: &str = "orders";
    /// Encrypted payment details awaiting vendor submission (keyed by order_id)
    pub const PENDING_PAYMENTS: &str = "pending_payments";
}
