// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request middleware: session auth, Cloud Tasks auth and response headers.

pub mod auth;
pub mod security;
pub mod tasks_auth;

pub use auth::{authorize, load_actor, require_auth, require_permission, Actor, AuthUser};
pub use security::add_security_headers;
pub use tasks_auth::require_tasks_auth;
