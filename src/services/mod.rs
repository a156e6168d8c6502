// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business logic behind the HTTP handlers.

pub mod bootstrap;
pub mod google_oidc;
pub mod kms;
pub mod orders;
pub mod password;
pub mod postback;
pub mod roles;
pub mod tasks;

pub use google_oidc::{GoogleOidcVerifier, OidcError, VerifiedTaskPrincipal};
pub use kms::KmsService;
pub use orders::{OrderService, PostbackResult, SubmitResult};
pub use roles::RoleCache;
pub use tasks::TasksService;
