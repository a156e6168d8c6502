// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod group;
pub mod order;
pub mod role;
pub mod user;

pub use group::Group;
pub use order::{
    Customer, Order, OrderForm, PaymentDetails, PaymentMethod, PaymentSummary, PendingPayment,
    ProductLine, ValidationStatus,
};
pub use role::{Permission, Role, ADMIN_ROLE_ID};
pub use user::{User, UserView};
