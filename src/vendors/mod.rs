// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upstream order-processing vendors.
//!
//! Every vendor gets:
//! - a rule set checked locally before anything is sent (`rules`, `validation`)
//! - a form schema served to the frontend (`schema`)
//! - a wire contract mapping our order to its request body and its
//!   response shape back to a normalized outcome (one module per vendor)
//!
//! `VendorGateway` performs the actual HTTP calls.

pub mod gateway;
pub mod importsale;
pub mod mi;
pub mod psonline;
pub mod radius;
pub mod rules;
pub mod schema;
pub mod sempris;
pub mod sublytics;
pub mod validation;

pub use gateway::{VendorError, VendorGateway};
pub use rules::{FieldLimits, VendorRules};
pub use schema::VendorSchema;
pub use validation::{validate_order, RuleViolation};

use crate::config::VendorSettings;
use crate::models::{Order, PaymentDetails, ValidationStatus};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Supported upstream vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum VendorKind {
    Radius,
    Sempris,
    PsOnline,
    Mi,
    ImportSale,
    Sublytics,
}

impl VendorKind {
    pub const ALL: [VendorKind; 6] = [
        VendorKind::Radius,
        VendorKind::Sempris,
        VendorKind::PsOnline,
        VendorKind::Mi,
        VendorKind::ImportSale,
        VendorKind::Sublytics,
    ];

    /// URL/JSON identifier.
    pub fn slug(&self) -> &'static str {
        match self {
            VendorKind::Radius => "radius",
            VendorKind::Sempris => "sempris",
            VendorKind::PsOnline => "psonline",
            VendorKind::Mi => "mi",
            VendorKind::ImportSale => "importsale",
            VendorKind::Sublytics => "sublytics",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            VendorKind::Radius => "Radius",
            VendorKind::Sempris => "Sempris",
            VendorKind::PsOnline => "PSOnline",
            VendorKind::Mi => "MI",
            VendorKind::ImportSale => "ImportSale",
            VendorKind::Sublytics => "Sublytics",
        }
    }

    /// Prefix of the vendor's environment variables.
    pub fn env_prefix(&self) -> String {
        self.slug().to_uppercase()
    }

    /// Wire contract for this vendor.
    pub fn contract(&self) -> &'static dyn VendorContract {
        match self {
            VendorKind::Radius => &radius::Radius,
            VendorKind::Sempris => &sempris::Sempris,
            VendorKind::PsOnline => &psonline::PsOnline,
            VendorKind::Mi => &mi::Mi,
            VendorKind::ImportSale => &importsale::ImportSale,
            VendorKind::Sublytics => &sublytics::Sublytics,
        }
    }
}

impl std::fmt::Display for VendorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for VendorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VendorKind::ALL
            .into_iter()
            .find(|kind| kind.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown vendor '{s}'"))
    }
}

/// A vendor's answer, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorOutcome {
    /// One of `Approved`, `Declined` or `Error`
    pub status: ValidationStatus,
    pub message: Option<String>,
    pub vendor_order_id: Option<String>,
    pub response_code: Option<String>,
}

impl VendorOutcome {
    pub fn approved(vendor_order_id: Option<String>, response_code: Option<String>) -> Self {
        Self {
            status: ValidationStatus::Approved,
            message: None,
            vendor_order_id,
            response_code,
        }
    }

    pub fn declined(message: Option<String>, response_code: Option<String>) -> Self {
        Self {
            status: ValidationStatus::Declined,
            message: Some(message.unwrap_or_else(|| "Declined by vendor".to_string())),
            vendor_order_id: None,
            response_code,
        }
    }

    pub fn error(message: Option<String>, response_code: Option<String>) -> Self {
        Self {
            status: ValidationStatus::Error,
            message: Some(message.unwrap_or_else(|| "Vendor reported an error".to_string())),
            vendor_order_id: None,
            response_code,
        }
    }
}

/// Asynchronous status update pushed by a vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Postback {
    /// Our order ID, echoed back by the vendor
    pub order_ref: String,
    pub outcome: VendorOutcome,
}

/// Wire contract of one vendor API.
pub trait VendorContract: Send + Sync {
    fn kind(&self) -> VendorKind;

    /// Path appended to the configured base URL.
    fn endpoint(&self) -> &'static str;

    /// Attach credentials that travel in headers. Vendors that expect
    /// credentials in the body add them in `build_payload` instead.
    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        _settings: &VendorSettings,
    ) -> reqwest::RequestBuilder {
        request
    }

    /// Build the request body in the vendor's own field names.
    fn build_payload(
        &self,
        order: &Order,
        payment: &PaymentDetails,
        settings: &VendorSettings,
    ) -> serde_json::Value;

    /// Map a response body to an outcome. `None` when the body is not in
    /// the vendor's shape at all (e.g. an HTML error page).
    fn parse_response(&self, http_status: u16, body: &serde_json::Value) -> Option<VendorOutcome>;

    /// Parse an asynchronous status update.
    fn parse_postback(&self, body: &serde_json::Value) -> Option<Postback>;
}

/// Cents to a decimal dollar string ("4999" -> "49.99").
pub(crate) fn dollars(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Read a string or number field as a string.
pub(crate) fn field_str(body: &serde_json::Value, key: &str) -> Option<String> {
    match body.get(key)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
