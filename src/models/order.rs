// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Order model: the submitted form, the normalized stored record, and the
//! short-lived encrypted payment secrets.

use crate::vendors::VendorKind;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

// ─── Order Form (API input) ──────────────────────────────────

/// Customer details common to every vendor form.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Customer {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email, length(max = 254))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub address1: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub address2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    /// Two-letter state or province code
    #[validate(length(min = 2, max = 2))]
    pub state: String,
    #[validate(length(min = 3, max = 10))]
    pub zip: String,
    /// Two-letter country code
    #[serde(default = "default_country")]
    #[validate(length(min = 2, max = 2))]
    pub country: String,
}

fn default_country() -> String {
    "US".to_string()
}

/// Payment method accepted by a vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum PaymentMethod {
    Card,
    Ach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Discover,
}

impl CardBrand {
    /// Detect the brand from the leading digits of a card number.
    pub fn detect(number: &str) -> Option<Self> {
        let prefix = |n: usize| number.get(..n).and_then(|p| p.parse::<u32>().ok());

        if number.starts_with('4') {
            return Some(CardBrand::Visa);
        }
        if matches!(prefix(2), Some(34 | 37)) {
            return Some(CardBrand::Amex);
        }
        if matches!(prefix(2), Some(51..=55)) || matches!(prefix(4), Some(2221..=2720)) {
            return Some(CardBrand::Mastercard);
        }
        if number.starts_with("6011")
            || number.starts_with("65")
            || matches!(prefix(3), Some(644..=649))
        {
            return Some(CardBrand::Discover);
        }
        None
    }

    pub fn cvv_len(&self) -> usize {
        match self {
            CardBrand::Amex => 4,
            _ => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "visa",
            CardBrand::Mastercard => "mastercard",
            CardBrand::Amex => "amex",
            CardBrand::Discover => "discover",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Checking,
    Savings,
}

/// Payment secrets as entered on the form.
///
/// `Debug` is hand-written so card and account numbers never reach the logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    Card {
        card_number: String,
        exp_month: u32,
        exp_year: i32,
        cvv: String,
    },
    Ach {
        routing_number: String,
        account_number: String,
        account_type: AccountType,
    },
}

impl PaymentDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::Card { .. } => PaymentMethod::Card,
            PaymentDetails::Ach { .. } => PaymentMethod::Ach,
        }
    }

    /// Strip spaces and dashes that users type into number fields.
    pub fn normalized(&self) -> Self {
        let digits = |s: &str| s.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        match self {
            PaymentDetails::Card {
                card_number,
                exp_month,
                exp_year,
                cvv,
            } => PaymentDetails::Card {
                card_number: digits(card_number),
                exp_month: *exp_month,
                exp_year: *exp_year,
                cvv: cvv.trim().to_string(),
            },
            PaymentDetails::Ach {
                routing_number,
                account_number,
                account_type,
            } => PaymentDetails::Ach {
                routing_number: digits(routing_number),
                account_number: digits(account_number),
                account_type: *account_type,
            },
        }
    }

    /// The non-secret part of the payment, safe to store on the order.
    pub fn summary(&self) -> PaymentSummary {
        let last4 = |s: &str| {
            let skip = s.chars().count().saturating_sub(4);
            s.chars().skip(skip).collect::<String>()
        };
        match self {
            PaymentDetails::Card { card_number, .. } => PaymentSummary {
                method: PaymentMethod::Card,
                card_brand: CardBrand::detect(card_number),
                bin: card_number.get(..6).map(str::to_string),
                last4: last4(card_number),
            },
            PaymentDetails::Ach { account_number, .. } => PaymentSummary {
                method: PaymentMethod::Ach,
                card_brand: None,
                bin: None,
                last4: last4(account_number),
            },
        }
    }
}

impl std::fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let summary = self.summary();
        f.debug_struct("PaymentDetails")
            .field("method", &summary.method)
            .field("last4", &summary.last4)
            .finish_non_exhaustive()
    }
}

/// The product being ordered.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProductLine {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub description: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub unit_price_cents: u64,
    #[validate(range(min = 1, max = 100))]
    pub quantity: u32,
}

impl ProductLine {
    pub fn total_cents(&self) -> u64 {
        self.unit_price_cents.saturating_mul(self.quantity as u64)
    }
}

/// Order form posted by the frontend, for any vendor.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderForm {
    pub vendor: VendorKind,
    /// Group the order is filed under (required when the user has groups)
    #[serde(default)]
    pub group_id: Option<String>,
    #[validate(nested)]
    pub customer: Customer,
    pub payment: PaymentDetails,
    #[validate(nested)]
    pub product: ProductLine,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

// ─── Stored Order ────────────────────────────────────────────

/// Outcome of local validation and vendor submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ValidationStatus {
    /// Passed local rules, waiting for the vendor
    Pending,
    /// Failed local vendor rules, never sent
    Invalid,
    Approved,
    Declined,
    /// Vendor or transport failure, or vendor not configured
    Error,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::Invalid => "invalid",
            ValidationStatus::Approved => "approved",
            ValidationStatus::Declined => "declined",
            ValidationStatus::Error => "error",
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, ValidationStatus::Pending)
    }
}

impl std::str::FromStr for ValidationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ValidationStatus::Pending),
            "invalid" => Ok(ValidationStatus::Invalid),
            "approved" => Ok(ValidationStatus::Approved),
            "declined" => Ok(ValidationStatus::Declined),
            "error" => Ok(ValidationStatus::Error),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Non-secret payment information kept on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PaymentSummary {
    pub method: PaymentMethod,
    pub card_brand: Option<CardBrand>,
    /// First six digits of the card
    pub bin: Option<String>,
    pub last4: String,
}

/// Normalized order record stored in Firestore (`orders/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub vendor: VendorKind,
    /// User ID of the submitter
    pub created_by: String,
    pub group_id: Option<String>,
    pub customer: Customer,
    pub payment: PaymentSummary,
    pub product: ProductLine,
    pub notes: Option<String>,
    pub validation_status: ValidationStatus,
    pub validation_message: Option<String>,
    /// Vendor-side order/transaction ID once known
    pub vendor_order_id: Option<String>,
    /// Raw vendor status/response code, for support
    pub vendor_response_code: Option<String>,
    /// Fixed-width RFC3339 (see `time_utils::now_sortable`)
    pub created_at: String,
    pub updated_at: String,
    pub submitted_at: Option<String>,
}

/// Encrypted payment secrets awaiting submission (`pending_payments/{order_id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPayment {
    pub order_id: String,
    pub vendor: VendorKind,
    /// KMS ciphertext of the JSON-encoded `PaymentDetails`
    pub encrypted_details: String,
    pub created_at: String,
}
