// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vendor form schemas served to the frontend.
//!
//! The frontend renders each vendor's order form from this description, so
//! limits shown to the user always match what `validate_order` enforces.

use super::{VendorKind, VendorRules};
use crate::models::order::{CardBrand, PaymentMethod};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One input on a vendor form.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FormField {
    /// Dotted path into the order form ("customer.first_name")
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub max_length: Option<usize>,
    /// Only shown for this payment method
    pub payment_method: Option<PaymentMethod>,
}

/// Form schema and rule summary of one vendor.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VendorSchema {
    pub vendor: VendorKind,
    pub name: &'static str,
    /// Credentials are present; orders to unconfigured vendors end in `error`
    pub configured: bool,
    pub payment_methods: Vec<PaymentMethod>,
    pub card_brands: Vec<CardBrand>,
    pub restricted_states: Vec<&'static str>,
    pub countries: Vec<&'static str>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub min_amount_cents: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub max_amount_cents: u64,
    pub fields: Vec<FormField>,
}

impl VendorSchema {
    pub fn for_vendor(kind: VendorKind, configured: bool) -> Self {
        let rules = kind.rules();
        Self {
            vendor: kind,
            name: kind.display_name(),
            configured,
            payment_methods: rules.payment_methods.to_vec(),
            card_brands: rules.card_brands.to_vec(),
            restricted_states: rules.restricted_states.to_vec(),
            countries: rules.countries.to_vec(),
            min_amount_cents: rules.min_amount_cents,
            max_amount_cents: rules.max_amount_cents,
            fields: form_fields(rules),
        }
    }
}

fn form_fields(rules: &VendorRules) -> Vec<FormField> {
    let limits = rules.limits;
    let field = |name: &'static str, label: &'static str, required: bool, max_length: Option<usize>| FormField {
        name,
        label,
        required,
        max_length,
        payment_method: None,
    };
    let payment_field = |name: &'static str, label: &'static str, method: PaymentMethod| FormField {
        name,
        label,
        required: true,
        max_length: None,
        payment_method: Some(method),
    };

    let mut fields = vec![
        field("customer.first_name", "First name", true, Some(limits.name)),
        field("customer.last_name", "Last name", true, Some(limits.name)),
        field("customer.email", "Email", true, Some(limits.email)),
        field("customer.phone", "Phone", rules.phone_required, Some(14)),
        field("customer.address1", "Address", true, Some(limits.address)),
        field("customer.address2", "Address line 2", false, Some(limits.address)),
        field("customer.city", "City", true, Some(limits.city)),
        field("customer.state", "State", true, Some(2)),
        field("customer.zip", "ZIP / postal code", true, Some(10)),
        field("customer.country", "Country", true, Some(2)),
        field("product.sku", "SKU", true, Some(limits.sku)),
        field("product.unit_price_cents", "Price", true, None),
        field("product.quantity", "Quantity", true, None),
    ];

    if limits.notes > 0 {
        fields.push(field("notes", "Notes", false, Some(limits.notes)));
    }

    if rules.accepts_method(PaymentMethod::Card) {
        fields.extend([
            payment_field("payment.card_number", "Card number", PaymentMethod::Card),
            payment_field("payment.exp_month", "Expiration month", PaymentMethod::Card),
            payment_field("payment.exp_year", "Expiration year", PaymentMethod::Card),
            payment_field("payment.cvv", "CVV", PaymentMethod::Card),
        ]);
    }
    if rules.accepts_method(PaymentMethod::Ach) {
        fields.extend([
            payment_field("payment.routing_number", "Routing number", PaymentMethod::Ach),
            payment_field("payment.account_number", "Account number", PaymentMethod::Ach),
            payment_field("payment.account_type", "Account type", PaymentMethod::Ach),
        ]);
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_field(schema: &VendorSchema, name: &str) -> bool {
        schema.fields.iter().any(|f| f.name == name)
    }

    #[test]
    fn card_only_vendor_has_no_ach_fields() {
        let schema = VendorSchema::for_vendor(VendorKind::Radius, true);
        assert!(has_field(&schema, "payment.card_number"));
        assert!(!has_field(&schema, "payment.routing_number"));
    }

    #[test]
    fn schema_limits_match_rules() {
        let schema = VendorSchema::for_vendor(VendorKind::Mi, false);
        assert!(!schema.configured);

        let first_name = schema
            .fields
            .iter()
            .find(|f| f.name == "customer.first_name")
            .unwrap();
        assert_eq!(first_name.max_length, Some(VendorKind::Mi.rules().limits.name));

        let phone = schema.fields.iter().find(|f| f.name == "customer.phone").unwrap();
        assert!(phone.required);
    }

    #[test]
    fn notes_hidden_when_vendor_rejects_them() {
        assert!(!has_field(&VendorSchema::for_vendor(VendorKind::Sempris, true), "notes"));
        assert!(has_field(&VendorSchema::for_vendor(VendorKind::PsOnline, true), "notes"));
    }
}
