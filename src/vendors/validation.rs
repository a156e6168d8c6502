// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local validation of an order form against a vendor's rules.
//!
//! All violations are collected so the user sees every problem at once.

use super::{VendorKind, VendorRules};
use crate::models::order::{CardBrand, OrderForm, PaymentDetails};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleViolation {
    pub field: &'static str,
    pub message: String,
}

impl RuleViolation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Join violations into the message stored on an invalid order.
pub fn violation_message(violations: &[RuleViolation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check a (normalized) form against the rules of `kind`.
///
/// `today` is the date card expiry is compared against.
pub fn validate_order(kind: VendorKind, form: &OrderForm, today: NaiveDate) -> Vec<RuleViolation> {
    let rules = kind.rules();
    let vendor = kind.display_name();
    let mut violations = Vec::new();

    check_lengths(rules, form, &mut violations);

    // ─── Address ─────────────────────────────────────────────────
    let customer = &form.customer;
    if !rules.accepts_country(&customer.country) {
        violations.push(RuleViolation::new(
            "customer.country",
            format!("{vendor} does not accept orders from {}", customer.country),
        ));
    } else if !valid_postal_code(&customer.country, &customer.zip) {
        violations.push(RuleViolation::new(
            "customer.zip",
            format!("Invalid postal code '{}'", customer.zip),
        ));
    }

    if rules.is_restricted_state(&customer.state) {
        violations.push(RuleViolation::new(
            "customer.state",
            format!(
                "{vendor} does not accept orders from {}",
                customer.state.trim().to_uppercase()
            ),
        ));
    }

    match customer.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(phone) => {
            if normalize_phone(phone).is_none() {
                violations.push(RuleViolation::new(
                    "customer.phone",
                    "Phone number must have 10 digits",
                ));
            }
        }
        None if rules.phone_required => {
            violations.push(RuleViolation::new(
                "customer.phone",
                format!("{vendor} requires a phone number"),
            ));
        }
        None => {}
    }

    // ─── Payment ─────────────────────────────────────────────────
    let method = form.payment.method();
    if !rules.accepts_method(method) {
        violations.push(RuleViolation::new(
            "payment.method",
            format!("{vendor} does not accept {} payments", method_label(method)),
        ));
    } else {
        match &form.payment {
            PaymentDetails::Card {
                card_number,
                exp_month,
                exp_year,
                cvv,
            } => check_card(
                rules,
                card_number,
                *exp_month,
                *exp_year,
                cvv,
                today,
                &mut violations,
            ),
            PaymentDetails::Ach {
                routing_number,
                account_number,
                ..
            } => check_ach(routing_number, account_number, &mut violations),
        }
    }

    // ─── Amount ──────────────────────────────────────────────────
    let total = form.product.total_cents();
    if total < rules.min_amount_cents || total > rules.max_amount_cents {
        violations.push(RuleViolation::new(
            "product.unit_price_cents",
            format!(
                "Order total {} is outside the {vendor} range {}-{}",
                super::dollars(total),
                super::dollars(rules.min_amount_cents),
                super::dollars(rules.max_amount_cents)
            ),
        ));
    }
    if form.product.quantity == 0 {
        violations.push(RuleViolation::new(
            "product.quantity",
            "Quantity must be at least 1",
        ));
    }

    violations
}

fn check_lengths(rules: &VendorRules, form: &OrderForm, violations: &mut Vec<RuleViolation>) {
    let vendor = rules.kind.display_name();
    let limits = rules.limits;
    let customer = &form.customer;

    let mut fields = vec![
        ("customer.first_name", "First name", customer.first_name.as_str(), limits.name),
        ("customer.last_name", "Last name", customer.last_name.as_str(), limits.name),
        ("customer.address1", "Address", customer.address1.as_str(), limits.address),
        ("customer.city", "City", customer.city.as_str(), limits.city),
        ("customer.email", "Email", customer.email.as_str(), limits.email),
        ("product.sku", "SKU", form.product.sku.as_str(), limits.sku),
    ];
    if let Some(address2) = &customer.address2 {
        fields.insert(3, ("customer.address2", "Address line 2", address2.as_str(), limits.address));
    }

    for (field, label, value, max) in fields {
        if value.chars().count() > max {
            violations.push(RuleViolation::new(
                field,
                format!("{label} exceeds {max} characters for {vendor}"),
            ));
        }
    }

    if let Some(notes) = form.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        if limits.notes == 0 {
            violations.push(RuleViolation::new(
                "notes",
                format!("{vendor} does not accept order notes"),
            ));
        } else if notes.chars().count() > limits.notes {
            violations.push(RuleViolation::new(
                "notes",
                format!("Notes exceed {} characters for {vendor}", limits.notes),
            ));
        }
    }
}

fn check_card(
    rules: &VendorRules,
    card_number: &str,
    exp_month: u32,
    exp_year: i32,
    cvv: &str,
    today: NaiveDate,
    violations: &mut Vec<RuleViolation>,
) {
    let vendor = rules.kind.display_name();

    if !is_digits(card_number) || !(13..=19).contains(&card_number.len()) {
        violations.push(RuleViolation::new(
            "payment.card_number",
            "Card number must be 13-19 digits",
        ));
        return;
    }
    if !luhn_valid(card_number) {
        violations.push(RuleViolation::new(
            "payment.card_number",
            "Card number is not valid",
        ));
    }

    let brand = CardBrand::detect(card_number);
    match brand {
        Some(brand) if !rules.accepts_brand(brand) => {
            violations.push(RuleViolation::new(
                "payment.card_number",
                format!("{vendor} does not accept {} cards", brand.as_str()),
            ));
        }
        None => {
            violations.push(RuleViolation::new(
                "payment.card_number",
                "Unsupported card type",
            ));
        }
        Some(_) => {}
    }

    if rules.is_blocked_bin(card_number) {
        violations.push(RuleViolation::new(
            "payment.card_number",
            format!("Card BIN {} is blocked by {vendor}", &card_number[..6]),
        ));
    }

    if !(1..=12).contains(&exp_month) {
        violations.push(RuleViolation::new(
            "payment.exp_month",
            "Expiration month must be 1-12",
        ));
    } else {
        let year = full_year(exp_year);
        if (year, exp_month) < (today.year(), today.month()) {
            violations.push(RuleViolation::new("payment.exp_year", "Card is expired"));
        }
    }

    let cvv_len = brand.map(|b| b.cvv_len()).unwrap_or(3);
    if !is_digits(cvv) || cvv.len() != cvv_len {
        violations.push(RuleViolation::new(
            "payment.cvv",
            format!("CVV must be {cvv_len} digits"),
        ));
    }
}

fn check_ach(routing_number: &str, account_number: &str, violations: &mut Vec<RuleViolation>) {
    if !aba_routing_valid(routing_number) {
        violations.push(RuleViolation::new(
            "payment.routing_number",
            "Routing number is not valid",
        ));
    }
    if !is_digits(account_number) || !(4..=17).contains(&account_number.len()) {
        violations.push(RuleViolation::new(
            "payment.account_number",
            "Account number must be 4-17 digits",
        ));
    }
}

fn method_label(method: crate::models::PaymentMethod) -> &'static str {
    match method {
        crate::models::PaymentMethod::Card => "card",
        crate::models::PaymentMethod::Ach => "ACH",
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Two-digit years are taken as 20xx.
pub fn full_year(year: i32) -> i32 {
    if (0..100).contains(&year) {
        2000 + year
    } else {
        year
    }
}

/// Luhn (mod 10) checksum.
pub fn luhn_valid(number: &str) -> bool {
    if !is_digits(number) {
        return false;
    }

    let sum: u32 = number
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = (b - b'0') as u32;
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// ABA routing number checksum (weights 3, 7, 1).
pub fn aba_routing_valid(routing: &str) -> bool {
    if routing.len() != 9 || !is_digits(routing) {
        return false;
    }

    let sum: u32 = routing
        .bytes()
        .zip([3u32, 7, 1].iter().cycle())
        .map(|(b, w)| (b - b'0') as u32 * w)
        .sum();

    sum % 10 == 0
}

/// Reduce a phone number to its 10 national digits.
pub fn normalize_phone(phone: &str) -> Option<String> {
    if phone
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')' | '+')))
    {
        return None;
    }

    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => Some(digits),
        11 if digits.starts_with('1') => Some(digits[1..].to_string()),
        _ => None,
    }
}

fn valid_postal_code(country: &str, zip: &str) -> bool {
    let zip = zip.trim();
    match country.trim().to_uppercase().as_str() {
        "US" => match zip.split_once('-') {
            Some((five, four)) => {
                five.len() == 5 && four.len() == 4 && is_digits(five) && is_digits(four)
            }
            None => (zip.len() == 5 || zip.len() == 9) && is_digits(zip),
        },
        "CA" => {
            let compact: Vec<char> = zip.chars().filter(|c| *c != ' ').collect();
            compact.len() == 6
                && compact.iter().enumerate().all(|(i, c)| {
                    if i % 2 == 0 {
                        c.is_ascii_alphabetic()
                    } else {
                        c.is_ascii_digit()
                    }
                })
        }
        _ => !zip.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{Customer, ProductLine};
    use crate::vendors::test_support::{ach, card};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    fn form(vendor: VendorKind, payment: PaymentDetails) -> OrderForm {
        OrderForm {
            vendor,
            group_id: None,
            customer: Customer {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                email: "jane@example.com".to_string(),
                phone: Some("(415) 555-0123".to_string()),
                address1: "1 Market St".to_string(),
                address2: None,
                city: "San Francisco".to_string(),
                state: "CA".to_string(),
                zip: "94105".to_string(),
                country: "US".to_string(),
            },
            payment,
            product: ProductLine {
                sku: "SKU-1".to_string(),
                description: None,
                unit_price_cents: 4999,
                quantity: 1,
            },
            notes: None,
        }
    }

    fn fields(violations: &[RuleViolation]) -> Vec<&'static str> {
        violations.iter().map(|v| v.field).collect()
    }

    #[test]
    fn clean_order_passes_every_vendor_that_takes_cards() {
        for kind in VendorKind::ALL {
            let violations = validate_order(kind, &form(kind, card()), today());
            assert!(violations.is_empty(), "{kind}: {violations:?}");
        }
    }

    #[test]
    fn restricted_state_is_rejected() {
        let mut f = form(VendorKind::Radius, card());
        f.customer.state = "WI".to_string();

        let violations = validate_order(VendorKind::Radius, &f, today());
        assert_eq!(fields(&violations), vec!["customer.state"]);
        assert_eq!(
            violation_message(&violations),
            "Radius does not accept orders from WI"
        );

        // ImportSale has no state restrictions
        assert!(validate_order(VendorKind::ImportSale, &f, today()).is_empty());
    }

    #[test]
    fn blocked_bin_is_rejected() {
        // Luhn-valid number starting with a Radius-blocked BIN
        let number = "4000220000000006";
        assert!(luhn_valid(number));
        let payment = PaymentDetails::Card {
            card_number: number.to_string(),
            exp_month: 1,
            exp_year: 2030,
            cvv: "123".to_string(),
        };

        let violations = validate_order(VendorKind::Radius, &form(VendorKind::Radius, payment.clone()), today());
        assert!(violation_message(&violations).contains("BIN 400022 is blocked"));

        let violations = validate_order(VendorKind::PsOnline, &form(VendorKind::PsOnline, payment), today());
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn ach_branching_follows_vendor() {
        let violations = validate_order(VendorKind::Radius, &form(VendorKind::Radius, ach()), today());
        assert_eq!(fields(&violations), vec!["payment.method"]);

        let violations = validate_order(VendorKind::Sempris, &form(VendorKind::Sempris, ach()), today());
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn bad_ach_numbers_are_reported() {
        let payment = PaymentDetails::Ach {
            routing_number: "123456789".to_string(),
            account_number: "12".to_string(),
            account_type: crate::models::order::AccountType::Savings,
        };
        let violations = validate_order(VendorKind::ImportSale, &form(VendorKind::ImportSale, payment), today());
        assert_eq!(
            fields(&violations),
            vec!["payment.routing_number", "payment.account_number"]
        );
    }

    #[test]
    fn field_limits_are_vendor_specific() {
        let mut f = form(VendorKind::Mi, card());
        f.customer.first_name = "Maximilianus-Augustus".to_string(); // 21 chars

        let violations = validate_order(VendorKind::Mi, &f, today());
        assert_eq!(fields(&violations), vec!["customer.first_name"]);
        assert!(validate_order(VendorKind::PsOnline, &f, today()).is_empty());
    }

    #[test]
    fn sempris_rejects_notes_and_requires_phone() {
        let mut f = form(VendorKind::Sempris, card());
        f.notes = Some("leave at door".to_string());
        f.customer.phone = None;

        let violations = validate_order(VendorKind::Sempris, &f, today());
        assert_eq!(fields(&violations), vec!["notes", "customer.phone"]);
    }

    #[test]
    fn expired_and_malformed_cards() {
        let payment = PaymentDetails::Card {
            card_number: "4111111111111112".to_string(),
            exp_month: 5,
            exp_year: 26,
            cvv: "12".to_string(),
        };
        let violations = validate_order(VendorKind::PsOnline, &form(VendorKind::PsOnline, payment), today());
        assert_eq!(
            fields(&violations),
            vec!["payment.card_number", "payment.exp_year", "payment.cvv"]
        );
    }

    #[test]
    fn card_expiring_this_month_is_accepted() {
        let payment = PaymentDetails::Card {
            card_number: "4111111111111111".to_string(),
            exp_month: 6,
            exp_year: 2026,
            cvv: "123".to_string(),
        };
        assert!(validate_order(VendorKind::PsOnline, &form(VendorKind::PsOnline, payment), today()).is_empty());
    }

    #[test]
    fn amex_needs_four_digit_cvv_and_accepting_vendor() {
        let amex = PaymentDetails::Card {
            card_number: "378282246310005".to_string(),
            exp_month: 12,
            exp_year: 2030,
            cvv: "1234".to_string(),
        };
        assert!(validate_order(VendorKind::PsOnline, &form(VendorKind::PsOnline, amex.clone()), today()).is_empty());

        let violations = validate_order(VendorKind::Radius, &form(VendorKind::Radius, amex), today());
        assert!(violation_message(&violations).contains("does not accept amex cards"));
    }

    #[test]
    fn amount_range_is_enforced() {
        let mut f = form(VendorKind::Sempris, card());
        f.product.unit_price_cents = 15_000;
        f.product.quantity = 2;

        let violations = validate_order(VendorKind::Sempris, &f, today());
        assert_eq!(fields(&violations), vec!["product.unit_price_cents"]);
        assert!(violations[0].message.contains("300.00"));
    }

    #[test]
    fn country_and_postal_code() {
        let mut f = form(VendorKind::Sublytics, card());
        f.customer.country = "CA".to_string();
        f.customer.state = "ON".to_string();
        f.customer.zip = "K1A 0B1".to_string();
        assert!(validate_order(VendorKind::Sublytics, &f, today()).is_empty());

        let violations = validate_order(VendorKind::Radius, &f, today());
        assert_eq!(fields(&violations), vec!["customer.country"]);

        f.customer.country = "US".to_string();
        f.customer.state = "CA".to_string();
        f.customer.zip = "9410".to_string();
        let violations = validate_order(VendorKind::Sublytics, &f, today());
        assert_eq!(fields(&violations), vec!["customer.zip"]);
    }

    #[test]
    fn all_violations_are_collected() {
        let mut f = form(VendorKind::Mi, ach());
        f.customer.state = "UT".to_string();
        f.customer.phone = Some("555".to_string());

        let violations = validate_order(VendorKind::Mi, &f, today());
        assert_eq!(violations.len(), 3);
        assert_eq!(violation_message(&violations).matches("; ").count(), 2);
    }

    #[test]
    fn checksums() {
        assert!(luhn_valid("4111111111111111"));
        assert!(!luhn_valid("4111111111111112"));
        assert!(!luhn_valid("41111111x1111111"));
        assert!(aba_routing_valid("011000015"));
        assert!(aba_routing_valid("021000021"));
        assert!(!aba_routing_valid("021000022"));
        assert!(!aba_routing_valid("12345"));
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("+1 (415) 555-0123").as_deref(), Some("4155550123"));
        assert_eq!(normalize_phone("415.555.0123").as_deref(), Some("4155550123"));
        assert_eq!(normalize_phone("555-0123"), None);
        assert_eq!(normalize_phone("415555012x"), None);
    }

    #[test]
    fn us_zip_formats() {
        assert!(valid_postal_code("US", "94105"));
        assert!(valid_postal_code("US", "94105-1234"));
        assert!(valid_postal_code("US", "941051234"));
        assert!(!valid_postal_code("US", "9410-51234"));
        assert!(!valid_postal_code("US", "ABCDE"));
        assert!(!valid_postal_code("US", "94105-"));
        assert!(!valid_postal_code("US", "94105-12-34"));
        assert!(!valid_postal_code("US", "94105-123"));
        assert!(!valid_postal_code("US", "9410512345"));
    }
}
