// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vendor gateway tests against a local stand-in for the Radius API.
//!
//! The stub server from `common` plays one upstream behavior per path
//! prefix, and the gateway is pointed at it through `VendorSettings::base_url`.

use order_desk::models::order::{Customer, PaymentSummary, ProductLine};
use order_desk::models::{Order, PaymentDetails, PaymentMethod, ValidationStatus};
use order_desk::vendors::{VendorError, VendorGateway, VendorKind};

mod common;
use common::{config_with_radius, spawn_stub_vendor, STUB_RADIUS_KEY};

fn gateway_for(base_url: String) -> VendorGateway {
    VendorGateway::new(&config_with_radius(base_url, STUB_RADIUS_KEY))
}

fn radius_order() -> Order {
    Order {
        id: "ord_gateway_test".to_string(),
        vendor: VendorKind::Radius,
        created_by: "usr_clerk".to_string(),
        group_id: None,
        customer: Customer {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            address1: "12 Analytical Way".to_string(),
            address2: None,
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: "62701".to_string(),
            country: "US".to_string(),
        },
        payment: PaymentSummary {
            method: PaymentMethod::Card,
            card_brand: None,
            bin: Some("411111".to_string()),
            last4: "1111".to_string(),
        },
        product: ProductLine {
            sku: "KIT-01".to_string(),
            description: None,
            unit_price_cents: 4999,
            quantity: 1,
        },
        notes: None,
        validation_status: ValidationStatus::Pending,
        validation_message: None,
        vendor_order_id: None,
        vendor_response_code: None,
        created_at: "2026-03-01T12:00:00.000000000Z".to_string(),
        updated_at: "2026-03-01T12:00:00.000000000Z".to_string(),
        submitted_at: None,
    }
}

fn card() -> PaymentDetails {
    PaymentDetails::Card {
        card_number: "4111111111111111".to_string(),
        exp_month: 7,
        exp_year: 2031,
        cvv: "123".to_string(),
    }
}

#[tokio::test]
async fn test_approved_order_returns_vendor_id() {
    let base = spawn_stub_vendor().await;
    let gateway = gateway_for(format!("{}/approve", base));

    let outcome = gateway.submit(&radius_order(), &card()).await.unwrap();

    assert_eq!(outcome.status, ValidationStatus::Approved);
    assert_eq!(outcome.vendor_order_id.as_deref(), Some("R-ord_gateway_test"));
}

#[tokio::test]
async fn test_declined_order_keeps_vendor_message() {
    let base = spawn_stub_vendor().await;
    let gateway = gateway_for(format!("{}/decline", base));

    let outcome = gateway.submit(&radius_order(), &card()).await.unwrap();

    assert_eq!(outcome.status, ValidationStatus::Declined);
    assert_eq!(outcome.message.as_deref(), Some("Insufficient funds"));
    assert_eq!(outcome.response_code.as_deref(), Some("51"));
}

#[tokio::test]
async fn test_refused_credentials_are_an_error_not_a_decline() {
    let base = spawn_stub_vendor().await;
    let gateway = VendorGateway::new(&config_with_radius(format!("{}/approve", base), "stale-key"));

    let outcome = gateway.submit(&radius_order(), &card()).await.unwrap();

    assert_eq!(outcome.status, ValidationStatus::Error);
    assert_eq!(outcome.message.as_deref(), Some("bad key"));
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let base = spawn_stub_vendor().await;
    let gateway = gateway_for(format!("{}/unavailable", base));

    let err = gateway.submit(&radius_order(), &card()).await.unwrap_err();

    assert!(matches!(err, VendorError::Transient(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_rate_limit_is_retryable() {
    let base = spawn_stub_vendor().await;
    let gateway = gateway_for(format!("{}/limited", base));

    let err = gateway.submit(&radius_order(), &card()).await.unwrap_err();

    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_html_response_is_rejected() {
    let base = spawn_stub_vendor().await;
    let gateway = gateway_for(format!("{}/html", base));

    let err = gateway.submit(&radius_order(), &card()).await.unwrap_err();

    assert!(matches!(err, VendorError::Rejected(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_vendor_is_retryable() {
    // Nothing listens on the discard port.
    let gateway = gateway_for("http://127.0.0.1:9".to_string());

    let err = gateway.submit(&radius_order(), &card()).await.unwrap_err();

    assert!(matches!(err, VendorError::Transient(_)));
}
