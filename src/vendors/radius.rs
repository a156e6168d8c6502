// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Radius order API.
//!
//! `POST {base}/orders` with an `X-Api-Key` header and a flat camelCase body.
//! Responses look like `{"success": true, "orderId": "R-123"}` or
//! `{"success": false, "message": "..."}`.

use super::{dollars, field_str, Postback, VendorContract, VendorKind, VendorOutcome};
use crate::config::VendorSettings;
use crate::models::{Order, PaymentDetails};
use serde_json::{json, Value};

pub struct Radius;

impl VendorContract for Radius {
    fn kind(&self) -> VendorKind {
        VendorKind::Radius
    }

    fn endpoint(&self) -> &'static str {
        "/orders"
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        settings: &VendorSettings,
    ) -> reqwest::RequestBuilder {
        request.header("X-Api-Key", &settings.api_key)
    }

    fn build_payload(
        &self,
        order: &Order,
        payment: &PaymentDetails,
        _settings: &VendorSettings,
    ) -> Value {
        let c = &order.customer;
        let mut body = json!({
            "externalOrderId": order.id,
            "firstName": c.first_name,
            "lastName": c.last_name,
            "email": c.email,
            "phone": c.phone,
            "address1": c.address1,
            "address2": c.address2,
            "city": c.city,
            "state": c.state,
            "zip": c.zip,
            "productId": order.product.sku,
            "quantity": order.product.quantity,
            "amount": dollars(order.product.total_cents()),
            "comments": order.notes,
        });

        if let PaymentDetails::Card {
            card_number,
            exp_month,
            exp_year,
            cvv,
        } = payment
        {
            body["cardNumber"] = json!(card_number);
            body["cardExpMonth"] = json!(format!("{:02}", exp_month));
            body["cardExpYear"] = json!(super::validation::full_year(*exp_year).to_string());
            body["cvv"] = json!(cvv);
        }

        body
    }

    fn parse_response(&self, http_status: u16, body: &Value) -> Option<VendorOutcome> {
        let success = body.get("success")?.as_bool()?;
        let message = field_str(body, "message");

        if success {
            Some(VendorOutcome::approved(
                field_str(body, "orderId"),
                Some("success".to_string()),
            ))
        } else if http_status >= 400
            || body.get("declined").and_then(Value::as_bool) == Some(false)
        {
            // Card declines come back as 200; 4xx means the request itself was refused.
            Some(VendorOutcome::error(message, field_str(body, "errorCode")))
        } else {
            Some(VendorOutcome::declined(message, field_str(body, "errorCode")))
        }
    }

    fn parse_postback(&self, body: &Value) -> Option<Postback> {
        let order_ref = field_str(body, "externalOrderId")?;
        let status = field_str(body, "status")?;
        let message = field_str(body, "message");

        let outcome = match status.to_ascii_lowercase().as_str() {
            "approved" | "shipped" => {
                VendorOutcome::approved(field_str(body, "orderId"), Some(status))
            }
            "declined" | "cancelled" | "refunded" => VendorOutcome::declined(message, Some(status)),
            _ => return None,
        };

        Some(Postback { order_ref, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationStatus;
    use crate::vendors::test_support::{card, order, settings};

    #[test]
    fn payload_uses_radius_field_names() {
        let body = Radius.build_payload(&order(VendorKind::Radius), &card(), &settings());
        assert_eq!(body["externalOrderId"], "ord_0123456789abcdef");
        assert_eq!(body["firstName"], "Jane");
        assert_eq!(body["amount"], "49.99");
        assert_eq!(body["cardExpMonth"], "07");
        assert_eq!(body["cardExpYear"], "2031");
        assert!(body.get("first_name").is_none());
    }

    #[test]
    fn parses_success_and_decline() {
        let ok = Radius
            .parse_response(200, &json!({"success": true, "orderId": "R-1"}))
            .unwrap();
        assert_eq!(ok.status, ValidationStatus::Approved);
        assert_eq!(ok.vendor_order_id.as_deref(), Some("R-1"));

        let declined = Radius
            .parse_response(200, &json!({"success": false, "message": "Insufficient funds", "errorCode": "51"}))
            .unwrap();
        assert_eq!(declined.status, ValidationStatus::Declined);
        assert_eq!(declined.message.as_deref(), Some("Insufficient funds"));
        assert_eq!(declined.response_code.as_deref(), Some("51"));

        let error = Radius
            .parse_response(400, &json!({"success": false, "declined": false, "message": "bad zip"}))
            .unwrap();
        assert_eq!(error.status, ValidationStatus::Error);
    }

    #[test]
    fn rejected_credentials_are_errors_not_declines() {
        for status in [401, 403] {
            let outcome = Radius
                .parse_response(status, &json!({"success": false, "message": "bad key"}))
                .unwrap();
            assert_eq!(outcome.status, ValidationStatus::Error);
            assert_eq!(outcome.message.as_deref(), Some("bad key"));
        }
    }

    #[test]
    fn unknown_shape_is_none() {
        assert!(Radius.parse_response(502, &json!({"error": "gateway"})).is_none());
    }

    #[test]
    fn postback_refund_is_a_decline() {
        let postback = Radius
            .parse_postback(&json!({"externalOrderId": "ord_1", "status": "Refunded"}))
            .unwrap();
        assert_eq!(postback.order_ref, "ord_1");
        assert_eq!(postback.outcome.status, ValidationStatus::Declined);
        assert!(Radius
            .parse_postback(&json!({"externalOrderId": "ord_1", "status": "processing"}))
            .is_none());
    }
}
