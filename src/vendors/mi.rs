// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! MI order import API: bearer token auth, snake_case body, amounts in cents.

use super::{field_str, Postback, VendorContract, VendorKind, VendorOutcome};
use crate::config::VendorSettings;
use crate::models::{Order, PaymentDetails};
use serde_json::{json, Value};

pub struct Mi;

impl VendorContract for Mi {
    fn kind(&self) -> VendorKind {
        VendorKind::Mi
    }

    fn endpoint(&self) -> &'static str {
        "/import/order"
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        settings: &VendorSettings,
    ) -> reqwest::RequestBuilder {
        request.bearer_auth(&settings.api_key)
    }

    fn build_payload(
        &self,
        order: &Order,
        payment: &PaymentDetails,
        _settings: &VendorSettings,
    ) -> Value {
        let c = &order.customer;
        let mut body = json!({
            "client_order_id": order.id,
            "bill_first_name": c.first_name,
            "bill_last_name": c.last_name,
            "email": c.email,
            "phone": c.phone,
            "bill_address_1": c.address1,
            "bill_address_2": c.address2,
            "bill_city": c.city,
            "bill_state": c.state,
            "bill_zip": c.zip,
            "items": [{
                "sku": order.product.sku,
                "qty": order.product.quantity,
                "price_cents": order.product.unit_price_cents,
            }],
            "total_cents": order.product.total_cents(),
            "comment": order.notes,
        });

        if let PaymentDetails::Card {
            card_number,
            exp_month,
            exp_year,
            cvv,
        } = payment
        {
            body["cc_number"] = json!(card_number);
            body["cc_exp_month"] = json!(exp_month);
            body["cc_exp_year"] = json!(super::validation::full_year(*exp_year));
            body["cc_cvv"] = json!(cvv);
        }

        body
    }

    fn parse_response(&self, _http_status: u16, body: &Value) -> Option<VendorOutcome> {
        let result = body.get("result")?.as_str()?;
        match result {
            "ok" => Some(VendorOutcome::approved(
                field_str(body, "order_id"),
                Some(result.to_string()),
            )),
            "declined" => Some(VendorOutcome::declined(
                first_error(body),
                field_str(body, "decline_code"),
            )),
            "error" => Some(VendorOutcome::error(first_error(body), Some(result.to_string()))),
            _ => None,
        }
    }

    fn parse_postback(&self, body: &Value) -> Option<Postback> {
        let order_ref = field_str(body, "client_order_id")?;
        let outcome = self.parse_response(200, body)?;
        Some(Postback { order_ref, outcome })
    }
}

/// MI reports problems as an `errors` array of strings.
fn first_error(body: &Value) -> Option<String> {
    let errors: Vec<&str> = body
        .get("errors")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .collect();
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationStatus;
    use crate::vendors::test_support::{card, order, settings};

    #[test]
    fn payload_is_snake_case_with_items() {
        let body = Mi.build_payload(&order(VendorKind::Mi), &card(), &settings());
        assert_eq!(body["client_order_id"], "ord_0123456789abcdef");
        assert_eq!(body["bill_state"], "CA");
        assert_eq!(body["items"][0]["sku"], "SKU-1");
        assert_eq!(body["items"][0]["price_cents"], 4999);
        assert_eq!(body["cc_exp_year"], 2031);
    }

    #[test]
    fn error_list_is_joined() {
        let outcome = Mi
            .parse_response(
                400,
                &json!({"result": "error", "errors": ["bill_zip invalid", "phone required"]}),
            )
            .unwrap();
        assert_eq!(outcome.status, ValidationStatus::Error);
        assert_eq!(
            outcome.message.as_deref(),
            Some("bill_zip invalid; phone required")
        );
    }

    #[test]
    fn ok_and_declined() {
        let ok = Mi
            .parse_response(200, &json!({"result": "ok", "order_id": "MI-77"}))
            .unwrap();
        assert_eq!(ok.status, ValidationStatus::Approved);
        assert_eq!(ok.vendor_order_id.as_deref(), Some("MI-77"));

        let declined = Mi
            .parse_response(200, &json!({"result": "declined", "decline_code": "05"}))
            .unwrap();
        assert_eq!(declined.status, ValidationStatus::Declined);
        assert_eq!(declined.message.as_deref(), Some("Declined by vendor"));
        assert_eq!(declined.response_code.as_deref(), Some("05"));
    }
}
