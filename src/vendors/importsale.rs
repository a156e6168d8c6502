// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ImportSale sales import API.
//!
//! `POST {base}/sales/import` with `Authorization: Token <key>`. The body
//! carries an envelope `code`: 200 is accepted, 402 is a payment decline,
//! anything else is an error.

use super::{dollars, field_str, Postback, VendorContract, VendorKind, VendorOutcome};
use crate::config::VendorSettings;
use crate::models::order::AccountType;
use crate::models::{Order, PaymentDetails};
use serde_json::{json, Value};

pub struct ImportSale;

impl VendorContract for ImportSale {
    fn kind(&self) -> VendorKind {
        VendorKind::ImportSale
    }

    fn endpoint(&self) -> &'static str {
        "/sales/import"
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        settings: &VendorSettings,
    ) -> reqwest::RequestBuilder {
        request.header(
            reqwest::header::AUTHORIZATION,
            format!("Token {}", settings.api_key),
        )
    }

    fn build_payload(
        &self,
        order: &Order,
        payment: &PaymentDetails,
        _settings: &VendorSettings,
    ) -> Value {
        let c = &order.customer;
        let billing = match payment {
            PaymentDetails::Card {
                card_number,
                exp_month,
                exp_year,
                cvv,
            } => json!({
                "kind": "card",
                "number": card_number,
                "exp": format!("{:02}/{}", exp_month, super::validation::full_year(*exp_year)),
                "cvc": cvv,
            }),
            PaymentDetails::Ach {
                routing_number,
                account_number,
                account_type,
            } => json!({
                "kind": "bank",
                "routing": routing_number,
                "account": account_number,
                "account_kind": match account_type {
                    AccountType::Checking => "checking",
                    AccountType::Savings => "savings",
                },
            }),
        };

        json!({
            "sale": {
                "reference": order.id,
                "product": order.product.sku,
                "description": order.product.description,
                "quantity": order.product.quantity,
                "total": dollars(order.product.total_cents()),
                "note": order.notes,
            },
            "contact": {
                "first_name": c.first_name,
                "last_name": c.last_name,
                "email": c.email,
                "phone": c.phone,
                "street": c.address1,
                "street2": c.address2,
                "city": c.city,
                "state": c.state,
                "postcode": c.zip,
                "country": c.country,
            },
            "billing": billing,
        })
    }

    fn parse_response(&self, _http_status: u16, body: &Value) -> Option<VendorOutcome> {
        let code = body.get("code")?.as_u64()?;
        let message = field_str(body, "message");
        let code_str = Some(code.to_string());

        Some(match code {
            200 => {
                let sale_id = body.get("data").and_then(|d| field_str(d, "saleId"));
                VendorOutcome::approved(sale_id, code_str)
            }
            402 => VendorOutcome::declined(message, code_str),
            _ => VendorOutcome::error(message, code_str),
        })
    }

    fn parse_postback(&self, body: &Value) -> Option<Postback> {
        let data = body.get("data")?;
        let order_ref = field_str(data, "reference")?;
        let outcome = self.parse_response(200, body)?;
        Some(Postback { order_ref, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationStatus;
    use crate::vendors::test_support::{ach, order, settings};

    #[test]
    fn payload_groups_sale_contact_billing() {
        let body = ImportSale.build_payload(&order(VendorKind::ImportSale), &ach(), &settings());
        assert_eq!(body["sale"]["reference"], "ord_0123456789abcdef");
        assert_eq!(body["sale"]["total"], "49.99");
        assert_eq!(body["contact"]["postcode"], "94105");
        assert_eq!(body["billing"]["kind"], "bank");
        assert_eq!(body["billing"]["account_kind"], "checking");
    }

    #[test]
    fn envelope_codes() {
        let ok = ImportSale
            .parse_response(200, &json!({"code": 200, "data": {"saleId": 314}}))
            .unwrap();
        assert_eq!(ok.status, ValidationStatus::Approved);
        assert_eq!(ok.vendor_order_id.as_deref(), Some("314"));

        let declined = ImportSale
            .parse_response(200, &json!({"code": 402, "message": "card declined"}))
            .unwrap();
        assert_eq!(declined.status, ValidationStatus::Declined);

        let error = ImportSale
            .parse_response(200, &json!({"code": 422, "message": "bad state"}))
            .unwrap();
        assert_eq!(error.status, ValidationStatus::Error);
        assert_eq!(error.response_code.as_deref(), Some("422"));

        assert!(ImportSale.parse_response(200, &json!({"ok": true})).is_none());
    }

    #[test]
    fn postback_reference_is_inside_data() {
        let postback = ImportSale
            .parse_postback(&json!({"code": 402, "message": "chargeback", "data": {"reference": "ord_5"}}))
            .unwrap();
        assert_eq!(postback.order_ref, "ord_5");
        assert_eq!(postback.outcome.status, ValidationStatus::Declined);
    }
}
