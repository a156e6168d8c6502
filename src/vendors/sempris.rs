// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sempris enrollment API.
//!
//! `POST {base}/v2/enrollments` with HTTP Basic auth (key:secret) and a nested
//! body of `customer`, `payment` and `offer`. Amounts are integer cents.
//! Responses carry `status` of `APPROVED`, `DECLINED` or `ERROR`.

use super::{field_str, Postback, VendorContract, VendorKind, VendorOutcome};
use crate::config::VendorSettings;
use crate::models::order::AccountType;
use crate::models::{Order, PaymentDetails};
use serde_json::{json, Value};

pub struct Sempris;

impl VendorContract for Sempris {
    fn kind(&self) -> VendorKind {
        VendorKind::Sempris
    }

    fn endpoint(&self) -> &'static str {
        "/v2/enrollments"
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        settings: &VendorSettings,
    ) -> reqwest::RequestBuilder {
        request.basic_auth(&settings.api_key, settings.api_secret.as_deref())
    }

    fn build_payload(
        &self,
        order: &Order,
        payment: &PaymentDetails,
        _settings: &VendorSettings,
    ) -> Value {
        let c = &order.customer;
        let payment = match payment {
            PaymentDetails::Card {
                card_number,
                exp_month,
                exp_year,
                cvv,
            } => json!({
                "type": "CREDIT_CARD",
                "cardNumber": card_number,
                "expiration": format!("{:02}/{:02}", exp_month, super::validation::full_year(*exp_year) % 100),
                "securityCode": cvv,
            }),
            PaymentDetails::Ach {
                routing_number,
                account_number,
                account_type,
            } => json!({
                "type": "ACH",
                "routingNumber": routing_number,
                "accountNumber": account_number,
                "accountType": match account_type {
                    AccountType::Checking => "CHECKING",
                    AccountType::Savings => "SAVINGS",
                },
            }),
        };

        json!({
            "merchantReference": order.id,
            "customer": {
                "givenName": c.first_name,
                "familyName": c.last_name,
                "emailAddress": c.email,
                "phoneNumber": c.phone,
                "address": {
                    "line1": c.address1,
                    "line2": c.address2,
                    "locality": c.city,
                    "region": c.state,
                    "postalCode": c.zip,
                    "country": c.country,
                },
            },
            "payment": payment,
            "offer": {
                "code": order.product.sku,
                "quantity": order.product.quantity,
                "amountCents": order.product.total_cents(),
            },
        })
    }

    fn parse_response(&self, _http_status: u16, body: &Value) -> Option<VendorOutcome> {
        let status = body.get("status")?.as_str()?;
        let reason = field_str(body, "reason");
        let code = Some(status.to_string());

        match status {
            "APPROVED" => Some(VendorOutcome::approved(field_str(body, "transactionId"), code)),
            "DECLINED" => Some(VendorOutcome::declined(reason, code)),
            "ERROR" => Some(VendorOutcome::error(reason, code)),
            _ => None,
        }
    }

    fn parse_postback(&self, body: &Value) -> Option<Postback> {
        let order_ref = field_str(body, "merchantReference")?;
        let outcome = self.parse_response(200, body)?;
        Some(Postback { order_ref, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationStatus;
    use crate::vendors::test_support::{ach, card, order, settings};

    #[test]
    fn card_payload_is_nested() {
        let body = Sempris.build_payload(&order(VendorKind::Sempris), &card(), &settings());
        assert_eq!(body["merchantReference"], "ord_0123456789abcdef");
        assert_eq!(body["customer"]["givenName"], "Jane");
        assert_eq!(body["customer"]["address"]["region"], "CA");
        assert_eq!(body["payment"]["type"], "CREDIT_CARD");
        assert_eq!(body["payment"]["expiration"], "07/31");
        assert_eq!(body["offer"]["amountCents"], 4999);
    }

    #[test]
    fn ach_payload_branch() {
        let body = Sempris.build_payload(&order(VendorKind::Sempris), &ach(), &settings());
        assert_eq!(body["payment"]["type"], "ACH");
        assert_eq!(body["payment"]["accountType"], "CHECKING");
        assert!(body["payment"].get("cardNumber").is_none());
    }

    #[test]
    fn parses_status_values() {
        let approved = Sempris
            .parse_response(201, &json!({"status": "APPROVED", "transactionId": "T9"}))
            .unwrap();
        assert_eq!(approved.status, ValidationStatus::Approved);
        assert_eq!(approved.vendor_order_id.as_deref(), Some("T9"));

        let declined = Sempris
            .parse_response(200, &json!({"status": "DECLINED", "reason": "Do not honor"}))
            .unwrap();
        assert_eq!(declined.status, ValidationStatus::Declined);
        assert_eq!(declined.message.as_deref(), Some("Do not honor"));

        let error = Sempris.parse_response(422, &json!({"status": "ERROR"})).unwrap();
        assert_eq!(error.status, ValidationStatus::Error);

        assert!(Sempris.parse_response(200, &json!({"status": "QUEUED"})).is_none());
    }

    #[test]
    fn postback_reuses_response_shape() {
        let postback = Sempris
            .parse_postback(&json!({"merchantReference": "ord_9", "status": "DECLINED", "reason": "chargeback"}))
            .unwrap();
        assert_eq!(postback.order_ref, "ord_9");
        assert_eq!(postback.outcome.status, ValidationStatus::Declined);
    }
}
