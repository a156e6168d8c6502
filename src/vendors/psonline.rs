// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PSOnline order API.
//!
//! `POST {base}/api/Order/Create`. Credentials travel in the body as
//! `ApiKey`/`ApiSecret`; all fields are PascalCase. `ResponseCode` is
//! "1" (approved), "2" (declined) or "3" (error).

use super::{dollars, field_str, Postback, VendorContract, VendorKind, VendorOutcome};
use crate::config::VendorSettings;
use crate::models::order::AccountType;
use crate::models::{Order, PaymentDetails};
use serde_json::{json, Value};

pub struct PsOnline;

impl VendorContract for PsOnline {
    fn kind(&self) -> VendorKind {
        VendorKind::PsOnline
    }

    fn endpoint(&self) -> &'static str {
        "/api/Order/Create"
    }

    fn build_payload(
        &self,
        order: &Order,
        payment: &PaymentDetails,
        settings: &VendorSettings,
    ) -> Value {
        let c = &order.customer;
        let mut body = json!({
            "ApiKey": settings.api_key,
            "ApiSecret": settings.api_secret,
            "ReferenceNumber": order.id,
            "FirstName": c.first_name,
            "LastName": c.last_name,
            "EmailAddress": c.email,
            "PhoneNumber": c.phone,
            "BillingAddress1": c.address1,
            "BillingAddress2": c.address2,
            "BillingCity": c.city,
            "BillingState": c.state,
            "BillingZip": c.zip,
            "BillingCountry": c.country,
            "ProductCode": order.product.sku,
            "Quantity": order.product.quantity,
            "OrderTotal": dollars(order.product.total_cents()),
            "Notes": order.notes,
        });

        match payment {
            PaymentDetails::Card {
                card_number,
                exp_month,
                exp_year,
                cvv,
            } => {
                body["PaymentType"] = json!("CC");
                body["CardNumber"] = json!(card_number);
                body["ExpirationDate"] = json!(format!(
                    "{:02}{:02}",
                    exp_month,
                    super::validation::full_year(*exp_year) % 100
                ));
                body["CVV2"] = json!(cvv);
            }
            PaymentDetails::Ach {
                routing_number,
                account_number,
                account_type,
            } => {
                body["PaymentType"] = json!("ACH");
                body["RoutingNumber"] = json!(routing_number);
                body["AccountNumber"] = json!(account_number);
                body["AccountType"] = json!(match account_type {
                    AccountType::Checking => "C",
                    AccountType::Savings => "S",
                });
            }
        }

        body
    }

    fn parse_response(&self, _http_status: u16, body: &Value) -> Option<VendorOutcome> {
        let code = field_str(body, "ResponseCode")?;
        let text = field_str(body, "ResponseText");

        match code.as_str() {
            "1" => Some(VendorOutcome::approved(field_str(body, "OrderID"), Some(code))),
            "2" => Some(VendorOutcome::declined(text, Some(code))),
            "3" => Some(VendorOutcome::error(text, Some(code))),
            _ => None,
        }
    }

    fn parse_postback(&self, body: &Value) -> Option<Postback> {
        let order_ref = field_str(body, "ReferenceNumber")?;
        let outcome = self.parse_response(200, body)?;
        Some(Postback { order_ref, outcome })
    }
}
