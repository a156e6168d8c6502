// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sublytics order API.
//!
//! `POST {base}/api/order/doAddProcess` with `user_id`/`user_password` in
//! the body. Responses are `{"status": bool, "message": ..., "data": {...}}`.

use super::{dollars, field_str, Postback, VendorContract, VendorKind, VendorOutcome};
use crate::config::VendorSettings;
use crate::models::{Order, PaymentDetails};
use serde_json::{json, Value};

pub struct Sublytics;

impl VendorContract for Sublytics {
    fn kind(&self) -> VendorKind {
        VendorKind::Sublytics
    }

    fn endpoint(&self) -> &'static str {
        "/api/order/doAddProcess"
    }

    fn build_payload(
        &self,
        order: &Order,
        payment: &PaymentDetails,
        settings: &VendorSettings,
    ) -> Value {
        let c = &order.customer;
        let mut body = json!({
            "user_id": settings.api_key,
            "user_password": settings.api_secret,
            "connection_id": 1,
            "external_order_id": order.id,
            "bill_fname": c.first_name,
            "bill_lname": c.last_name,
            "email": c.email,
            "phone": c.phone,
            "bill_address1": c.address1,
            "bill_address2": c.address2,
            "bill_city": c.city,
            "bill_state": c.state,
            "bill_zipcode": c.zip,
            "bill_country": c.country,
            "offers": [{
                "offer_id": order.product.sku,
                "order_offer_quantity": order.product.quantity,
                "order_offer_price": dollars(order.product.unit_price_cents),
            }],
            "notes": order.notes,
        });

        if let PaymentDetails::Card {
            card_number,
            exp_month,
            exp_year,
            cvv,
        } = payment
        {
            body["payment_method_id"] = json!(1);
            body["card_number"] = json!(card_number);
            body["card_exp_month"] = json!(format!("{:02}", exp_month));
            body["card_exp_year"] = json!(super::validation::full_year(*exp_year).to_string());
            body["card_cvv"] = json!(cvv);
        }

        body
    }

    fn parse_response(&self, _http_status: u16, body: &Value) -> Option<VendorOutcome> {
        let status = body.get("status")?.as_bool()?;
        let message = field_str(body, "message");
        let data = body.get("data");

        if status {
            let order_id = data.and_then(|d| field_str(d, "order_id"));
            return Some(VendorOutcome::approved(order_id, Some("true".to_string())));
        }

        // Gateway declines come back with a transaction response attached
        let gateway_code = data.and_then(|d| field_str(d, "gateway_response_code"));
        if gateway_code.is_some() {
            Some(VendorOutcome::declined(message, gateway_code))
        } else {
            Some(VendorOutcome::error(message, Some("false".to_string())))
        }
    }

    fn parse_postback(&self, body: &Value) -> Option<Postback> {
        let order_ref = field_str(body, "external_order_id")?;
        let status = field_str(body, "order_status")?;

        let outcome = match status.as_str() {
            "approved" | "completed" => {
                VendorOutcome::approved(field_str(body, "order_id"), Some(status))
            }
            "declined" | "refunded" | "chargeback" => {
                VendorOutcome::declined(field_str(body, "message"), Some(status))
            }
            _ => return None,
        };
        Some(Postback { order_ref, outcome })
    }
}
