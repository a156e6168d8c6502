// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for vendor order submission.
//!
//! Handles:
//! - Per-vendor credentials and endpoints
//! - Mapping responses to a normalized `VendorOutcome`
//! - Classifying failures as retryable (for Cloud Tasks retry) or final

use super::{VendorKind, VendorOutcome};
use crate::config::{Config, VendorSettings};
use crate::models::{Order, PaymentDetails};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Submission failures that did not produce a vendor decision.
#[derive(Debug, thiserror::Error)]
pub enum VendorError {
    #[error("{0} is not configured")]
    NotConfigured(VendorKind),

    /// Transport error, rate limit or 5xx. Safe to retry.
    #[error("Vendor temporarily unavailable: {0}")]
    Transient(String),

    /// Response the vendor contract cannot interpret. Not retried.
    #[error("Unexpected vendor response: {0}")]
    Rejected(String),
}

impl VendorError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, VendorError::Transient(_))
    }
}

/// Sends orders to vendors.
#[derive(Clone)]
pub struct VendorGateway {
    http: reqwest::Client,
    vendors: Arc<HashMap<VendorKind, VendorSettings>>,
}

impl VendorGateway {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build vendor HTTP client, using defaults");
                reqwest::Client::new()
            });

        Self {
            http,
            vendors: Arc::new(config.vendors.clone()),
        }
    }

    pub fn is_configured(&self, kind: VendorKind) -> bool {
        self.vendors.contains_key(&kind)
    }

    /// Submit an order with its full payment details.
    pub async fn submit(
        &self,
        order: &Order,
        payment: &PaymentDetails,
    ) -> Result<VendorOutcome, VendorError> {
        let kind = order.vendor;
        let settings = self
            .vendors
            .get(&kind)
            .ok_or(VendorError::NotConfigured(kind))?;
        let contract = kind.contract();

        let url = format!("{}{}", settings.base_url, contract.endpoint());
        let payload = contract.build_payload(order, payment, settings);

        tracing::info!(vendor = %kind, order_id = %order.id, "Submitting order to vendor");

        let response = contract
            .authorize(self.http.post(&url), settings)
            .json(&payload)
            .send()
            .await
            .map_err(|e| VendorError::Transient(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        if status == 429 {
            tracing::warn!(vendor = %kind, order_id = %order.id, "Vendor rate limit hit (429)");
            return Err(VendorError::Transient("HTTP 429".to_string()));
        }
        if status >= 500 {
            tracing::warn!(vendor = %kind, order_id = %order.id, status, "Vendor server error");
            return Err(VendorError::Transient(format!("HTTP {}", status)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| VendorError::Transient(format!("Failed to read response: {}", e)))?;

        let outcome = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|body| contract.parse_response(status, &body));

        match outcome {
            Some(outcome) => {
                tracing::info!(
                    vendor = %kind,
                    order_id = %order.id,
                    status = outcome.status.as_str(),
                    response_code = outcome.response_code.as_deref().unwrap_or(""),
                    "Vendor responded"
                );
                Ok(outcome)
            }
            None => {
                tracing::error!(vendor = %kind, order_id = %order.id, status, "Unparseable vendor response");
                Err(VendorError::Rejected(format!(
                    "HTTP {}: {}",
                    status,
                    truncate(&text, 200)
                )))
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
