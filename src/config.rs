// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets are injected as environment variables by the deployment (Cloud Run
//! secret bindings) and read once at startup.

use crate::vendors::VendorKind;
use std::collections::HashMap;
use std::env;

/// Cloud Tasks queue used for vendor submissions.
pub const ORDER_QUEUE_NAME: &str = "order-submission";

/// Connection settings for one upstream vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorSettings {
    /// Base URL of the vendor API (no trailing slash)
    pub base_url: String,
    /// API key, token or user id depending on the vendor
    pub api_key: String,
    /// Secondary credential (password / secret) where the vendor needs one
    pub api_secret: Option<String>,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL (CORS origin)
    pub frontend_url: String,
    /// Public URL of this API (Cloud Tasks target + OIDC audience)
    pub api_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// GCP region for Cloud Tasks and KMS
    pub gcp_region: String,
    /// Server port
    pub port: u16,
    /// Admin account created on first start, if set
    pub bootstrap_admin_email: Option<String>,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Master key for vendor postback signatures
    pub postback_signing_key: Vec<u8>,
    /// Password for the bootstrap admin account
    pub bootstrap_admin_password: Option<String>,
    /// Upstream vendor credentials, only for configured vendors
    pub vendors: HashMap<VendorKind, VendorSettings>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let mut vendors = HashMap::new();
        for kind in VendorKind::ALL {
            if let Some(settings) = vendor_from_env(kind) {
                tracing::info!(vendor = %kind, base_url = %settings.base_url, "Vendor configured");
                vendors.insert(kind, settings);
            }
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            api_url: env::var("API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            gcp_region: env::var("GCP_REGION").unwrap_or_else(|_| "us-west1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            bootstrap_admin_email: optional_var("BOOTSTRAP_ADMIN_EMAIL"),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            postback_signing_key: env::var("POSTBACK_SIGNING_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("POSTBACK_SIGNING_KEY"))?
                .into_bytes(),
            bootstrap_admin_password: optional_var("BOOTSTRAP_ADMIN_PASSWORD"),
            vendors,
        })
    }

    /// Config for tests: every vendor points at a local address.
    pub fn test_default() -> Self {
        let vendors = VendorKind::ALL
            .into_iter()
            .map(|kind| {
                (
                    kind,
                    VendorSettings {
                        base_url: format!("http://127.0.0.1:9/{}", kind.slug()),
                        api_key: format!("{}-key", kind.slug()),
                        api_secret: Some(format!("{}-secret", kind.slug())),
                    },
                )
            })
            .collect();

        Self {
            frontend_url: "http://localhost:5173".to_string(),
            api_url: "http://localhost:8080".to_string(),
            gcp_project_id: "test-project".to_string(),
            gcp_region: "us-west1".to_string(),
            port: 8080,
            bootstrap_admin_email: None,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            postback_signing_key: b"test_postback_master_key".to_vec(),
            bootstrap_admin_password: None,
            vendors,
        }
    }

    /// Settings for a vendor, if it is configured.
    pub fn vendor(&self, kind: VendorKind) -> Option<&VendorSettings> {
        self.vendors.get(&kind)
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read `<PREFIX>_API_URL`, `<PREFIX>_API_KEY` and `<PREFIX>_API_SECRET`.
///
/// A vendor needs both URL and key to count as configured.
fn vendor_from_env(kind: VendorKind) -> Option<VendorSettings> {
    let prefix = kind.env_prefix();
    let base_url = optional_var(&format!("{prefix}_API_URL"))?;
    let api_key = optional_var(&format!("{prefix}_API_KEY"))?;

    Some(VendorSettings {
        base_url: base_url.trim_end_matches('/').to_string(),
        api_key,
        api_secret: optional_var(&format!("{prefix}_API_SECRET")),
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
