// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Verification of the OIDC ID tokens Cloud Tasks attaches to task requests.
//!
//! Task handlers submit orders with live payment details, so they only run
//! for RS256 tokens issued by Google to our task service account, with our
//! API URL as audience. Google's signing keys are fetched from its JWKS
//! endpoint and cached for the `max-age` Google advertises.

use crate::config::Config;
use anyhow::Context;
use axum::http::HeaderValue;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const FALLBACK_KEY_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Caller identity from a verified task token.
#[derive(Debug, Clone)]
pub struct VerifiedTaskPrincipal {
    pub email: String,
    pub subject: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OidcError {
    /// Token missing, malformed, or issued to someone else
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Google keys could not be fetched; the task should be retried
    #[error("transient: {0}")]
    Transient(String),
}

struct KeySet {
    keys: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

enum KeySource {
    /// Google's published keys, refreshed on expiry or unknown `kid`
    Jwks {
        cache: RwLock<Option<KeySet>>,
        refresh: Mutex<()>,
    },
    /// One fixed key, for tests that sign their own task tokens
    Static {
        kid: String,
        key: Arc<DecodingKey>,
    },
}

pub struct GoogleOidcVerifier {
    http: reqwest::Client,
    audience: String,
    service_account: String,
    source: KeySource,
}

impl GoogleOidcVerifier {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let verifier = Self::build(
            config,
            KeySource::Jwks {
                cache: RwLock::new(None),
                refresh: Mutex::new(()),
            },
        )?;

        tracing::info!(
            audience = %verifier.audience,
            service_account = %verifier.service_account,
            "Cloud Tasks OIDC verifier ready"
        );
        Ok(verifier)
    }

    /// Verifier that trusts only `key` under `kid`.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        anyhow::ensure!(!kid.trim().is_empty(), "static OIDC kid must not be empty");

        Self::build(
            config,
            KeySource::Static {
                kid,
                key: Arc::new(key),
            },
        )
    }

    fn build(config: &Config, source: KeySource) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building OIDC HTTP client")?;

        Ok(Self {
            http,
            audience: config.api_url.trim_end_matches('/').to_string(),
            service_account: task_service_account(&config.gcp_project_id),
            source,
        })
    }

    /// Verify the bearer token of a task request.
    pub async fn verify_cloud_tasks_token(
        &self,
        auth_header: Option<&HeaderValue>,
    ) -> Result<VerifiedTaskPrincipal, OidcError> {
        let token = bearer_token(auth_header)?;

        let header = decode_header(token).map_err(|e| forbidden(format!("bad JWT header: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(forbidden(format!("unexpected alg {:?}", header.alg)));
        }
        let kid = header.kid.ok_or_else(|| forbidden("token has no kid"))?;
        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_audience(&[self.audience.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<TaskTokenClaims>(token, &key, &validation)
            .map_err(|e| forbidden(format!("JWT validation failed: {e}")))?
            .claims;

        check_issued_at(claims.iat)?;

        let email = claims.email.ok_or_else(|| forbidden("token has no email"))?;
        if email != self.service_account {
            return Err(forbidden(format!("unexpected service account {email}")));
        }
        if claims.email_verified != Some(true) {
            return Err(forbidden("email not verified"));
        }

        Ok(VerifiedTaskPrincipal {
            email,
            subject: claims.sub,
        })
    }

    async fn key_for(&self, kid: &str) -> Result<Arc<DecodingKey>, OidcError> {
        let (cache, refresh) = match &self.source {
            KeySource::Static { kid: known, key } if known == kid => return Ok(key.clone()),
            KeySource::Static { .. } => return Err(forbidden(format!("unknown kid {kid}"))),
            KeySource::Jwks { cache, refresh } => (cache, refresh),
        };

        if let Some(key) = cached_key(cache, kid).await {
            return Ok(key);
        }

        // One fetch at a time; whoever waited re-checks the fresh cache.
        let _guard = refresh.lock().await;
        if let Some(key) = cached_key(cache, kid).await {
            return Ok(key);
        }

        let keys = self.fetch_jwks().await?;
        let key = keys.keys.get(kid).cloned();
        *cache.write().await = Some(keys);

        key.ok_or_else(|| forbidden(format!("kid {kid} not in Google JWKS")))
    }

    async fn fetch_jwks(&self) -> Result<KeySet, OidcError> {
        let response = self
            .http
            .get(GOOGLE_JWKS_URL)
            .send()
            .await
            .map_err(|e| OidcError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(OidcError::Transient(format!(
                "JWKS request returned {}",
                response.status()
            )));
        }

        let ttl = max_age(response.headers()).unwrap_or(FALLBACK_KEY_TTL);
        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| OidcError::Transient(format!("invalid JWKS body: {e}")))?;

        let keys: HashMap<_, _> = jwks
            .keys
            .into_iter()
            .filter(Jwk::is_rs256_signing_key)
            .filter_map(|jwk| match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => Some((jwk.kid, Arc::new(key))),
                Err(e) => {
                    tracing::warn!(kid = %jwk.kid, error = %e, "Skipping unusable JWKS key");
                    None
                }
            })
            .collect();

        if keys.is_empty() {
            return Err(OidcError::Transient("JWKS had no usable RSA keys".to_string()));
        }

        tracing::debug!(keys = keys.len(), ttl_secs = ttl.as_secs(), "Refreshed Google JWKS");
        Ok(KeySet {
            keys,
            expires_at: Instant::now() + ttl,
        })
    }
}

async fn cached_key(cache: &RwLock<Option<KeySet>>, kid: &str) -> Option<Arc<DecodingKey>> {
    cache
        .read()
        .await
        .as_ref()
        .filter(|set| set.expires_at > Instant::now())
        .and_then(|set| set.keys.get(kid).cloned())
}

#[derive(Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: String,
    e: String,
}

impl Jwk {
    fn is_rs256_signing_key(&self) -> bool {
        self.kty == "RSA"
            && !self.kid.trim().is_empty()
            && self.alg.as_deref().is_none_or(|alg| alg == "RS256")
            && self.key_use.as_deref().is_none_or(|u| u == "sig")
    }
}

#[derive(Deserialize)]
struct TaskTokenClaims {
    sub: String,
    iat: Option<u64>,
    email: Option<String>,
    email_verified: Option<bool>,
}

fn forbidden(reason: impl Into<String>) -> OidcError {
    OidcError::Forbidden(reason.into())
}

fn bearer_token(auth_header: Option<&HeaderValue>) -> Result<&str, OidcError> {
    let value = auth_header
        .ok_or_else(|| forbidden("missing Authorization header"))?
        .to_str()
        .map_err(|_| forbidden("Authorization header is not ASCII"))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(forbidden("expected a Bearer token")),
    }
}

fn check_issued_at(iat: Option<u64>) -> Result<(), OidcError> {
    let iat = iat.ok_or_else(|| forbidden("token has no iat"))?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    if iat > now + CLOCK_SKEW_SECS {
        return Err(forbidden("token issued in the future"));
    }
    Ok(())
}

/// `max-age` from a Cache-Control header.
fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim_matches('"').parse().ok())
        .map(Duration::from_secs)
}

/// Service account that signs task tokens; also set on queued tasks.
pub fn task_service_account(project_id: &str) -> String {
    format!("order-desk-api@{}.iam.gserviceaccount.com", project_id)
}
