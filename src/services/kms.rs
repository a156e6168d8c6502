// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud KMS service for encrypting payment details awaiting submission.
//!
//! Uses direct KMS encryption (not envelope encryption). Every ciphertext is
//! bound to its order via additional authenticated data, so a ciphertext
//! copied onto another order fails to decrypt.

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use google_cloud_googleapis::cloud::kms::v1::{DecryptRequest, EncryptRequest};
use google_cloud_kms::client::{Client, ClientConfig};
use std::sync::Arc;

/// Separates the AAD from the plaintext inside a mock "ciphertext".
#[cfg(debug_assertions)]
const MOCK_AAD_SEPARATOR: char = '|';

#[derive(Clone)]
enum Backend {
    Cloud {
        /// projects/{project}/locations/{location}/keyRings/{ring}/cryptoKeys/{key}
        key_path: String,
        client: Arc<Client>,
    },
    /// Reversible base64 encoding that still enforces the AAD. Debug builds only.
    #[cfg(debug_assertions)]
    Mock,
}

fn kms_error(context: &str, err: impl std::fmt::Display) -> AppError {
    AppError::Internal(anyhow::anyhow!("{}: {}", context, err))
}

/// Encrypts payment details awaiting submission.
#[derive(Clone)]
pub struct KmsService {
    backend: Backend,
}

impl KmsService {
    const KEY_RING_NAME: &str = "order-desk";

    /// Key used for pending payment details.
    pub const PAYMENT_KEY_NAME: &str = "payment-details";

    pub async fn new(project_id: &str, location: &str, key_name: &str) -> Result<Self, AppError> {
        let key_path = format!(
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{}",
            project_id,
            location,
            Self::KEY_RING_NAME,
            key_name
        );
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| kms_error("Failed to create KMS auth config", e))?;
        let client = Client::new(config)
            .await
            .map_err(|e| kms_error("Failed to create KMS client", e))?;

        Ok(Self {
            backend: Backend::Cloud {
                key_path,
                client: Arc::new(client),
            },
        })
    }

    /// Offline service for tests and local development.
    #[cfg(debug_assertions)]
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Mock,
        }
    }

    /// Encrypt `plaintext` bound to `aad`, returning base64 ciphertext.
    pub async fn encrypt(&self, plaintext: &str, aad: &[u8]) -> Result<String, AppError> {
        let ciphertext = match &self.backend {
            Backend::Cloud { key_path, client } => {
                let request = EncryptRequest {
                    name: key_path.clone(),
                    plaintext: plaintext.as_bytes().to_vec(),
                    additional_authenticated_data: aad.to_vec(),
                    ..Default::default()
                };
                client
                    .encrypt(request, None)
                    .await
                    .map_err(|e| kms_error("KMS encrypt failed", e))?
                    .ciphertext
            }
            #[cfg(debug_assertions)]
            Backend::Mock => {
                format!("{}{}{}", BASE64.encode(aad), MOCK_AAD_SEPARATOR, plaintext).into_bytes()
            }
        };
        Ok(BASE64.encode(ciphertext))
    }

    /// Decrypt base64 ciphertext produced by [`encrypt`](Self::encrypt) with the same `aad`.
    pub async fn decrypt(&self, ciphertext_b64: &str, aad: &[u8]) -> Result<String, AppError> {
        let ciphertext = BASE64
            .decode(ciphertext_b64)
            .map_err(|e| kms_error("Base64 ciphertext decode failed", e))?;

        let plaintext = match &self.backend {
            Backend::Cloud { key_path, client } => {
                let request = DecryptRequest {
                    name: key_path.clone(),
                    ciphertext,
                    additional_authenticated_data: aad.to_vec(),
                    ..Default::default()
                };
                client
                    .decrypt(request, None)
                    .await
                    .map_err(|e| kms_error("KMS decrypt failed", e))?
                    .plaintext
            }
            #[cfg(debug_assertions)]
            Backend::Mock => {
                let text = String::from_utf8(ciphertext)
                    .map_err(|e| kms_error("Malformed mock ciphertext", e))?;
                let (aad_b64, plaintext) = text
                    .split_once(MOCK_AAD_SEPARATOR)
                    .ok_or_else(|| kms_error("Malformed mock ciphertext", "no separator"))?;
                if aad_b64 != BASE64.encode(aad) {
                    return Err(kms_error("KMS decrypt failed (mock)", "AAD mismatch"));
                }
                plaintext.as_bytes().to_vec()
            }
        };

        String::from_utf8(plaintext).map_err(|e| kms_error("UTF-8 decode failed", e))
    }
}

/// AAD binding a payment ciphertext to its order.
pub fn payment_aad(order_id: &str) -> Vec<u8> {
    format!("order_id:{}", order_id).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_round_trip_with_matching_aad() {
        let kms = KmsService::new_mock();
        let aad = payment_aad("ord_1");
        let ciphertext = kms.encrypt("{\"cvv\":\"123\"}", &aad).await.unwrap();

        assert!(!ciphertext.contains("cvv"));
        let plaintext = kms.decrypt(&ciphertext, &aad).await.unwrap();
        assert_eq!(plaintext, "{\"cvv\":\"123\"}");
    }

    #[tokio::test]
    async fn mock_rejects_other_order_aad() {
        let kms = KmsService::new_mock();
        let ciphertext = kms.encrypt("secret", &payment_aad("ord_1")).await.unwrap();
        assert!(kms.decrypt(&ciphertext, &payment_aad("ord_2")).await.is_err());
    }

    #[tokio::test]
    async fn mock_rejects_garbage() {
        let kms = KmsService::new_mock();
        assert!(kms.decrypt("not base64!!", b"x").await.is_err());
        assert!(kms.decrypt(&BASE64.encode("no separator"), b"x").await.is_err());
    }
}
