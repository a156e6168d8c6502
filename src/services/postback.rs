// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vendor postback signatures.
//!
//! Each vendor signs its postbacks with HMAC-SHA256 over the raw request
//! body, hex-encoded in `X-Signature`. The vendor's key is derived from
//! `POSTBACK_SIGNING_KEY` with HKDF-SHA256 (info `postback:<slug>`), so one
//! leaked vendor key cannot forge another vendor's postbacks.

use crate::vendors::VendorKind;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex signature.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Derive the signing key shared with one vendor.
pub fn vendor_signing_key(master_key: &[u8], vendor: VendorKind) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, master_key);
    let info = format!("postback:{}", vendor.slug());
    let mut okm = [0u8; 32];
    if hk.expand(info.as_bytes(), &mut okm).is_err() {
        tracing::error!("HKDF expand failed for postback key");
    }
    okm
}

fn mac_bytes(master_key: &[u8], vendor: VendorKind, body: &[u8]) -> Option<Vec<u8>> {
    let key = vendor_signing_key(master_key, vendor);
    let mut mac = <HmacSha256 as Mac>::new_from_slice(&key).ok()?;
    mac.update(body);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Hex HMAC-SHA256 of `body` under the vendor's key.
pub fn sign(master_key: &[u8], vendor: VendorKind, body: &[u8]) -> String {
    mac_bytes(master_key, vendor, body)
        .map(hex::encode)
        .unwrap_or_default()
}

/// Check a postback signature in constant time.
pub fn verify(master_key: &[u8], vendor: VendorKind, body: &[u8], signature_hex: &str) -> bool {
    let Ok(provided) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Some(expected) = mac_bytes(master_key, vendor, body) else {
        return false;
    };

    expected.as_slice().ct_eq(provided.as_slice()).into()
}
