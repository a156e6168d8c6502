// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing (PBKDF2-HMAC-SHA256) and random identifiers.
//!
//! Hashes are stored as `pbkdf2_sha256$<iterations>$<salt_b64>$<hash_b64>`
//! so the iteration count can be raised later without invalidating
//! existing hashes.

use base64::{engine::general_purpose::STANDARD_NO_PAD as B64, Engine as _};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;

const SCHEME: &str = "pbkdf2_sha256";
const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error(
        "Password must be between {} and {} characters",
        MIN_PASSWORD_LEN,
        MAX_PASSWORD_LEN
    )]
    Policy,

    #[error("Random number generator failure")]
    Rng,
}

/// Check the password policy (length only).
pub fn check_policy(password: &str) -> Result<(), PasswordError> {
    let len = password.chars().count();
    if (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        Ok(())
    } else {
        Err(PasswordError::Policy)
    }
}

/// Hash a password that satisfies the policy.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    check_policy(password)?;

    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| PasswordError::Rng)?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(
        PBKDF2_ALG,
        iterations(ITERATIONS),
        &salt,
        password.as_bytes(),
        &mut hash,
    );

    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        ITERATIONS,
        B64.encode(salt),
        B64.encode(hash)
    ))
}

/// Verify a password against a stored hash in constant time.
///
/// Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iters), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    if scheme != SCHEME {
        return false;
    }
    let Some(iters) = iters.parse::<u32>().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (B64.decode(salt), B64.decode(hash)) else {
        return false;
    };

    pbkdf2::verify(PBKDF2_ALG, iters, &salt, password.as_bytes(), &hash).is_ok()
}

/// Random hex identifier with a type prefix, e.g. `ord_3f9a...`.
pub fn new_id(prefix: &str) -> Result<String, PasswordError> {
    let mut bytes = [0u8; 12];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| PasswordError::Rng)?;
    Ok(format!("{}_{}", prefix, hex::encode(bytes)))
}

fn iterations(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}
