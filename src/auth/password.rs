// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-way password hashing (PBKDF2-HMAC-SHA256).
//!
//! Encoded form: `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>`.
//! The iteration count travels with the hash, so raising the default does not
//! invalidate existing accounts.

use std::num::NonZeroU32;

use base64ct::{Base64, Encoding};
use ring::{
    digest, pbkdf2,
    rand::{SecureRandom, SystemRandom},
};

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;

/// Default work factor for newly hashed passwords.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("iteration count must be non-zero")]
    ZeroIterations,

    #[error("system random source failed")]
    Random,
}

#[derive(Clone)]
pub struct PasswordHasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Result<Self, PasswordError> {
        let iterations = NonZeroU32::new(iterations).ok_or(PasswordError::ZeroIterations)?;
        Ok(Self {
            iterations,
            rng: SystemRandom::new(),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt).map_err(|_| PasswordError::Random)?;

        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            &salt,
            password.as_bytes(),
            &mut hash,
        );

        Ok(format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            Base64::encode_string(&salt),
            Base64::encode_string(&hash)
        ))
    }

    /// Constant-time comparison against an encoded hash.
    ///
    /// Anything that does not parse simply fails to verify.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let Some((iterations, salt, expected)) = parse(encoded) else {
            return false;
        };
        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            &salt,
            password.as_bytes(),
            &expected,
        )
        .is_ok()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            iterations: NonZeroU32::new(DEFAULT_ITERATIONS).unwrap_or(NonZeroU32::MIN),
            rng: SystemRandom::new(),
        }
    }
}

fn parse(encoded: &str) -> Option<(NonZeroU32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations = parts.next()?.parse::<u32>().ok().and_then(NonZeroU32::new)?;
    let salt = Base64::decode_vec(parts.next()?).ok()?;
    let hash = Base64::decode_vec(parts.next()?).ok()?;
    if parts.next().is_some() || hash.len() != HASH_LEN {
        return None;
    }
    Some((iterations, salt, hash))
}
