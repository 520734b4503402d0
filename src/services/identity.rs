// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity token generation.
//!
//! Identity tokens correlate an authorization callback with a profile. They
//! only need to be unique and unguessable enough to avoid collisions.

use rand::Rng;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Source of identity tokens.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random tokens of a fixed length drawn from a charset.
#[derive(Debug, Clone)]
pub struct RandomTokenGenerator {
    length: usize,
    charset: Vec<u8>,
}

impl RandomTokenGenerator {
    /// Alphanumeric tokens of `length` characters.
    pub fn new(length: usize) -> Self {
        Self {
            length,
            charset: ALPHANUMERIC.to_vec(),
        }
    }

    /// Tokens drawn from a custom ASCII charset.
    ///
    /// Falls back to the alphanumeric charset if `charset` is empty.
    pub fn with_charset(length: usize, charset: &[u8]) -> Self {
        let charset = if charset.is_empty() {
            ALPHANUMERIC.to_vec()
        } else {
            charset.to_vec()
        };
        Self { length, charset }
    }
}

impl Default for RandomTokenGenerator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_IDENTITY_TOKEN_LENGTH)
    }
}

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| {
                let idx = rng.gen_range(0..self.charset.len());
                self.charset[idx] as char
            })
            .collect()
    }
}
