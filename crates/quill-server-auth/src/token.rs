// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! API bearer tokens.
//!
//! Tokens are 32 random bytes, hex encoded, with a `qt_` prefix. Only the
//! SHA-256 hash is stored; the plaintext is returned once at creation.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Prefix for Quill API tokens.
pub const API_TOKEN_PREFIX: &str = "qt_";

const TOKEN_BYTES: usize = 32;

/// Generate a new plaintext API token.
pub fn generate_api_token() -> String {
	let mut bytes = [0u8; TOKEN_BYTES];
	rand::thread_rng().fill_bytes(&mut bytes);
	format!("{API_TOKEN_PREFIX}{}", hex::encode(bytes))
}

/// SHA-256 hex digest used as the stored lookup key for a token.
pub fn hash_token(token: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(token.as_bytes());
	hex::encode(hasher.finalize())
}

pub fn is_api_token(token: &str) -> bool {
	token.starts_with(API_TOKEN_PREFIX)
}
