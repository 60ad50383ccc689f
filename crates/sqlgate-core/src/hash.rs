// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical hashing for audit trails and cache keys.
//!
//! Audit records never store plaintext inputs or outputs, only SHA-256
//! digests of a canonical JSON form. Cache and history keys hash a
//! normalized form of the natural-language query so that semantically equal
//! spellings share one key.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 of the canonical JSON serialization of `data`, as lowercase hex.
///
/// Canonicalization round-trips through [`serde_json::Value`], whose object
/// keys are sorted, so semantically equal inputs hash identically regardless
/// of field order at the call site.
pub fn canonical_hash<T: Serialize>(data: &T) -> String {
    let canonical = match serde_json::to_value(data) {
        Ok(value) => value.to_string(),
        // Unserializable input degrades to hashing its Display-free marker;
        // audit still gets a stable digest rather than no record.
        Err(_) => String::from("<unserializable>"),
    };
    sha256_hex(canonical.as_bytes())
}

/// Normalize a natural-language query for key derivation: lowercase and
/// collapse all runs of whitespace to single spaces.
pub fn normalize_query(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The shared cache/history key: SHA-256 hex of the normalized query.
pub fn query_hash(query: &str) -> String {
    sha256_hex(normalize_query(query).as_bytes())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
