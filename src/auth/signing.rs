// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! Canonical request signing for the backend token exchange.
//!
//! The backend authenticates this gateway by verifying an HMAC-SHA-256
//! signature over an ordered canonical string:
//!
//! ```text
//! {timestamp}.{nonce}.{client_ip}[.{body_digest}]
//! ```
//!
//! The field order is part of the wire contract with the backend verifier.
//! Reordering or omitting a field breaks verification on the backend, which
//! cannot be changed from this side.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Unix timestamp header sent with the token exchange.
pub const TIMESTAMP_HEADER: &str = "x-timestamp";
/// One-time signing nonce header (UUID v4).
pub const SIGNING_NONCE_HEADER: &str = "x-nonce";
/// Lowercase-hex HMAC-SHA-256 signature header.
pub const SIGNATURE_HEADER: &str = "x-signature";
/// Original caller IP header, echoed for backend-side verification.
pub const CLIENT_IP_HEADER: &str = "x-client-ip";
/// Inbound header the caller IP is resolved from.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Sentinel used when no forwarded-for header is present.
pub const UNKNOWN_CLIENT_IP: &str = "unknown";

/// A single token exchange attempt's signing material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Seconds since the Unix epoch at issue time.
    pub timestamp: u64,
    /// One-time random value, unique per attempt (replay prevention).
    pub nonce: String,
    /// Resolved IP of the caller that triggered the exchange.
    pub client_ip: String,
    /// Optional digest of the request body (empty-body exchanges omit it).
    pub body_digest: Option<String>,
}

impl SignedRequest {
    /// Issue fresh signing material for the given caller IP.
    pub fn issue(client_ip: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
            nonce: uuid::Uuid::new_v4().to_string(),
            client_ip: client_ip.into(),
            body_digest: None,
        }
    }

    /// Attach a body digest, extending the canonical string by one field.
    pub fn with_body_digest(mut self, digest: impl Into<String>) -> Self {
        self.body_digest = Some(digest.into());
        self
    }

    /// The ordered canonical string the signature is computed over.
    pub fn canonical_string(&self) -> String {
        match &self.body_digest {
            Some(digest) => format!(
                "{}.{}.{}.{}",
                self.timestamp, self.nonce, self.client_ip, digest
            ),
            None => format!("{}.{}.{}", self.timestamp, self.nonce, self.client_ip),
        }
    }

    /// Lowercase-hex HMAC-SHA-256 of the canonical string.
    pub fn signature(&self, secret: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret).expect("HMAC can take a key of any size");
        mac.update(self.canonical_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Resolve the caller IP from an `x-forwarded-for` value.
///
/// Takes the first entry, trimmed. Absent or empty values resolve to the
/// [`UNKNOWN_CLIENT_IP`] sentinel.
pub fn client_ip_from_forwarded_for(value: Option<&str>) -> String {
    value
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| UNKNOWN_CLIENT_IP.to_string())
}
