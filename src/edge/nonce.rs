// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! Per-request CSP nonce generation.
//!
//! Each page request gets a fresh 16-byte random value, base64-encoded. The
//! nonce lives exactly one request/response cycle and is never persisted:
//! downstream rendering tags inline scripts with it, and the response CSP
//! header allow-lists the same value.

use axum::{extract::FromRequestParts, http::request::Parts};
use base64ct::{Base64, Encoding};
use rand::rngs::OsRng;
use rand::RngCore;

/// Pass-through header carrying the nonce to downstream rendering.
pub const NONCE_HEADER: &str = "x-nonce";

const NONCE_LEN: usize = 16;

/// The operating system randomness source failed.
///
/// Fatal for the affected request: the edge preprocessor fails closed
/// rather than emit a page without a usable CSP nonce.
#[derive(Debug, thiserror::Error)]
#[error("operating system randomness source failed")]
pub struct RandomnessError;

/// A single-request CSP nonce (16 random bytes, base64-encoded).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CspNonce(String);

impl CspNonce {
    /// Generate a fresh nonce from OS randomness.
    pub fn generate() -> Result<Self, RandomnessError> {
        let mut bytes = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| RandomnessError)?;
        Ok(Self(Base64::encode_string(&bytes)))
    }

    /// The base64 nonce value, as embedded in CSP and `x-nonce`.
    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Extractor for the request's CSP nonce, set by the edge preprocessor.
///
/// Handlers rendering inline scripts read the nonce from request
/// extensions. A missing nonce means the route is excluded from the
/// preprocessor or the middleware is misconfigured; an empty value is
/// returned so the page still renders (scripts will simply be blocked).
impl<S> FromRequestParts<S> for CspNonce
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(|| {
            tracing::warn!(
                "CSP nonce not found in request extensions - middleware may be misconfigured"
            );
            Self(String::new())
        }))
    }
}
