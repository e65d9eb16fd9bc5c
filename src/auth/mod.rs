// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! # Signed API Authentication Module
//!
//! This module implements the signed-request token bootstrap against the
//! school's backend REST API.
//!
//! ## Bootstrap Flow
//!
//! 1. A portal handler needs authenticated backend access
//! 2. The [`TokenClient`] signs `timestamp.nonce.client_ip` with the shared
//!    `API_SECRET_KEY` (HMAC-SHA-256, lowercase hex)
//! 3. The signature is exchanged at `POST {API_BASE_URL}/auth/token` via the
//!    `X-TIMESTAMP`, `X-NONCE`, `X-SIGNATURE`, and `X-CLIENT-IP` headers
//! 4. The backend validates signature and IP and issues a bearer token pair
//! 5. The pair is cached until expiry; subsequent calls reuse it
//!
//! ## Security
//!
//! - The secret never crosses the wire; only signatures derived from it do
//! - The signing nonce is a fresh UUID per attempt (replay prevention)
//! - Initialization is single-flight under concurrent callers
//! - Failures retry with capped exponential backoff up to a fixed ceiling

pub mod backoff;
pub mod error;
pub mod extractor;
pub mod signing;
pub mod token;

pub use error::AuthError;
pub use extractor::ClientIp;
pub use signing::SignedRequest;
pub use token::{BootstrapState, TokenClient, TokenClientConfig, TokenInfo};
