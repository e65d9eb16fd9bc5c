// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! # Edge Request Preprocessor
//!
//! Runs on every inbound page request, before any page handling:
//!
//! 1. `policy` skips excluded paths (API routes, static assets, favicon,
//!    web manifest)
//! 2. `nonce` generates a fresh 16-byte random value per request
//! 3. the request is forwarded with an added `x-nonce` header so downstream
//!    rendering can tag inline scripts
//! 4. the response is stamped with a `Content-Security-Policy` header whose
//!    `script-src` embeds the same nonce
//!
//! Randomness failure fails the request closed. Nonces live exactly one
//! request/response cycle and are never persisted.

pub mod forward;
pub mod nonce;
pub mod policy;

pub use forward::forward_to_renderer;
pub use nonce::{CspNonce, NONCE_HEADER};
pub use policy::{nonce_middleware, ExclusionList};
