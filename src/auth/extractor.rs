// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! Axum extractor for the resolved caller IP.
//!
//! Use the `ClientIp` extractor in handlers that trigger authenticated
//! backend calls; the resolved IP is bound into the token exchange
//! signature:
//!
//! ```rust,ignore
//! async fn my_handler(ClientIp(ip): ClientIp) -> impl IntoResponse {
//!     // ip is the first x-forwarded-for entry, or "unknown"
//! }
//! ```

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::signing::{client_ip_from_forwarded_for, FORWARDED_FOR_HEADER};

/// Extractor for the original caller IP.
///
/// Resolves the first entry of `x-forwarded-for`, trimmed, falling back to
/// the `"unknown"` sentinel. Never rejects: an unresolvable IP still lets
/// the page degrade gracefully rather than fail.
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok());
        Ok(ClientIp(client_ip_from_forwarded_for(forwarded)))
    }
}
