// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! Edge request preprocessor: CSP header and nonce pass-through.
//!
//! Runs before any page handling. For every non-excluded request it
//! generates a fresh [`CspNonce`], attaches it to the forwarded request
//! (header + extension), and stamps the response with a
//! `Content-Security-Policy` whose `script-src` embeds the same nonce.
//!
//! Invariant: the nonce in the CSP header equals the `x-nonce` value seen
//! by downstream rendering for that same request.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::CONTENT_SECURITY_POLICY, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::nonce::{CspNonce, NONCE_HEADER};

/// Paths the preprocessor skips: API routes, static build assets, the
/// image pipeline, the favicon, and the web manifest.
#[derive(Debug, Clone)]
pub struct ExclusionList {
    prefixes: Vec<String>,
    exact: Vec<String>,
}

impl Default for ExclusionList {
    fn default() -> Self {
        Self {
            prefixes: vec![
                "/api".to_string(),
                "/static".to_string(),
                "/images".to_string(),
            ],
            exact: vec!["/favicon.ico".to_string(), "/site.webmanifest".to_string()],
        }
    }
}

impl ExclusionList {
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exact.iter().any(|p| p == path)
            || self.prefixes.iter().any(|p| {
                path.strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
    }
}

/// The fixed CSP directive template with the nonce substituted into
/// `script-src`.
pub fn csp_header_value(nonce: &CspNonce) -> String {
    format!(
        "default-src 'self'; \
         script-src 'self' 'nonce-{}' 'strict-dynamic'; \
         style-src 'self' 'unsafe-inline'; \
         img-src 'self' data: https:; \
         font-src 'self' data:; \
         connect-src 'self'; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'",
        nonce.value()
    )
}

/// Edge preprocessor middleware.
///
/// Failure to generate randomness is fatal for the request (fails closed);
/// there is no retry.
pub async fn nonce_middleware(
    State(exclusions): State<Arc<ExclusionList>>,
    mut request: Request,
    next: Next,
) -> Response {
    if exclusions.is_excluded(request.uri().path()) {
        return next.run(request).await;
    }

    let nonce = match CspNonce::generate() {
        Ok(nonce) => nonce,
        Err(err) => {
            tracing::error!(error = %err, "nonce generation failed, refusing request");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Base64 output is always a valid header value.
    let Ok(nonce_header) = HeaderValue::from_str(nonce.value()) else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let Ok(csp_header) = HeaderValue::from_str(&csp_header_value(&nonce)) else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    request.headers_mut().insert(NONCE_HEADER, nonce_header);
    request.extensions_mut().insert(nonce);

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(CONTENT_SECURITY_POLICY, csp_header);
    response
}
