// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! Token bootstrap errors.
//!
//! These never reach HTTP responses directly: the bootstrap client converts
//! them into [`crate::auth::BootstrapState`] transitions, and the backend
//! pass-through client maps them onto gateway errors. Callers observe state
//! rather than catch exceptions.

/// Errors raised by the signed token bootstrap flow.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The signing secret is not configured. Fatal, never retried.
    #[error("signing secret is not configured")]
    MissingSecret,

    /// The token exchange request failed to reach the backend.
    #[error("token exchange request failed: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status. The payload is not
    /// interpreted beyond the status code.
    #[error("token endpoint rejected the exchange (HTTP {0})")]
    Rejected(u16),

    /// The backend answered 2xx but the token payload did not parse.
    #[error("token endpoint returned a malformed payload: {0}")]
    MalformedResponse(String),

    /// The attempt ceiling was reached; automatic recovery has stopped and
    /// a later `initialize` call is required to retrigger the exchange.
    #[error("token exchange failed after {0} attempts")]
    RetriesExhausted(u32),
}

impl AuthError {
    /// Whether the retry loop may attempt the exchange again.
    ///
    /// Network failures and backend rejections are deliberately treated
    /// alike; only a missing secret stops the loop outright.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::Network(_) | AuthError::Rejected(_) | AuthError::MalformedResponse(_)
        )
    }
}
