// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! Authenticated pass-through client for the backend REST API.
//!
//! Portal handlers do not talk to the backend directly; they go through
//! [`BackendClient`], which obtains a bearer token from the bootstrap
//! client, attaches it, and maps backend failures onto gateway errors.
//! Backend payloads are relayed, not interpreted.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::{AuthError, TokenClient};
use crate::error::ApiError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors raised by backend pass-through calls.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The request never completed.
    #[error("backend request failed: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("backend returned HTTP {0}")]
    Status(u16),

    /// The backend answered 2xx but the payload did not parse.
    #[error("backend returned a malformed payload: {0}")]
    Malformed(String),

    /// The token bootstrap could not produce a bearer token.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Status(400) => ApiError::bad_request("Backend rejected the request"),
            BackendError::Status(404) => ApiError::not_found("Record not found"),
            BackendError::Status(422) => {
                ApiError::unprocessable("Backend could not process the submission")
            }
            BackendError::Status(status) => {
                ApiError::bad_gateway(format!("Backend error (HTTP {status})"))
            }
            BackendError::Network(_) | BackendError::Malformed(_) => {
                ApiError::bad_gateway("Backend is unavailable")
            }
            BackendError::Auth(_) => {
                ApiError::bad_gateway("Backend authentication is unavailable")
            }
        }
    }
}

/// Thin reqwest wrapper owning the bearer plumbing for portal calls.
pub struct BackendClient {
    base: String,
    http: reqwest::Client,
    tokens: TokenClient,
}

impl BackendClient {
    pub fn new(api_base_url: &Url, tokens: TokenClient) -> Self {
        Self {
            base: api_base_url.as_str().trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            tokens,
        }
    }

    /// GET a JSON resource with query parameters.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        client_ip: &str,
    ) -> Result<T, BackendError> {
        let url = self.url(path);
        let response = self
            .send_with_auth(client_ip, || self.http.get(&url).query(query))
            .await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))
    }

    /// POST a JSON body and parse the JSON reply.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        client_ip: &str,
    ) -> Result<T, BackendError> {
        let url = self.url(path);
        let response = self
            .send_with_auth(client_ip, || self.http.post(&url).json(body))
            .await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Send with a bearer token, re-running the bootstrap once if the
    /// backend no longer accepts the cached token.
    async fn send_with_auth<F>(
        &self,
        client_ip: &str,
        make: F,
    ) -> Result<reqwest::Response, BackendError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let token = self.tokens.initialize(client_ip).await?;
        let response = make()
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response);
        }

        tracing::warn!("backend rejected the bearer token, re-running the bootstrap");
        self.tokens.reset().await;
        let token = self.tokens.initialize(client_ip).await?;
        let response = make()
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        check_status(response)
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(BackendError::Status(response.status().as_u16()))
    }
}
