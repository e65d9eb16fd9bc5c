// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{TokenClient, TokenClientConfig};
use crate::backend::BackendClient;
use crate::config::Config;
use crate::edge::ExclusionList;

/// Timeout for page requests forwarded to the render upstream.
const RENDERER_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Signed token bootstrap client (shared cache + single-flight guard).
    pub tokens: TokenClient,
    /// Authenticated pass-through client for the backend REST API.
    pub backend: Arc<BackendClient>,
    /// HTTP client for forwarding page requests to the render upstream.
    pub renderer_http: reqwest::Client,
    /// Paths skipped by the edge preprocessor.
    pub exclusions: Arc<ExclusionList>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let token_config = TokenClientConfig::new(&config.api_base_url, config.api_secret_key.as_str())
            .with_max_retries(config.bootstrap_max_retries);
        let tokens = TokenClient::new(token_config);
        let backend = Arc::new(BackendClient::new(&config.api_base_url, tokens.clone()));

        Self {
            config: Arc::new(config),
            tokens,
            backend,
            renderer_http: reqwest::Client::builder()
                .timeout(RENDERER_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            exclusions: Arc::new(ExclusionList::default()),
        }
    }
}
