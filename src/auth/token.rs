// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! Signed API token bootstrap client.
//!
//! ## Bootstrap Flow
//!
//! 1. A caller needs authenticated backend access and calls
//!    [`TokenClient::initialize`] with the resolved caller IP.
//! 2. With a valid cached token the call returns immediately in `Ready`
//!    state, performing no network access.
//! 3. Otherwise the client signs `timestamp.nonce.client_ip` with the
//!    shared secret (HMAC-SHA-256) and exchanges it at the backend token
//!    endpoint for a bearer token pair, which it caches with absolute
//!    expiries.
//! 4. Failures retry with capped exponential backoff up to an attempt
//!    ceiling; after that the client stays in `Error` until a caller
//!    retriggers `initialize`.
//!
//! ## Concurrency
//!
//! Initialization is single-flight: an async mutex admits one exchange at a
//! time, and waiters re-check the cache after acquiry so they reuse the
//! winner's token instead of issuing a second exchange. State changes are
//! pushed through a `watch` channel; nothing polls.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::{watch, Mutex, RwLock};
use url::Url;

use super::backoff::retry_delay;
use super::error::AuthError;
use super::signing::{
    SignedRequest, CLIENT_IP_HEADER, SIGNATURE_HEADER, SIGNING_NONCE_HEADER, TIMESTAMP_HEADER,
};

/// Path of the signed token exchange endpoint, relative to the API base.
pub const TOKEN_PATH: &str = "/auth/token";
/// Path of the refresh endpoint, relative to the API base.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Default total exchange attempts before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

/// Clock skew leeway applied to expiry checks (seconds).
const EXPIRY_LEEWAY_SECS: i64 = 30;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Observable lifecycle of the bootstrap client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    /// No valid token cached; no exchange in flight.
    Idle,
    /// A token exchange is in flight.
    Loading,
    /// A valid, non-expired token is cached.
    Ready,
    /// The last exchange attempt failed. Recovery requires a caller to
    /// retrigger `initialize`.
    Error,
}

impl BootstrapState {
    /// Stable lowercase name, used in health reporting.
    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapState::Idle => "idle",
            BootstrapState::Loading => "loading",
            BootstrapState::Ready => "ready",
            BootstrapState::Error => "error",
        }
    }
}

/// A cached bearer token pair with absolute expiries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

impl TokenInfo {
    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(EXPIRY_LEEWAY_SECS) < self.expires_at
    }

    /// Whether the refresh token is still usable. An absent refresh expiry
    /// means the backend did not bound it; treat it as usable and let the
    /// refresh call itself decide.
    fn can_refresh_at(&self, now: DateTime<Utc>) -> bool {
        match self.refresh_expires_at {
            Some(expiry) => now + chrono::Duration::seconds(EXPIRY_LEEWAY_SECS) < expiry,
            None => true,
        }
    }
}

/// Wire shape of the backend token endpoints.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    token_type: String,
    expires_in: i64,
    #[serde(default)]
    refresh_expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token_info(self, now: DateTime<Utc>) -> TokenInfo {
        TokenInfo {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_at: now + chrono::Duration::seconds(self.expires_in),
            refresh_expires_at: self
                .refresh_expires_in
                .map(|secs| now + chrono::Duration::seconds(secs)),
        }
    }
}

/// Configuration for [`TokenClient`].
#[derive(Debug, Clone)]
pub struct TokenClientConfig {
    token_endpoint: String,
    refresh_endpoint: String,
    secret: String,
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl TokenClientConfig {
    /// Build a configuration against the backend API base URL.
    pub fn new(api_base_url: &Url, secret: impl Into<String>) -> Self {
        let base = api_base_url.as_str().trim_end_matches('/').to_string();
        Self {
            token_endpoint: format!("{base}{TOKEN_PATH}"),
            refresh_endpoint: format!("{base}{REFRESH_PATH}"),
            secret: secret.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }

    /// Override the total attempt ceiling.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Override the backoff window (primarily for tests).
    pub fn with_retry_delays(mut self, base_ms: u64, max_ms: u64) -> Self {
        self.base_delay_ms = base_ms;
        self.max_delay_ms = max_ms;
        self
    }
}

struct Inner {
    config: TokenClientConfig,
    http: reqwest::Client,
    cache: RwLock<Option<TokenInfo>>,
    // Single-flight guard: at most one exchange in flight.
    exchange_guard: Mutex<()>,
    state_tx: watch::Sender<BootstrapState>,
}

/// Token bootstrap client with an explicit `initialize`/`reset` lifecycle.
///
/// Cheap to clone; clones share the cache, state channel, and single-flight
/// guard. One instance lives in [`crate::state::AppState`].
#[derive(Clone)]
pub struct TokenClient {
    inner: Arc<Inner>,
}

impl TokenClient {
    pub fn new(config: TokenClientConfig) -> Self {
        let (state_tx, _) = watch::channel(BootstrapState::Idle);
        Self {
            inner: Arc::new(Inner {
                config,
                http: reqwest::Client::builder()
                    .timeout(HTTP_TIMEOUT)
                    .build()
                    .expect("Failed to create HTTP client"),
                cache: RwLock::new(None),
                exchange_guard: Mutex::new(()),
                state_tx,
            }),
        }
    }

    /// Current bootstrap state.
    pub fn state(&self) -> BootstrapState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribe to pushed state changes.
    pub fn subscribe(&self) -> watch::Receiver<BootstrapState> {
        self.inner.state_tx.subscribe()
    }

    /// Discard the cached token pair and return to `Idle`.
    ///
    /// Used on logout and on irrecoverable auth failures (e.g. the backend
    /// no longer accepts the cached access token).
    pub async fn reset(&self) {
        *self.inner.cache.write().await = None;
        self.set_state(BootstrapState::Idle);
    }

    /// The currently cached token pair, if any (valid or not).
    pub async fn cached_token(&self) -> Option<TokenInfo> {
        self.inner.cache.read().await.clone()
    }

    /// Obtain a valid token, exchanging or refreshing as needed.
    ///
    /// Idempotent: a valid cached token is returned immediately with zero
    /// network access. Under concurrent callers, at most one exchange is in
    /// flight; the rest reuse its result. `client_ip` is the resolved IP of
    /// the caller that triggered the exchange and is bound into the
    /// signature.
    pub async fn initialize(&self, client_ip: &str) -> Result<TokenInfo, AuthError> {
        if self.inner.config.secret.is_empty() {
            self.set_state(BootstrapState::Error);
            return Err(AuthError::MissingSecret);
        }

        if let Some(token) = self.valid_cached().await {
            return Ok(token);
        }

        // Single-flight: losers park here and pick up the winner's token
        // from the cache after acquiry.
        let _flight = self.inner.exchange_guard.lock().await;
        if let Some(token) = self.valid_cached().await {
            return Ok(token);
        }

        self.set_state(BootstrapState::Loading);

        // Expired access token with a live refresh token: try the cheaper
        // refresh before a full signed exchange.
        let stale = self.inner.cache.read().await.clone();
        if let Some(stale) = stale {
            if stale.can_refresh_at(Utc::now()) {
                match self.refresh_once(&stale).await {
                    Ok(token) => {
                        self.store(token.clone()).await;
                        return Ok(token);
                    }
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            "token refresh failed, falling back to signed exchange"
                        );
                    }
                }
            }
        }

        let mut attempt: u32 = 0;
        loop {
            match self.exchange_once(client_ip).await {
                Ok(token) => {
                    self.store(token.clone()).await;
                    tracing::info!(attempts = attempt + 1, "token exchange succeeded");
                    return Ok(token);
                }
                Err(err) if err.is_retryable() && attempt + 1 < self.inner.config.max_retries => {
                    self.set_state(BootstrapState::Error);
                    let delay = retry_delay(
                        attempt,
                        self.inner.config.base_delay_ms,
                        self.inner.config.max_delay_ms,
                    );
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "token exchange failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    self.set_state(BootstrapState::Loading);
                    attempt += 1;
                }
                Err(err) => {
                    self.set_state(BootstrapState::Error);
                    tracing::error!(
                        attempts = attempt + 1,
                        error = %err,
                        "token exchange failed, giving up"
                    );
                    return Err(if err.is_retryable() {
                        AuthError::RetriesExhausted(attempt + 1)
                    } else {
                        err
                    });
                }
            }
        }
    }

    async fn valid_cached(&self) -> Option<TokenInfo> {
        let cache = self.inner.cache.read().await;
        cache
            .as_ref()
            .filter(|token| token.is_valid_at(Utc::now()))
            .cloned()
    }

    async fn store(&self, token: TokenInfo) {
        *self.inner.cache.write().await = Some(token);
        self.set_state(BootstrapState::Ready);
    }

    fn set_state(&self, state: BootstrapState) {
        self.inner.state_tx.send_replace(state);
    }

    /// One signed exchange attempt against the token endpoint.
    async fn exchange_once(&self, client_ip: &str) -> Result<TokenInfo, AuthError> {
        let signed = SignedRequest::issue(client_ip);
        let signature = signed.signature(self.inner.config.secret.as_bytes());

        let response = self
            .inner
            .http
            .post(&self.inner.config.token_endpoint)
            .header(TIMESTAMP_HEADER, signed.timestamp.to_string())
            .header(SIGNING_NONCE_HEADER, &signed.nonce)
            .header(SIGNATURE_HEADER, &signature)
            .header(CLIENT_IP_HEADER, &signed.client_ip)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected(response.status().as_u16()));
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        Ok(payload.into_token_info(Utc::now()))
    }

    /// One refresh attempt using the cached refresh token.
    async fn refresh_once(&self, stale: &TokenInfo) -> Result<TokenInfo, AuthError> {
        let response = self
            .inner
            .http
            .post(&self.inner.config.refresh_endpoint)
            .json(&serde_json::json!({ "refresh_token": stale.refresh_token }))
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected(response.status().as_u16()));
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        Ok(payload.into_token_info(Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::post,
        Json, Router,
    };

    const STUB_SECRET: &str = "stub-secret";

    struct Stub {
        token_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
        fail_first: usize,
        expires_in: i64,
        refresh_expires_in: Option<i64>,
        last_client_ip: std::sync::Mutex<Option<String>>,
    }

    impl Stub {
        fn new(fail_first: usize) -> Arc<Self> {
            Arc::new(Self {
                token_calls: AtomicUsize::new(0),
                refresh_calls: AtomicUsize::new(0),
                fail_first,
                expires_in: 3_600,
                refresh_expires_in: Some(86_400),
                last_client_ip: std::sync::Mutex::new(None),
            })
        }

        /// Tokens that are already expired on arrival, with a live refresh
        /// token, forcing the refresh path on the next call.
        fn short_lived() -> Arc<Self> {
            Arc::new(Self {
                token_calls: AtomicUsize::new(0),
                refresh_calls: AtomicUsize::new(0),
                fail_first: 0,
                expires_in: 0,
                refresh_expires_in: Some(86_400),
                last_client_ip: std::sync::Mutex::new(None),
            })
        }
    }

    fn token_body(stub: &Stub, marker: &str) -> Response {
        Json(serde_json::json!({
            "access_token": format!("acc-{marker}"),
            "refresh_token": format!("ref-{marker}"),
            "token_type": "Bearer",
            "expires_in": stub.expires_in,
            "refresh_expires_in": stub.refresh_expires_in,
        }))
        .into_response()
    }

    async fn token_handler(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> Response {
        let call = stub.token_calls.fetch_add(1, Ordering::SeqCst);
        if call < stub.fail_first {
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }

        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };

        let signed = SignedRequest {
            timestamp: header(TIMESTAMP_HEADER).parse().unwrap_or_default(),
            nonce: header(SIGNING_NONCE_HEADER),
            client_ip: header(CLIENT_IP_HEADER),
            body_digest: None,
        };
        if header(SIGNATURE_HEADER) != signed.signature(STUB_SECRET.as_bytes()) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        *stub.last_client_ip.lock().unwrap() = Some(signed.client_ip.clone());
        token_body(&stub, &format!("t{call}"))
    }

    async fn refresh_handler(State(stub): State<Arc<Stub>>) -> Response {
        let call = stub.refresh_calls.fetch_add(1, Ordering::SeqCst);
        token_body(&stub, &format!("r{call}"))
    }

    async fn spawn_backend(stub: Arc<Stub>) -> String {
        let app = Router::new()
            .route(TOKEN_PATH, post(token_handler))
            .route(REFRESH_PATH, post(refresh_handler))
            .with_state(stub);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base: &str, secret: &str, max_retries: u32) -> TokenClient {
        let config = TokenClientConfig::new(&Url::parse(base).unwrap(), secret)
            .with_max_retries(max_retries)
            .with_retry_delays(1, 4);
        TokenClient::new(config)
    }

    #[tokio::test]
    async fn successful_exchange_caches_the_token() {
        let stub = Stub::new(0);
        let base = spawn_backend(stub.clone()).await;
        let client = client_for(&base, STUB_SECRET, 3);

        let token = client.initialize("203.0.113.7").await.expect("exchange succeeds");
        assert_eq!(token.access_token, "acc-t0");
        assert_eq!(client.state(), BootstrapState::Ready);
        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            stub.last_client_ip.lock().unwrap().as_deref(),
            Some("203.0.113.7")
        );

        // Cached path: zero additional network access.
        let again = client.initialize("203.0.113.7").await.expect("cached token");
        assert_eq!(again.access_token, token.access_token);
        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_initialize_is_single_flight() {
        let stub = Stub::new(0);
        let base = spawn_backend(stub.clone()).await;
        let client = client_for(&base, STUB_SECRET, 3);

        let (a, b, c, d, e) = tokio::join!(
            client.initialize("203.0.113.7"),
            client.initialize("203.0.113.7"),
            client.initialize("203.0.113.7"),
            client.initialize("203.0.113.7"),
            client.initialize("203.0.113.7"),
        );

        let first = a.expect("exchange succeeds").access_token;
        for result in [b, c, d, e] {
            assert_eq!(result.expect("reuses winner").access_token, first);
        }
        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let stub = Stub::new(2);
        let base = spawn_backend(stub.clone()).await;
        let client = client_for(&base, STUB_SECRET, 5);

        let token = client.initialize("203.0.113.7").await.expect("third attempt succeeds");
        assert_eq!(token.access_token, "acc-t2");
        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 3);
        assert_eq!(client.state(), BootstrapState::Ready);
    }

    #[tokio::test]
    async fn stops_after_the_attempt_ceiling() {
        let stub = Stub::new(usize::MAX);
        let base = spawn_backend(stub.clone()).await;
        let client = client_for(&base, STUB_SECRET, 3);

        let err = client.initialize("203.0.113.7").await.expect_err("exchange fails");
        assert!(matches!(err, AuthError::RetriesExhausted(3)));
        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 3);
        assert_eq!(client.state(), BootstrapState::Error);

        // No further automatic retry is scheduled.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 3);

        // A later call is the manual retrigger.
        let _ = client.initialize("203.0.113.7").await;
        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn rejected_exchange_is_retried_like_a_network_error() {
        // Wrong secret: the stub answers 401 on every attempt, and the
        // client deliberately draws no distinction from transient failures.
        let stub = Stub::new(0);
        let base = spawn_backend(stub.clone()).await;
        let client = client_for(&base, "wrong-secret", 2);

        let err = client.initialize("203.0.113.7").await.expect_err("rejected");
        assert!(matches!(err, AuthError::RetriesExhausted(2)));
        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_access_token_refreshes_instead_of_re_exchanging() {
        let stub = Stub::short_lived();
        let base = spawn_backend(stub.clone()).await;
        let client = client_for(&base, STUB_SECRET, 3);

        // First call exchanges; the token comes back already expired.
        client.initialize("203.0.113.7").await.expect("exchange succeeds");
        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 1);

        // Second call takes the refresh path, not a second signed exchange.
        let refreshed = client.initialize("203.0.113.7").await.expect("refresh succeeds");
        assert_eq!(refreshed.access_token, "acc-r0");
        assert_eq!(stub.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reset_discards_the_cached_pair() {
        let stub = Stub::new(0);
        let base = spawn_backend(stub.clone()).await;
        let client = client_for(&base, STUB_SECRET, 3);

        client.initialize("203.0.113.7").await.expect("exchange succeeds");
        client.reset().await;
        assert_eq!(client.state(), BootstrapState::Idle);
        assert!(client.cached_token().await.is_none());

        client.initialize("203.0.113.7").await.expect("fresh exchange");
        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn state_changes_are_pushed_to_subscribers() {
        let stub = Stub::new(0);
        let base = spawn_backend(stub.clone()).await;
        let client = client_for(&base, STUB_SECRET, 3);

        let mut rx = client.subscribe();
        assert_eq!(*rx.borrow(), BootstrapState::Idle);

        client.initialize("203.0.113.7").await.expect("exchange succeeds");
        rx.changed().await.expect("sender alive");
        assert_eq!(*rx.borrow_and_update(), BootstrapState::Ready);
    }

    #[tokio::test]
    async fn empty_secret_fails_without_network_access() {
        let stub = Stub::new(0);
        let base = spawn_backend(stub.clone()).await;
        let client = client_for(&base, "", 3);

        let err = client.initialize("203.0.113.7").await.expect_err("no secret");
        assert!(matches!(err, AuthError::MissingSecret));
        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 0);
    }
}
