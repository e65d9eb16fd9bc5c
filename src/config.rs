// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! # Runtime Configuration
//!
//! This module defines environment variable names and the [`Config`] struct
//! loaded from the environment at startup. A missing signing secret is a
//! fatal configuration error; the process refuses to start without it.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `API_SECRET_KEY` | Shared HMAC signing secret for the token bootstrap | Required |
//! | `API_BASE_URL` | Backend REST API base URL | Required |
//! | `SITE_URL` | Canonical public site origin | `http://localhost:8080` |
//! | `RENDER_UPSTREAM_URL` | Page renderer origin for forwarded requests | `http://127.0.0.1:3000` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `BOOTSTRAP_MAX_RETRIES` | Token exchange attempt ceiling | `5` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;

use url::Url;

use crate::auth::token::DEFAULT_MAX_RETRIES;

/// Environment variable name for the shared HMAC signing secret.
///
/// The secret authenticates this gateway to the backend token endpoint.
/// It is never transmitted; only HMAC-SHA-256 signatures derived from it
/// cross the wire.
pub const API_SECRET_KEY_ENV: &str = "API_SECRET_KEY";

/// Environment variable name for the backend REST API base URL.
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";

/// Environment variable name for the canonical public site origin.
pub const SITE_URL_ENV: &str = "SITE_URL";

/// Environment variable name for the page renderer origin.
///
/// Requests that are not portal API calls are forwarded here with the
/// per-request `x-nonce` header attached.
pub const RENDER_UPSTREAM_URL_ENV: &str = "RENDER_UPSTREAM_URL";

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the token exchange attempt ceiling.
pub const BOOTSTRAP_MAX_RETRIES_ENV: &str = "BOOTSTRAP_MAX_RETRIES";

/// Environment variable name for the logging format (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_SITE_URL: &str = "http://localhost:8080";
const DEFAULT_RENDER_UPSTREAM_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Errors raised while loading configuration from the environment.
///
/// All variants are fatal at startup and never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is absent or empty.
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    /// An environment variable does not parse as a URL.
    #[error("environment variable {var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },

    /// An environment variable does not parse as a number.
    #[error("environment variable {var} is not a valid number: {value}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Validated runtime configuration, loaded once at startup and shared
/// through [`crate::state::AppState`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend REST API base URL.
    pub api_base_url: Url,
    /// Shared HMAC signing secret.
    pub api_secret_key: String,
    /// Canonical public site origin.
    pub site_url: Url,
    /// Page renderer origin for forwarded page requests.
    pub render_upstream_url: Url,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Total token exchange attempts before the bootstrap client gives up.
    pub bootstrap_max_retries: u32,
}

impl Config {
    /// Load and validate configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Separated from [`Config::from_env`] so tests can supply variables
    /// without mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_secret_key = lookup(API_SECRET_KEY_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar(API_SECRET_KEY_ENV))?;

        let api_base_url = required_url(&lookup, API_BASE_URL_ENV)?;
        let site_url = url_or_default(&lookup, SITE_URL_ENV, DEFAULT_SITE_URL)?;
        let render_upstream_url =
            url_or_default(&lookup, RENDER_UPSTREAM_URL_ENV, DEFAULT_RENDER_UPSTREAM_URL)?;

        let host = lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup(PORT_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidNumber {
                var: PORT_ENV,
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let bootstrap_max_retries = match lookup(BOOTSTRAP_MAX_RETRIES_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidNumber {
                var: BOOTSTRAP_MAX_RETRIES_ENV,
                value,
            })?,
            None => DEFAULT_MAX_RETRIES,
        };

        Ok(Self {
            api_base_url,
            api_secret_key,
            site_url,
            render_upstream_url,
            host,
            port,
            bootstrap_max_retries,
        })
    }
}

fn required_url<F>(lookup: &F, var: &'static str) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(var)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingVar(var))?;
    Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { var, source })
}

fn url_or_default<F>(lookup: &F, var: &'static str, default: &str) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => {
            Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { var, source })
        }
        _ => Ok(Url::parse(default).expect("default URL is valid")),
    }
}
