// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use school_edge::{api, config::Config, config::LOG_FORMAT_ENV, state::AppState};

#[tokio::main]
async fn main() {
    init_tracing();

    // Configuration errors are fatal: without the signing secret the
    // gateway cannot bootstrap backend access.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "configuration error, refusing to start");
            std::process::exit(1);
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");

    tracing::info!(
        %addr,
        api = %config.api_base_url,
        renderer = %config.render_upstream_url,
        site = %config.site_url,
        "school-edge starting (docs at /docs)"
    );

    let state = AppState::new(config);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");

    tracing::info!("shutdown complete");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());

    if std::env::var(LOG_FORMAT_ENV).as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Wait for Ctrl+C.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("shutdown signal received");
}
