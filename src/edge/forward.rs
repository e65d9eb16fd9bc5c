// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! Fallback forwarder to the page render upstream.
//!
//! Everything that is not a portal API call, a health probe, or an excluded
//! asset lands here after the edge preprocessor has run. The request is
//! relayed to `RENDER_UPSTREAM_URL` with its original headers plus the
//! added `x-nonce`, and the upstream response is relayed back (the
//! preprocessor then stamps the CSP header onto it).
//!
//! No retries: a failed upstream round-trip is a 502 for that request.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};

use crate::state::AppState;

pub async fn forward_to_renderer(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| "/".to_string());
    let target = format!(
        "{}{}",
        state.config.render_upstream_url.as_str().trim_end_matches('/'),
        path_and_query
    );

    // The upstream expects its own host; everything else passes through,
    // including the x-nonce set by the preprocessor.
    let mut headers = request.headers().clone();
    headers.remove(header::HOST);

    let upstream = match state
        .renderer_http
        .request(method, target)
        .headers(headers)
        .send()
        .await
    {
        Ok(upstream) => upstream,
        Err(err) => {
            tracing::error!(path = %path_and_query, error = %err, "render upstream request failed");
            return (StatusCode::BAD_GATEWAY, "render upstream unavailable").into_response();
        }
    };

    let status = upstream.status();
    let mut response_headers = upstream.headers().clone();
    // Hop-by-hop and length headers are recomputed for the relayed body.
    response_headers.remove(header::CONNECTION);
    response_headers.remove(header::TRANSFER_ENCODING);
    response_headers.remove(header::CONTENT_LENGTH);

    match upstream.bytes().await {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            *response.headers_mut() = response_headers;
            response
        }
        Err(err) => {
            tracing::error!(path = %path_and_query, error = %err, "failed to read render upstream body");
            (StatusCode::BAD_GATEWAY, "render upstream unavailable").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::get, Router};
    use tower::ServiceExt;
    use url::Url;

    use crate::config::Config;
    use crate::edge::nonce::NONCE_HEADER;

    /// Minimal renderer stub that echoes the received x-nonce back in a
    /// response header.
    async fn spawn_renderer() -> String {
        async fn page(headers: HeaderMap) -> Response {
            let nonce = headers
                .get(NONCE_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            ([("x-seen-nonce", nonce)], "<html>school news</html>").into_response()
        }

        let app = Router::new().route("/news", get(page));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn state_with_renderer(renderer_base: &str) -> AppState {
        AppState::new(Config {
            api_base_url: Url::parse("http://127.0.0.1:1/").unwrap(),
            api_secret_key: "test-secret".to_string(),
            site_url: Url::parse("http://localhost:8080").unwrap(),
            render_upstream_url: Url::parse(renderer_base).unwrap(),
            host: "127.0.0.1".to_string(),
            port: 0,
            bootstrap_max_retries: 1,
        })
    }

    fn edge_app(state: AppState) -> Router {
        Router::new()
            .fallback(forward_to_renderer)
            .with_state(state.clone())
            .layer(axum::middleware::from_fn_with_state(
                state.exclusions.clone(),
                crate::edge::policy::nonce_middleware,
            ))
    }

    #[tokio::test]
    async fn forwards_pages_with_the_nonce_attached() {
        let renderer = spawn_renderer().await;
        let app = edge_app(state_with_renderer(&renderer));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/news")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        // The nonce the renderer saw is the one embedded in the CSP header.
        let seen = response
            .headers()
            .get("x-seen-nonce")
            .and_then(|v| v.to_str().ok())
            .expect("renderer saw a nonce")
            .to_string();
        assert!(!seen.is_empty());
        let csp = response
            .headers()
            .get(header::CONTENT_SECURITY_POLICY)
            .and_then(|v| v.to_str().ok())
            .expect("CSP header present");
        assert!(csp.contains(&format!("'nonce-{seen}'")));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"<html>school news</html>");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_bad_gateway() {
        // Port 1 is closed; the forwarder reports 502 without retrying.
        let app = edge_app(state_with_renderer("http://127.0.0.1:1"));
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn non_page_methods_are_rejected() {
        let renderer = spawn_renderer().await;
        let app = edge_app(state_with_renderer(&renderer));
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/news")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
