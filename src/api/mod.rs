// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    edge,
    models::{
        AdmissionApplication, AdmissionReceipt, InvoiceStatus, NewsPage, NewsPost, PaymentStatus,
        ReportCard, StaffMember,
    },
    state::AppState,
};

pub mod admission;
pub mod health;
pub mod news;
pub mod payments;
pub mod reports;
pub mod staff;

/// Build the gateway router.
///
/// Portal endpoints live under `/api` (skipped by the edge preprocessor);
/// everything unmatched falls through to the render upstream forwarder,
/// which runs inside the preprocessor and therefore carries the CSP nonce.
pub fn router(state: AppState) -> Router {
    let portal = Router::new()
        .route("/news", get(news::list_news))
        .route("/staff", get(staff::list_staff))
        .route("/admission", post(admission::submit_application))
        .route("/payments/status", get(payments::payment_status))
        .route("/reports", get(reports::report_card))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .fallback(edge::forward_to_renderer)
        .with_state(state.clone())
        .nest("/api", portal)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(
            state.exclusions.clone(),
            edge::nonce_middleware,
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        news::list_news,
        staff::list_staff,
        admission::submit_application,
        payments::payment_status,
        reports::report_card,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            NewsPost,
            NewsPage,
            StaffMember,
            AdmissionApplication,
            AdmissionReceipt,
            InvoiceStatus,
            PaymentStatus,
            ReportCard,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "News", description = "Published announcements"),
        (name = "Staff", description = "Public staff directory"),
        (name = "Admission", description = "Admission application submission"),
        (name = "Payments", description = "Tuition payment status"),
        (name = "Reports", description = "Report-card lookups"),
        (name = "Health", description = "Service health probes")
    )
)]
struct ApiDoc;
