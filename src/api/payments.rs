// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{auth::ClientIp, error::ApiError, models::PaymentStatus, state::AppState};

#[derive(Deserialize, IntoParams)]
pub struct PaymentQuery {
    /// Student the lookup is for.
    pub student_id: String,
}

#[utoipa::path(
    get,
    path = "/api/payments/status",
    params(PaymentQuery),
    tag = "Payments",
    responses((status = 200, body = PaymentStatus))
)]
pub async fn payment_status(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Query(params): Query<PaymentQuery>,
) -> Result<Json<PaymentStatus>, ApiError> {
    if params.student_id.trim().is_empty() {
        return Err(ApiError::bad_request("student_id is required"));
    }

    let status = state
        .backend
        .get_json(
            "/v1/payments/status",
            &[("student_id", params.student_id.clone())],
            &client_ip,
        )
        .await?;
    Ok(Json(status))
}
