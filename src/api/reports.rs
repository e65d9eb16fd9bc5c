// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{auth::ClientIp, error::ApiError, models::ReportCard, state::AppState};

#[derive(Deserialize, IntoParams)]
pub struct ReportQuery {
    /// Student the lookup is for.
    pub student_id: String,
    /// Term identifier, e.g. "2026-T1".
    pub term: String,
}

#[utoipa::path(
    get,
    path = "/api/reports",
    params(ReportQuery),
    tag = "Reports",
    responses((status = 200, body = ReportCard))
)]
pub async fn report_card(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Query(params): Query<ReportQuery>,
) -> Result<Json<ReportCard>, ApiError> {
    if params.student_id.trim().is_empty() || params.term.trim().is_empty() {
        return Err(ApiError::bad_request("student_id and term are required"));
    }

    let report = state
        .backend
        .get_json(
            "/v1/reports",
            &[
                ("student_id", params.student_id.clone()),
                ("term", params.term.clone()),
            ],
            &client_ip,
        )
        .await?;
    Ok(Json(report))
}
