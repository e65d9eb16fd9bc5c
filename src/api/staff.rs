// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

use axum::{extract::State, Json};

use crate::{auth::ClientIp, error::ApiError, models::StaffMember, state::AppState};

#[utoipa::path(
    get,
    path = "/api/staff",
    tag = "Staff",
    responses((status = 200, body = Vec<StaffMember>))
)]
pub async fn list_staff(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
) -> Result<Json<Vec<StaffMember>>, ApiError> {
    let members = state
        .backend
        .get_json("/v1/staff", &[], &client_ip)
        .await?;
    Ok(Json(members))
}
