// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{auth::ClientIp, error::ApiError, models::NewsPage, state::AppState};

#[derive(Deserialize, IntoParams)]
pub struct NewsQuery {
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

#[utoipa::path(
    get,
    path = "/api/news",
    params(NewsQuery),
    tag = "News",
    responses((status = 200, body = NewsPage))
)]
pub async fn list_news(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Query(params): Query<NewsQuery>,
) -> Result<Json<NewsPage>, ApiError> {
    let page = state
        .backend
        .get_json("/v1/news", &[("page", params.page.to_string())], &client_ip)
        .await?;
    Ok(Json(page))
}
