// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::ClientIp,
    error::ApiError,
    models::{AdmissionApplication, AdmissionReceipt},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/api/admission",
    request_body = AdmissionApplication,
    tag = "Admission",
    responses(
        (status = 201, body = AdmissionReceipt),
        (status = 422, description = "Submission failed validation")
    )
)]
pub async fn submit_application(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Json(application): Json<AdmissionApplication>,
) -> Result<(StatusCode, Json<AdmissionReceipt>), ApiError> {
    application
        .validate()
        .map_err(ApiError::unprocessable)?;

    let receipt = state
        .backend
        .post_json("/v1/admissions", &application, &client_ip)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    use crate::config::Config;

    fn test_state() -> AppState {
        AppState::new(Config {
            api_base_url: Url::parse("http://127.0.0.1:1/").unwrap(),
            api_secret_key: "test-secret".to_string(),
            site_url: Url::parse("http://localhost:8080").unwrap(),
            render_upstream_url: Url::parse("http://127.0.0.1:3000").unwrap(),
            host: "127.0.0.1".to_string(),
            port: 0,
            bootstrap_max_retries: 1,
        })
    }

    #[tokio::test]
    async fn invalid_submissions_never_reach_the_backend() {
        // The backend URL points at a closed port; a validation failure
        // must surface before any network access happens.
        let application = AdmissionApplication {
            child_name: String::new(),
            birth_year: 2020,
            guardian_name: "Rosa Marchetti".to_string(),
            phone: "+39 06 1234567".to_string(),
            email: None,
            notes: None,
        };

        let err = submit_application(
            State(test_state()),
            ClientIp("203.0.113.7".to_string()),
            Json(application),
        )
        .await
        .expect_err("blank child name");
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.message, "Child name is required");
    }
}
