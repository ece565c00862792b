//! System handlers: root status, health, OpenAPI.

use super::StatusResponse;
use axum::{Json, response::IntoResponse};

/// GET / - Service status and usage hint
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "Service is accepting requests", body = StatusResponse)
    )
)]
pub async fn root_status() -> impl IntoResponse {
    Json(StatusResponse {
        status: "active".to_string(),
        message: Some("Image Download API - POST to /download".to_string()),
    })
}

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy", body = StatusResponse)
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(StatusResponse {
        status: "OK".to_string(),
        message: None,
    })
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
