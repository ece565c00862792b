//! Batch download handler

use super::{DownloadManifest, DownloadRequest};
use crate::api::AppState;
use crate::error::ApiError;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// Header carrying the number of URLs that could not be fetched
pub const ERROR_COUNT_HEADER: &str = "x-error-count";

/// Header carrying the number of archive entries
pub const IMAGE_COUNT_HEADER: &str = "x-image-count";

/// POST /download - Fetch a batch of images
#[utoipa::path(
    post,
    path = "/download",
    tag = "download",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "ZIP archive of every fetched image; with zipReturn = false a JSON DownloadManifest instead",
            body = Vec<u8>, content_type = "application/zip",
            headers(
                ("X-Error-Count" = usize, description = "Number of URLs that failed (ZIP only)"),
                ("X-Image-Count" = usize, description = "Number of entries in the archive (ZIP only)")
            )
        ),
        (status = 400, description = "Invalid body, empty or oversized URL list, bad destDir", body = crate::error::ApiError),
        (status = 405, description = "Method other than POST", body = crate::error::ApiError),
        (status = 500, description = "No image could be fetched or the archive failed", body = crate::error::ApiError)
    )
)]
pub async fn download_images(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DownloadRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "rejected download request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::validation(format!(
                    "Invalid request body: {}",
                    rejection.body_text()
                ))),
            )
                .into_response();
        }
    };

    tracing::info!(
        urls = request.image_urls.len(),
        zip = request.zip_return,
        "download request received"
    );

    if request.zip_return {
        match state.downloader.download_zip(&request.image_urls).await {
            Ok(bundle) => (
                StatusCode::OK,
                [
                    (
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("application/zip"),
                    ),
                    (
                        header::CONTENT_DISPOSITION,
                        HeaderValue::from_static("attachment; filename=images.zip"),
                    ),
                    (
                        HeaderName::from_static(ERROR_COUNT_HEADER),
                        HeaderValue::from(bundle.error_count),
                    ),
                    (
                        HeaderName::from_static(IMAGE_COUNT_HEADER),
                        HeaderValue::from(bundle.entries.len()),
                    ),
                ],
                bundle.bytes,
            )
                .into_response(),
            Err(e) => e.into_response(),
        }
    } else {
        match state
            .downloader
            .download_to_dir(&request.image_urls, request.dest_dir.as_deref())
            .await
        {
            Ok(manifest) => (
                StatusCode::OK,
                Json(DownloadManifest {
                    success: true,
                    saved_paths: manifest
                        .saved_paths
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect(),
                    error_count: manifest.error_count,
                }),
            )
                .into_response(),
            Err(e) => e.into_response(),
        }
    }
}

/// Any method other than POST on /download
pub async fn download_method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, HeaderValue::from_static("POST"))],
        Json(ApiError::new(
            "method_not_allowed",
            "Only POST is supported on /download",
        )),
    )
        .into_response()
}
