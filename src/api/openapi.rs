//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the image-dl REST API using utoipa
//! for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the image-dl REST API
///
/// The document is served at:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "image-dl REST API",
        version = "0.1.0",
        description = "Fetch a batch of images concurrently and receive them as one ZIP archive",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        crate::api::routes::download_images,

        // System
        crate::api::routes::root_status,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::api::routes::DownloadRequest,
        crate::api::routes::DownloadManifest,
        crate::api::routes::StatusResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "download", description = "Batch image download - ZIP archive or stored file paths"),
        (name = "system", description = "System endpoints - Status, health checks, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
