//! REST API server module
//!
//! Exposes the batch image download endpoint plus health, status, and
//! OpenAPI routes.

use crate::{Config, ImageDownloader, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// How long browsers may cache a CORS preflight answer
const CORS_MAX_AGE: Duration = Duration::from_secs(300);

/// Create the API router with all route definitions
///
/// # Routes
///
/// - `GET /` - Service status
/// - `GET /health` - Health check
/// - `POST /download` - Fetch a batch of images (any other method: 405)
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(downloader: Arc<ImageDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader);

    let router = Router::new()
        .route("/", get(routes::root_status))
        .route("/health", get(routes::health_check))
        .route(
            "/download",
            post(routes::download_images).fallback(routes::download_method_not_allowed),
        )
        .route("/openapi.json", get(routes::openapi_spec));

    // Swagger UI gets its own copy of the document under /api-docs
    let router = if config.api.swagger_ui {
        router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    // CORS is outermost so preflight requests are answered before tracing and routing
    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin. Methods are limited to
/// GET, POST, and OPTIONS and the only allowed request header is
/// `Content-Type`.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    let origin = if allow_any || origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(CORS_MAX_AGE)
}

/// Start the API server on the configured bind address.
///
/// Runs until `shutdown` is cancelled; in-flight requests are allowed to
/// finish before this returns.
///
/// # Example
///
/// ```no_run
/// use image_dl::{Config, ImageDownloader};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let downloader = Arc::new(ImageDownloader::new(config.clone())?);
///
/// // Start API server (blocks until shutdown)
/// image_dl::api::start_api_server(downloader, config, CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    downloader: Arc<ImageDownloader>,
    config: Arc<Config>,
    shutdown: CancellationToken,
) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    serve_on(listener, downloader, config, shutdown).await
}

/// Serve the API on an already bound listener until `shutdown` is cancelled
pub async fn serve_on(
    listener: TcpListener,
    downloader: Arc<ImageDownloader>,
    config: Arc<Config>,
    shutdown: CancellationToken,
) -> Result<()> {
    let app = create_router(downloader, config);

    if let Ok(address) = listener.local_addr() {
        tracing::info!(
            address = %address,
            "API server listening"
        );
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
