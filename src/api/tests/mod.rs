use super::*;
use crate::error::ApiError;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::io::{Cursor, Read};
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.scratch.root = root.join("scratch");
    config.download.output_dir = root.join("out");
    config.download.fetch_timeout = Duration::from_secs(5);
    config
}

fn app_with(config: Config) -> Router {
    let config = Arc::new(config);
    let downloader = Arc::new(ImageDownloader::new(config.clone()).unwrap());
    create_router(downloader, config)
}

fn test_app(root: &Path) -> Router {
    app_with(test_config(root))
}

async fn image_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-a".to_vec()))
        .mount(&server)
        .await;
    server
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn api_error(response: Response) -> ApiError {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json, serde_json::json!({"status": "OK"}));
}

#[tokio::test]
async fn test_root_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "active");
    assert_eq!(json["message"], "Image Download API - POST to /download");
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(json["paths"]["/download"].is_object());
}

#[tokio::test]
async fn test_cors_enabled() {
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*",
        "CORS header should allow any origin by default"
    );
}

#[tokio::test]
async fn test_cors_preflight() {
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/download")
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-max-age"], "300");
    let methods = headers["access-control-allow-methods"].to_str().unwrap();
    assert!(methods.contains("POST"), "allowed methods: {}", methods);
}

#[tokio::test]
async fn test_cors_disabled() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.api.cors_enabled = false;
    let app = app_with(config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_download_zip_with_one_unreachable_url() {
    let server = image_server().await;
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let response = app
        .oneshot(post_json(
            "/download",
            serde_json::json!({
                "imageURLs": [
                    format!("{}/a.jpg", server.uri()),
                    "http://127.0.0.1:1/b.jpg"
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "application/zip");
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename=images.zip"
    );
    assert_eq!(headers["x-error-count"], "1");
    assert_eq!(headers["x-image-count"], "1");

    let bytes = body_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 1);
    let mut entry = archive.by_index(0).unwrap();
    assert_eq!(entry.name(), "a.jpg");
    let mut body = Vec::new();
    entry.read_to_end(&mut body).unwrap();
    assert_eq!(body, b"jpeg-a");
}

#[tokio::test]
async fn test_download_accepts_urls_alias() {
    let server = image_server().await;
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let response = app
        .oneshot(post_json(
            "/download",
            serde_json::json!({"urls": [format!("{}/a.jpg", server.uri())]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-error-count"], "0");
}

#[tokio::test]
async fn test_download_empty_list_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let response = app
        .oneshot(post_json("/download", serde_json::json!({"imageURLs": []})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = api_error(response).await;
    assert_eq!(error.error.code, "validation_error");
    assert!(error.error.message.contains("No URLs provided"));
}

#[tokio::test]
async fn test_download_invalid_body_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let request = Request::builder()
        .method("POST")
        .uri("/download")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(api_error(response).await.error.code, "validation_error");
}

#[tokio::test]
async fn test_download_missing_content_type_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let request = Request::builder()
        .method("POST")
        .uri("/download")
        .body(Body::from(r#"{"imageURLs": ["http://x/a.jpg"]}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_too_many_urls_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.download.max_urls = 2;
    let app = app_with(config);

    let response = app
        .oneshot(post_json(
            "/download",
            serde_json::json!({"imageURLs": ["http://x/1.jpg", "http://x/2.jpg", "http://x/3.jpg"]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_get_is_method_not_allowed() {
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/download")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "POST");
    assert_eq!(api_error(response).await.error.code, "method_not_allowed");
}

#[tokio::test]
async fn test_download_all_failed_is_server_error() {
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let response = app
        .oneshot(post_json(
            "/download",
            serde_json::json!({"imageURLs": ["http://127.0.0.1:1/a.jpg", "http://127.0.0.1:1/b.jpg"]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_ne!(response.headers()["content-type"], "application/zip");
    let error = api_error(response).await;
    assert_eq!(error.error.code, "batch_exhausted");
    let details = error.error.details.unwrap();
    assert_eq!(details["total"], 2);
    assert_eq!(details["error_count"], 2);
}

#[tokio::test]
async fn test_download_manifest_mode() {
    let server = image_server().await;
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let response = app
        .oneshot(post_json(
            "/download",
            serde_json::json!({
                "imageURLs": [format!("{}/a.jpg", server.uri())],
                "destDir": "batch",
                "zipReturn": false
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["errorCount"], 0);
    let saved = json["savedPaths"][0].as_str().unwrap();
    assert!(saved.ends_with("a.jpg"), "saved path: {}", saved);
    assert_eq!(std::fs::read(saved).unwrap(), b"jpeg-a");
    assert!(Path::new(saved).starts_with(dir.path().join("out").join("batch")));
}

#[tokio::test]
async fn test_download_manifest_rejects_escaping_dest_dir() {
    let dir = TempDir::new().unwrap();
    let app = test_app(dir.path());

    let response = app
        .oneshot(post_json(
            "/download",
            serde_json::json!({
                "imageURLs": ["http://x/a.jpg"],
                "destDir": "../elsewhere",
                "zipReturn": false
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_swagger_ui_is_optional() {
    let dir = TempDir::new().unwrap();

    let response = test_app(dir.path())
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let mut config = test_config(dir.path());
    config.api.swagger_ui = true;
    let response = app_with(config)
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_server_stops_on_shutdown() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);
    let downloader = Arc::new(ImageDownloader::new(config.clone()).unwrap());
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn(start_api_server(downloader, config, shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}
