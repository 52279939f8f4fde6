//! API integration tests

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use excel_by_template::api::handlers::{ApiResponse, FillResponse, HealthResponse};
use excel_by_template::api::server::{build_router, ApiConfig, AppState};
use excel_by_template::excel::{CellValue, TemplateWorkbook};
use rust_xlsxwriter::Workbook;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

// ═══════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════

fn write_template(dir: &Path) -> PathBuf {
    let path = dir.join("template.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Name").unwrap();
    workbook.save(&path).unwrap();
    path
}

fn router(dir: &Path) -> axum::Router {
    build_router(Arc::new(AppState::new(
        dir.to_path_buf(),
        dir.to_path_buf(),
    )))
}

fn fill_job(template: &str) -> Value {
    json!({
        "templateFile": template,
        "columnsConfig": {"indexColumn": [{"index": 1, "property": "name"}]},
        "items": [{"name": "Alice"}]
    })
}

fn assert_rejected(body: &Value, fragment: &str) {
    assert_eq!(body["success"], json!(false));
    let error = body["error"].as_str().unwrap();
    assert!(error.contains(fragment), "unexpected error: {}", error);
}

async fn preflight(router: axum::Router, origin: &str) -> axum::response::Response {
    router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/v1/fill")
                .header("origin", origin)
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(router: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read(response).await
}

async fn post_json(router: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFIG / STATE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_config_custom() {
    let config = ApiConfig {
        host: "0.0.0.0".to_string(),
        port: 3000,
        temp_dir: PathBuf::from("/var/tmp"),
        template_root: PathBuf::from("/srv/templates"),
        allowed_origins: vec!["https://app.example".to_string()],
    };
    let cloned = config.clone();
    assert_eq!(cloned.host, "0.0.0.0");
    assert_eq!(cloned.port, 3000);
    assert_eq!(cloned.temp_dir, PathBuf::from("/var/tmp"));
    assert_eq!(cloned.template_root, PathBuf::from("/srv/templates"));
    assert_eq!(cloned.allowed_origins.len(), 1);
}

#[test]
fn test_app_state_in_arc() {
    let state = Arc::new(AppState::new(PathBuf::from("/srv"), PathBuf::from("/tmp")));
    let state_clone = Arc::clone(&state);
    assert_eq!(state.version, state_clone.version);
}

// ═══════════════════════════════════════════════════════════════════════════
// API RESPONSE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_api_response_ok() {
    let response = ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
    });
    assert!(response.success);
    assert!(response.error.is_none());
    assert_eq!(response.request_id.len(), 36);
}

#[test]
fn test_api_response_err_serialization() {
    let response: ApiResponse<FillResponse> = ApiResponse::err("boom");
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["success"], json!(false));
    assert_eq!(value["error"], json!("boom"));
    assert!(value.get("data").is_none());
}

#[test]
fn test_request_ids_are_unique() {
    let a: ApiResponse<()> = ApiResponse::err("a");
    let b: ApiResponse<()> = ApiResponse::err("b");
    assert_ne!(a.request_id, b.request_id);
}

// ═══════════════════════════════════════════════════════════════════════════
// ROUTES
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_root_lists_endpoints() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(router(dir.path()), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    let endpoints = body["data"]["endpoints"].as_array().unwrap();
    assert!(endpoints
        .iter()
        .any(|e| e["path"] == json!("/api/v1/fill") && e["method"] == json!("POST")));
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(router(dir.path()), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("healthy"));
}

#[tokio::test]
async fn test_version() {
    let dir = TempDir::new().unwrap();
    let (_, body) = get(router(dir.path()), "/version").await;

    assert_eq!(body["data"]["version"], json!(env!("CARGO_PKG_VERSION")));
    assert_eq!(body["data"]["node"], json!("excelByTemplate"));
}

#[tokio::test]
async fn test_unknown_route() {
    let dir = TempDir::new().unwrap();
    let (status, _) = get(router(dir.path()), "/api/v1/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ═══════════════════════════════════════════════════════════════════════════
// FILL
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_fill_returns_workbook() {
    let dir = TempDir::new().unwrap();
    let template = write_template(dir.path());

    let (status, body) = post_json(
        router(dir.path()),
        "/api/v1/fill",
        json!({
            "templateFile": template.to_string_lossy(),
            "startRow": 2,
            "columnsConfig": {"indexColumn": [{"index": 1, "property": "name"}]},
            "items": [{"name": "Alice"}, {"name": "Bob"}]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["failed"], json!(0));

    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    let data = items[0]["binary"]["data"]["data"].as_str().unwrap();
    let bytes = STANDARD.decode(data).unwrap();

    let workbook = TemplateWorkbook::from_bytes(&bytes).unwrap();
    let sheet = workbook.first_worksheet().unwrap();
    assert_eq!(sheet.cell(2, 1).and_then(CellValue::as_str), Some("Alice"));
    assert_eq!(sheet.cell(3, 1).and_then(CellValue::as_str), Some("Bob"));
}

#[tokio::test]
async fn test_fill_continue_on_fail_reports_failures() {
    let dir = TempDir::new().unwrap();
    let template = write_template(dir.path());

    let (_, body) = post_json(
        router(dir.path()),
        "/api/v1/fill",
        json!({
            "templateFile": template.to_string_lossy(),
            "columnsConfig": {"indexColumn": [{"index": 1, "property": "name"}]},
            "continueOnFail": true,
            "items": [{"name": [1, 2]}, {"name": "Bob"}]
        }),
    )
    .await;

    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["failed"], json!(1));
    assert_eq!(body["data"]["items"][1]["pairedItem"], json!(0));
}

#[tokio::test]
async fn test_fill_invalid_job() {
    let dir = TempDir::new().unwrap();
    let (status, body) = post_json(
        router(dir.path()),
        "/api/v1/fill",
        json!({"columnsConfig": {}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Job validation failed"));
}

#[tokio::test]
async fn test_fill_without_columns() {
    let dir = TempDir::new().unwrap();
    let template = write_template(dir.path());

    let (_, body) = post_json(
        router(dir.path()),
        "/api/v1/fill",
        json!({
            "templateFile": template.to_string_lossy(),
            "columnsConfig": {"indexColumn": []},
            "items": [{"name": "Alice"}]
        }),
    )
    .await;

    assert_eq!(body["success"], json!(false));
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("no configuration columns"));
}

#[tokio::test]
async fn test_fill_leaves_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let template = write_template(dir.path());

    post_json(
        router(dir.path()),
        "/api/v1/fill",
        json!({
            "templateFile": template.to_string_lossy(),
            "columnsConfig": {"indexColumn": [{"index": 1, "property": "name"}]},
            "items": [{"name": "Alice"}]
        }),
    )
    .await;

    let leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("temp_"))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_fill_relative_template_inside_root() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path());

    let (_, body) = post_json(router(dir.path()), "/api/v1/fill", fill_job("template.xlsx")).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["failed"], json!(0));
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFINEMENT
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_fill_rejects_parent_traversal() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("templates");
    std::fs::create_dir(&root).unwrap();
    write_template(dir.path());

    let (status, body) =
        post_json(router(&root), "/api/v1/fill", fill_job("../template.xlsx")).await;
    assert_eq!(status, StatusCode::OK);
    assert_rejected(&body, "template root");
}

#[tokio::test]
async fn test_fill_rejects_absolute_path_outside_root() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("templates");
    std::fs::create_dir(&root).unwrap();
    let outside = write_template(dir.path());

    let (_, body) = post_json(
        router(&root),
        "/api/v1/fill",
        fill_job(&outside.to_string_lossy()),
    )
    .await;
    assert_rejected(&body, "template root");

    let (_, body) = post_json(router(&root), "/api/v1/fill", fill_job("/etc/passwd")).await;
    assert_rejected(&body, "template root");
}

#[tokio::test]
async fn test_fill_rejects_items_file() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path());
    let secret = dir.path().join("secret.json");
    std::fs::write(&secret, r#"["token=s3cr3t"]"#).unwrap();

    let mut job = fill_job("template.xlsx");
    job["itemsFile"] = json!(secret.to_string_lossy());
    let (_, body) = post_json(router(dir.path()), "/api/v1/fill", job).await;

    assert_rejected(&body, "itemsFile");
    assert!(!body.to_string().contains("s3cr3t"));
}

// ═══════════════════════════════════════════════════════════════════════════
// CORS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_cors_disabled_by_default() {
    let dir = TempDir::new().unwrap();
    let response = preflight(router(dir.path()), "https://evil.example").await;
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}

#[tokio::test]
async fn test_cors_allows_only_configured_origins() {
    let dir = TempDir::new().unwrap();
    let state = AppState::new(dir.path().to_path_buf(), dir.path().to_path_buf())
        .with_allowed_origins(vec!["https://app.example".to_string()]);
    let app = build_router(Arc::new(state));

    let response = preflight(app.clone(), "https://app.example").await;
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "https://app.example"
    );

    let response = preflight(app, "https://evil.example").await;
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}
