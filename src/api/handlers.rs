//! API request handlers

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::JobConfig;
use crate::error::{TemplateError, TemplateResult};
use crate::node::ExcelByTemplate;
use crate::types::NodeExecutionData;

use super::server::AppState;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(path: &str, method: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(RootResponse {
        name: "Excel By Template".to_string(),
        version: state.version.clone(),
        description: "Fill spreadsheet templates from JSON items".to_string(),
        endpoints: vec![
            EndpointInfo::new("/health", "GET", "Health check endpoint"),
            EndpointInfo::new("/version", "GET", "Get server version"),
            EndpointInfo::new("/api/v1/fill", "POST", "Fill a template and return the workbook"),
        ],
    }))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub node: String,
    pub node_version: u32,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let description = ExcelByTemplate::new().description();
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        node: description.name,
        node_version: description.version,
    }))
}

/// Fill response: the attachment item plus any diagnostics
#[derive(Serialize, Default)]
pub struct FillResponse {
    pub items: Vec<NodeExecutionData>,
    pub failed: usize,
}

/// POST /api/v1/fill - Fill a template
///
/// The body is a job document (see `schema/job.schema.json`); `output` is
/// ignored since the workbook is returned inline as base64. `templateFile`
/// must resolve inside the server's template root and items must be sent
/// inline.
pub async fn fill(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> impl IntoResponse {
    let outcome = tokio::task::spawn_blocking(move || run_fill(body, &state)).await;

    match outcome {
        Ok(Ok(items)) => {
            let failed = items.iter().filter(|item| item.is_error()).count();
            Json(ApiResponse::ok(FillResponse { items, failed }))
        }
        Ok(Err(e)) => Json(ApiResponse::err(e.to_string())),
        Err(e) => Json(ApiResponse::err(format!("Fill task failed: {}", e))),
    }
}

fn run_fill(body: Value, state: &AppState) -> TemplateResult<Vec<NodeExecutionData>> {
    let mut job = JobConfig::from_value(body)?;
    if job.items_file.is_some() {
        return Err(TemplateError::Configuration(
            "'itemsFile' is not accepted over HTTP; send 'items' inline".to_string(),
        ));
    }
    job.template_file = state.resolve_template(&job.template_file)?;
    let ctx = job.to_context()?;
    ExcelByTemplate::with_temp_dir(&state.temp_dir).execute(&ctx)
}
