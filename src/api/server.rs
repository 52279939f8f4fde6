//! HTTP API server
//!
//! Hosts the node over HTTP using Axum: each `POST /api/v1/fill` request is
//! one execution with its own workbook and temporary file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{TemplateError, TemplateResult};

use super::handlers;

/// API Server configuration
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Directory for per-request temporary files
    pub temp_dir: PathBuf,
    /// Requests may only name templates inside this directory
    pub template_root: PathBuf,
    /// Origins allowed to call the API from a browser. Empty disables CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            temp_dir: std::env::temp_dir(),
            template_root: PathBuf::from("."),
            allowed_origins: Vec::new(),
        }
    }
}

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub version: String,
    pub temp_dir: PathBuf,
    pub template_root: PathBuf,
    pub allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(template_root: PathBuf, temp_dir: PathBuf) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            temp_dir,
            template_root,
            allowed_origins: Vec::new(),
        }
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Resolve a requested template path inside the template root.
    ///
    /// Relative paths are taken from the root. Symlinks and `..` are resolved
    /// before the check. A path that is missing and a path outside the root
    /// get the same error.
    pub fn resolve_template(&self, requested: &Path) -> TemplateResult<PathBuf> {
        let root = self.template_root.canonicalize().map_err(|e| {
            TemplateError::Configuration(format!(
                "Template root '{}' is not accessible: {}",
                self.template_root.display(),
                e
            ))
        })?;

        let unavailable = || {
            TemplateError::Configuration(format!(
                "Template '{}' is not available under the template root",
                requested.display()
            ))
        };

        let candidate = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            root.join(requested)
        };
        let resolved = candidate.canonicalize().map_err(|_| unavailable())?;
        if !resolved.starts_with(&root) || !resolved.is_file() {
            return Err(unavailable());
        }
        Ok(resolved)
    }
}

/// Build the router with all endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    let router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        .route("/api/v1/fill", post(handlers::fill))
        .with_state(state);

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };
    router.layer(TraceLayer::new_for_http())
}

/// CORS for the configured origins only; `None` when there are none.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig) -> anyhow::Result<()> {
    let state = AppState::new(config.template_root.clone(), config.temp_dir.clone())
        .with_allowed_origins(config.allowed_origins.clone());
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Excel By Template server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/fill, /health, /version");
    info!("   Template root: {}", config.template_root.display());
    if config.allowed_origins.is_empty() {
        info!("   CORS: disabled");
    } else {
        info!("   CORS origins: {}", config.allowed_origins.join(", "));
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Excel By Template server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
