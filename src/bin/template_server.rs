//! Excel By Template API Server binary
//!
//! HTTP REST front end for the Excel By Template node.

use clap::Parser;
use excel_by_template::api::{run_api_server, ApiConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "excel-by-template-server")]
#[command(version)]
#[command(about = "Excel By Template API Server - fill spreadsheet templates over HTTP")]
#[command(long_about = r#"
Excel By Template API Server

Endpoints:
  - POST /api/v1/fill  - Fill a template, returns the workbook as base64
  - GET  /health       - Health check
  - GET  /version      - Server version info
  - GET  /             - API documentation

Features:
  - Templates are confined to --template-root; items are sent inline
  - CORS only for origins given with --allow-origin
  - Graceful shutdown on SIGINT/SIGTERM
  - JSON response format with request IDs
  - Each request runs on a blocking worker with its own temp file

Example usage:
  excel-by-template-server                        # Start on localhost:8080
  excel-by-template-server --host 0.0.0.0 --port 3000
  excel-by-template-server --template-root /srv/templates \
    --allow-origin https://app.example.com

  curl -X POST http://localhost:8080/api/v1/fill \
    -H "Content-Type: application/json" \
    -d '{"templateFile": "invoice.xlsx", "startRow": 2,
         "columnsConfig": {"indexColumn": [{"index": 1, "property": "name"}]},
         "items": [{"name": "Alice"}]}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "TEMPLATE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "TEMPLATE_PORT")]
    port: u16,

    /// Directory for per-request temporary files (defaults to the system temp dir)
    #[arg(long, env = "TEMPLATE_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Directory that requested templates must resolve into
    #[arg(long, default_value = ".", env = "TEMPLATE_ROOT")]
    template_root: PathBuf,

    /// Origin allowed to call the API from a browser (repeatable, or comma-separated)
    #[arg(long = "allow-origin", env = "TEMPLATE_ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "excel_by_template=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        temp_dir: args.temp_dir.unwrap_or_else(std::env::temp_dir),
        template_root: args.template_root,
        allowed_origins: args.allowed_origins,
    };

    run_api_server(config).await
}
