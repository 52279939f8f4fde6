//! HTTP API module
//!
//! Serves the node as a REST endpoint.
//! Run with `excel-by-template-server`.

pub mod handlers;
pub mod server;

pub use server::{build_router, run_api_server, ApiConfig, AppState};
