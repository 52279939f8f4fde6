//! Excel By Template - fill spreadsheet templates from JSON items
//!
//! Loads an `.xlsx` template, writes one row per input item into its first
//! worksheet starting at a configured row, and returns the workbook as a
//! binary attachment named `data`.
//!
//! # Features
//!
//! - Column mappings from 1-based column index to item property
//! - Template formatting kept: only the filled rows of the package change
//! - Per-item failures absorbed under continue-on-fail, with diagnostics
//! - Temporary file cleanup on every exit path
//! - Job files (YAML/JSON) validated against a JSON Schema
//! - CLI and HTTP front ends
//!
//! # Example
//!
//! ```no_run
//! use excel_by_template::context::LocalContext;
//! use excel_by_template::node::ExcelByTemplate;
//! use excel_by_template::types::{ColumnMapping, ColumnsConfig, FillParameters};
//! use serde_json::json;
//!
//! let parameters = FillParameters {
//!     template_file: "invoice-template.xlsx".to_string(),
//!     start_row: 2,
//!     columns_config: ColumnsConfig::new(vec![
//!         ColumnMapping::new(1, "name"),
//!         ColumnMapping::new(2, "amount"),
//!     ]),
//! };
//!
//! let ctx = LocalContext::new()
//!     .with_parameters(&parameters)?
//!     .with_items(vec![json!({"name": "Alice", "amount": 10}).as_object().cloned().unwrap_or_default()]);
//!
//! let items = ExcelByTemplate::new().execute(&ctx)?;
//! println!("{} bytes", items[0].binary["data"].file_size);
//! # Ok::<(), excel_by_template::error::TemplateError>(())
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod excel;
pub mod filler;
pub mod node;
pub mod types;

// Re-export commonly used types
pub use context::{ExecutionContext, LocalContext};
pub use error::{CellError, TemplateError, TemplateResult};
pub use excel::{CellValue, TemplateWorkbook};
pub use filler::{FailurePolicy, TemplateFiller};
pub use node::ExcelByTemplate;
pub use types::{BinaryData, ColumnMapping, ColumnsConfig, FillParameters, NodeExecutionData};
