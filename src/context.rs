//! Host execution context
//!
//! The node never reaches for ambient host state. Everything it needs
//! (parameters, input items, the failure policy and the binary helper) comes
//! through [`ExecutionContext`].

use crate::error::{TemplateError, TemplateResult};
use crate::types::{BinaryData, FillParameters, JsonObject, NodeExecutionData};
use serde_json::Value;
use std::path::Path;

/// Mime type of .xlsx workbooks.
pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Services the host provides to a node while it executes.
pub trait ExecutionContext {
    /// Raw value of a node parameter for the given item, `None` when unset.
    fn node_parameter(&self, name: &str, item_index: usize) -> Option<Value>;

    /// Items passed into the node.
    fn input_data(&self) -> &[NodeExecutionData];

    /// Whether per-item failures are absorbed into the output.
    fn continue_on_fail(&self) -> bool;

    /// Wrap bytes as a binary attachment. `file_path` names the attachment.
    fn prepare_binary_data(&self, data: Vec<u8>, file_path: &Path) -> TemplateResult<BinaryData>;
}

/// In-process host used by the CLI, the HTTP server and tests.
#[derive(Debug, Clone, Default)]
pub struct LocalContext {
    parameters: JsonObject,
    items: Vec<NodeExecutionData>,
    continue_on_fail: bool,
}

impl LocalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Set `templateFile`, `startRow` and `columnsConfig` at once.
    pub fn with_parameters(mut self, parameters: &FillParameters) -> TemplateResult<Self> {
        match serde_json::to_value(parameters)? {
            Value::Object(map) => self.parameters.extend(map),
            _ => {
                return Err(TemplateError::Configuration(
                    "parameters must serialize to an object".to_string(),
                ))
            }
        }
        Ok(self)
    }

    pub fn with_items<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeExecutionData>,
    {
        self.items = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }
}

impl ExecutionContext for LocalContext {
    fn node_parameter(&self, name: &str, _item_index: usize) -> Option<Value> {
        self.parameters.get(name).cloned()
    }

    fn input_data(&self) -> &[NodeExecutionData] {
        &self.items
    }

    fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }

    fn prepare_binary_data(&self, data: Vec<u8>, file_path: &Path) -> TemplateResult<BinaryData> {
        let file_name = file_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                TemplateError::Configuration(format!(
                    "Cannot name attachment from path '{}'",
                    file_path.display()
                ))
            })?
            .to_string();
        let file_extension = file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        Ok(BinaryData {
            file_size: data.len(),
            mime_type: mime_type_for(&file_extension).to_string(),
            data,
            file_name,
            file_extension,
        })
    }
}

fn mime_type_for(extension: &str) -> &'static str {
    match extension {
        "xlsx" => XLSX_MIME_TYPE,
        "xlsm" => "application/vnd.ms-excel.sheet.macroEnabled.12",
        "json" => "application/json",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}
