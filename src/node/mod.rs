//! The Excel By Template node
//!
//! Loads a template workbook, fills its first worksheet from the input items
//! and returns one item carrying the generated workbook as binary `data`.

mod description;
mod temp_path;

pub use description::{
    NodeDefaults, NodeDescription, NodeProperty, PropertyCollection, PropertyType, TypeOptions,
};
pub use temp_path::TempPath;

use crate::context::ExecutionContext;
use crate::error::{TemplateError, TemplateResult};
use crate::excel::TemplateWorkbook;
use crate::filler::{FailedItem, FailurePolicy, TemplateFiller};
use crate::types::{FillParameters, NodeExecutionData, BINARY_PROPERTY};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use tracing::info;

/// Fills a spreadsheet template from input items.
#[derive(Debug, Clone)]
pub struct ExcelByTemplate {
    temp_dir: PathBuf,
}

impl Default for ExcelByTemplate {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("."),
        }
    }
}

impl ExcelByTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory for the per-execution temporary file.
    pub fn with_temp_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: dir.into(),
        }
    }

    pub fn description(&self) -> NodeDescription {
        description::excel_by_template()
    }

    /// Run the node.
    ///
    /// Returns the attachment item followed by one diagnostic item per input
    /// item skipped under continue-on-fail. Any fatal error returns no items.
    pub fn execute(&self, ctx: &dyn ExecutionContext) -> TemplateResult<Vec<NodeExecutionData>> {
        let temp_path = TempPath::new(&self.temp_dir);

        let parameters = self.parameters(ctx)?;
        let filler = TemplateFiller::from_parameters(&parameters)?;

        let mut workbook = TemplateWorkbook::load(&parameters.template_file)?;
        let policy = FailurePolicy::from(ctx.continue_on_fail());
        let items = ctx.input_data();
        let report = filler.fill(&mut workbook, items, policy)?;

        let buffer = workbook.to_bytes()?;
        let attachment = ctx.prepare_binary_data(buffer, temp_path.path())?;

        info!(
            template = %parameters.template_file,
            items = items.len(),
            rows = report.rows_written,
            cells = report.cells_written,
            failed = report.failures.len(),
            file_name = %attachment.file_name,
            "template filled"
        );

        let mut output = Vec::with_capacity(1 + report.failures.len());
        output.push(NodeExecutionData::with_binary(BINARY_PROPERTY, attachment));
        output.extend(report.failures.into_iter().map(FailedItem::into_item));
        Ok(output)
    }

    /// Resolve the node parameters, falling back to the defaults declared in
    /// the description.
    pub fn parameters(&self, ctx: &dyn ExecutionContext) -> TemplateResult<FillParameters> {
        let template_file: String = self.parameter(ctx, "templateFile")?;
        if template_file.trim().is_empty() {
            return Err(TemplateError::Configuration(
                "Missing required parameter 'templateFile'".to_string(),
            ));
        }

        Ok(FillParameters {
            template_file,
            start_row: self.parameter(ctx, "startRow")?,
            columns_config: self.parameter(ctx, "columnsConfig")?,
        })
    }

    fn parameter<T: DeserializeOwned>(
        &self,
        ctx: &dyn ExecutionContext,
        name: &str,
    ) -> TemplateResult<T> {
        let value = match ctx.node_parameter(name, 0) {
            Some(value) if !value.is_null() => value,
            _ => self
                .description()
                .property(name)
                .map(|p| p.default.clone())
                .ok_or_else(|| {
                    TemplateError::Configuration(format!("Unknown parameter '{}'", name))
                })?,
        };

        serde_json::from_value(value).map_err(|e| {
            TemplateError::Configuration(format!("Invalid parameter '{}': {}", name, e))
        })
    }
}
