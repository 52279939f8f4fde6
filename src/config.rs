//! Job configuration
//!
//! A job file (YAML or JSON) holds the node parameters, the input items and
//! the failure policy for one run:
//!
//! ```yaml
//! templateFile: invoice-template.xlsx
//! startRow: 2
//! columnsConfig:
//!   indexColumn:
//!     - { index: 1, property: name }
//!     - { index: 2, property: amount }
//! continueOnFail: true
//! itemsFile: items.json
//! output: invoice.xlsx
//! ```
//!
//! Relative paths are resolved against the job file's directory.

use crate::context::LocalContext;
use crate::error::{TemplateError, TemplateResult};
use crate::types::{ColumnsConfig, FillParameters, JsonObject};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const JOB_SCHEMA: &str = include_str!("../schema/job.schema.json");

fn default_start_row() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    pub template_file: PathBuf,
    #[serde(default = "default_start_row")]
    pub start_row: u32,
    #[serde(default)]
    pub columns_config: ColumnsConfig,
    #[serde(default)]
    pub continue_on_fail: bool,
    #[serde(default)]
    pub items: Vec<JsonObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl JobConfig {
    /// Read, validate and resolve a job file.
    pub fn from_file(path: &Path) -> TemplateResult<Self> {
        let content = fs::read_to_string(path)?;
        // YAML is a superset of JSON, so both formats go through serde_yaml
        let value: Value = serde_yaml::from_str(&content)?;
        let mut job = Self::from_value(value)?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        job.resolve_paths(base_dir);
        job.load_items_file()?;
        Ok(job)
    }

    /// Validate a JSON document against the job schema and deserialize it.
    pub fn from_value(value: Value) -> TemplateResult<Self> {
        validate_against_schema(&value)?;
        serde_json::from_value(value)
            .map_err(|e| TemplateError::Configuration(format!("Invalid job: {}", e)))
    }

    pub fn parameters(&self) -> FillParameters {
        FillParameters {
            template_file: self.template_file.to_string_lossy().into_owned(),
            start_row: self.start_row,
            columns_config: self.columns_config.clone(),
        }
    }

    /// Build the in-process host for this job.
    pub fn to_context(&self) -> TemplateResult<LocalContext> {
        Ok(LocalContext::new()
            .with_parameters(&self.parameters())?
            .with_items(self.items.clone())
            .with_continue_on_fail(self.continue_on_fail))
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        self.template_file = resolve(base_dir, &self.template_file);
        self.items_file = self.items_file.as_deref().map(|p| resolve(base_dir, p));
        self.output = self.output.as_deref().map(|p| resolve(base_dir, p));
    }

    /// Append the items of `itemsFile` (if set) after the inline items.
    pub fn load_items_file(&mut self) -> TemplateResult<()> {
        if let Some(items_file) = &self.items_file {
            let items = load_items(items_file)?;
            self.items.extend(items);
        }
        Ok(())
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base_dir.join(path)
    } else {
        path.to_path_buf()
    }
}

/// Load a JSON or YAML list of item objects.
pub fn load_items(path: &Path) -> TemplateResult<Vec<JsonObject>> {
    let content = fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&content)?;
    match value {
        Value::Array(entries) => entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Value::Object(map) => Ok(map),
                other => Err(TemplateError::Configuration(format!(
                    "Item {} in '{}' is not an object but {}",
                    index,
                    path.display(),
                    value_kind(&other)
                ))),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(TemplateError::Configuration(format!(
            "'{}' must contain a list of items",
            path.display()
        ))),
    }
}

/// Name of a JSON value's type, for messages that must not echo content.
fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Validate a job document against the embedded JSON Schema
pub fn validate_against_schema(value: &Value) -> TemplateResult<()> {
    let schema_value: Value = serde_json::from_str(JOB_SCHEMA)
        .map_err(|e| TemplateError::Configuration(format!("Failed to parse schema: {}", e)))?;

    let compiled_schema = JSONSchema::compile(&schema_value)
        .map_err(|e| TemplateError::Configuration(format!("Failed to compile schema: {}", e)))?;

    if let Err(errors) = compiled_schema.validate(value) {
        let error_messages: Vec<String> = errors.map(|e| format!("  - {}", e)).collect();
        return Err(TemplateError::Configuration(format!(
            "Job validation failed:\n{}",
            error_messages.join("\n")
        )));
    }

    Ok(())
}
