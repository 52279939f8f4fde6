use thiserror::Error;

pub type TemplateResult<T> = Result<T, TemplateError>;

/// Fatal and per-item errors raised while filling a template.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Bad node configuration: no columns, no worksheet, invalid parameters.
    /// Never absorbed by continue-on-fail.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A single input item could not be written.
    #[error("{source} [item {item_index}]")]
    Record {
        item_index: usize,
        #[source]
        source: CellError,
    },

    /// The template could not be loaded or the workbook could not be serialized.
    #[error("Workbook error: {0}")]
    Codec(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TemplateError {
    /// Index of the input item that caused the error, if any.
    pub fn item_index(&self) -> Option<usize> {
        match self {
            TemplateError::Record { item_index, .. } => Some(*item_index),
            _ => None,
        }
    }
}

/// Why a value could not be placed into a cell.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CellError {
    #[error("Column index {index} is out of range (expected 1..=16384)")]
    InvalidColumn { index: u32 },

    #[error("Row {row} is out of range (expected 1..=1048576)")]
    InvalidRow { row: u64 },

    #[error("Value of property '{property}' is {kind} and cannot be written to a cell")]
    UnsupportedValue { property: String, kind: &'static str },

    #[error("Text of property '{property}' has {length} characters (a cell holds at most 32767)")]
    TextTooLong { property: String, length: usize },
}
