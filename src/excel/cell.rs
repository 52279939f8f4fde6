//! Cell values and A1 addressing

use crate::error::CellError;
use serde_json::Value;
use std::fmt;

/// Worksheet row limit.
pub const MAX_ROWS: u32 = 1_048_576;
/// Worksheet column limit.
pub const MAX_COLUMNS: u32 = 16_384;
/// Longest string a cell can hold.
pub const MAX_STRING_LEN: usize = 32_767;

/// Value held by a single worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    String(String),
    Boolean(bool),
    /// Excel serial date carried over from the template.
    DateTime(f64),
    /// Error literal such as `#N/A`.
    Error(String),
    /// Formula without the leading `=`, with its cached result if known.
    Formula {
        formula: String,
        result: Option<String>,
    },
    Hyperlink {
        text: String,
        url: String,
    },
}

impl CellValue {
    /// Convert an item field into a cell value.
    ///
    /// Scalars are written as they are: no parsing of numeric strings, no
    /// date detection. `null` clears the cell. Objects are accepted only in
    /// the structured shapes a workbook understands:
    /// - `{"formula": "=A2*2", "result": 4}`
    /// - `{"hyperlink": "https://...", "text": "label"}`
    /// - `{"error": "#N/A"}`
    pub fn from_json(property: &str, value: &Value) -> Result<Self, CellError> {
        match value {
            Value::Null => Ok(CellValue::Empty),
            Value::Bool(b) => Ok(CellValue::Boolean(*b)),
            Value::Number(n) => n
                .as_f64()
                .map(CellValue::Number)
                .ok_or_else(|| unsupported(property, "a number outside the f64 range")),
            Value::String(s) => Ok(CellValue::String(checked_text(property, s)?)),
            Value::Array(_) => Err(unsupported(property, "an array")),
            Value::Object(map) => {
                if let Some(formula) = map.get("formula").and_then(Value::as_str) {
                    let formula = formula.strip_prefix('=').unwrap_or(formula);
                    return Ok(CellValue::Formula {
                        formula: formula.to_string(),
                        result: map.get("result").and_then(scalar_text),
                    });
                }
                if let Some(url) = map.get("hyperlink").and_then(Value::as_str) {
                    if url.is_empty() {
                        return Err(unsupported(property, "a hyperlink without a target"));
                    }
                    let text = map
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or(url);
                    return Ok(CellValue::Hyperlink {
                        text: checked_text(property, text)?,
                        url: url.to_string(),
                    });
                }
                if let Some(error) = map.get("error").and_then(Value::as_str) {
                    return Ok(CellValue::Error(error.to_string()));
                }
                Err(unsupported(property, "an object"))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) | CellValue::DateTime(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) | CellValue::DateTime(n) => write!(f, "{}", n),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Error(e) => write!(f, "{}", e),
            CellValue::Formula { formula, .. } => write!(f, "={}", formula),
            CellValue::Hyperlink { text, .. } => write!(f, "{}", text),
        }
    }
}

fn unsupported(property: &str, kind: &'static str) -> CellError {
    CellError::UnsupportedValue {
        property: property.to_string(),
        kind,
    }
}

fn checked_text(property: &str, text: &str) -> Result<String, CellError> {
    let length = text.chars().count();
    if length > MAX_STRING_LEN {
        return Err(CellError::TextTooLong {
            property: property.to_string(),
            length,
        });
    }
    Ok(text.to_string())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        _ => None,
    }
}

/// Check a 1-based column index and return the zero-based column number.
pub fn check_column(index: u32) -> Result<u16, CellError> {
    if index == 0 || index > MAX_COLUMNS {
        return Err(CellError::InvalidColumn { index });
    }
    Ok((index - 1) as u16)
}

/// Check a 1-based row number and return the zero-based row number.
pub fn check_row(row: u64) -> Result<u32, CellError> {
    if row == 0 || row > u64::from(MAX_ROWS) {
        return Err(CellError::InvalidRow { row });
    }
    Ok((row - 1) as u32)
}

/// Convert a 1-based column index to its letters
///
/// Examples:
/// - 1 → A
/// - 26 → Z
/// - 27 → AA
pub fn column_letter(index: u32) -> String {
    let mut result = String::new();
    let mut idx = index;

    while idx > 0 {
        let remainder = (idx - 1) % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        idx = (idx - 1) / 26;
    }

    result
}

/// Convert column letters (case-insensitive) to a 1-based column index.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// A1 reference for 1-based row and column.
pub fn cell_reference(row: u32, column: u32) -> String {
    format!("{}{}", column_letter(column), row)
}

/// Split an A1 reference into 1-based (row, column). `$` markers are ignored.
pub fn parse_cell_reference(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let column = column_index(letters)?;
    let row = digits.parse::<u32>().ok().filter(|row| *row > 0)?;
    Some((row, column))
}
