//! Template loading - Excel (.xlsx) → TemplateWorkbook

use crate::error::{TemplateError, TemplateResult};
use crate::excel::cell::CellValue;
use crate::excel::package::TemplatePackage;
use crate::excel::workbook::{TemplateSheet, TemplateWorkbook};
use calamine::{Data, Range, Reader, Xlsx};
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::debug;

impl TemplateWorkbook {
    /// Load a template from an .xlsx file
    pub fn load<P: AsRef<Path>>(path: P) -> TemplateResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            TemplateError::Codec(format!(
                "Failed to open template '{}': {}",
                path.display(),
                e
            ))
        })?;

        let template = Self::from_bytes(&bytes).map_err(|e| match e {
            TemplateError::Codec(msg) => {
                TemplateError::Codec(format!("Template '{}': {}", path.display(), msg))
            }
            other => other,
        })?;
        debug!(
            path = %path.display(),
            sheets = template.sheets().len(),
            "loaded template"
        );
        Ok(template)
    }

    /// Load a template from .xlsx bytes. The bytes are kept so that
    /// [`TemplateWorkbook::to_bytes`] can write the template back with its
    /// formatting.
    pub fn from_bytes(bytes: &[u8]) -> TemplateResult<Self> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| TemplateError::Codec(format!("Failed to read workbook: {}", e)))?;
        let mut template = read_sheets(&mut workbook)?;
        let package = TemplatePackage::new(bytes.to_vec(), template.sheets().len())?;
        template.set_package(package);
        Ok(template)
    }
}

fn read_sheets<RS: Read + Seek>(workbook: &mut Xlsx<RS>) -> TemplateResult<TemplateWorkbook> {
    let mut template = TemplateWorkbook::new();

    for sheet_name in workbook.sheet_names() {
        let values = workbook.worksheet_range(&sheet_name).map_err(|e| {
            TemplateError::Codec(format!("Failed to read worksheet '{}': {}", sheet_name, e))
        })?;
        let formulas = workbook.worksheet_formula(&sheet_name).map_err(|e| {
            TemplateError::Codec(format!(
                "Failed to read formulas of worksheet '{}': {}",
                sheet_name, e
            ))
        })?;

        let mut sheet = TemplateSheet::new(sheet_name);
        copy_values(&values, &mut sheet);
        copy_formulas(&formulas, &mut sheet);
        template.push_sheet(sheet);
    }

    Ok(template)
}

fn copy_values(range: &Range<Data>, sheet: &mut TemplateSheet) {
    let Some((start_row, start_col)) = range.start() else {
        return;
    };

    for (row, col, data) in range.used_cells() {
        let Some((row, col)) = absolute(start_row, start_col, row, col) else {
            continue;
        };
        sheet.insert_raw(row, col, convert_data(data));
    }
}

/// Formulas replace the plain value read for the same cell; that value is
/// kept as the cached result.
fn copy_formulas(range: &Range<String>, sheet: &mut TemplateSheet) {
    let Some((start_row, start_col)) = range.start() else {
        return;
    };

    for (row, col, formula) in range.used_cells() {
        if formula.is_empty() {
            continue;
        }
        let Some((row, col)) = absolute(start_row, start_col, row, col) else {
            continue;
        };
        let result = sheet
            .cell(row + 1, u32::from(col) + 1)
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string());
        let formula = formula.strip_prefix('=').unwrap_or(formula).to_string();
        sheet.insert_raw(row, col, CellValue::Formula { formula, result });
    }
}

fn absolute(start_row: u32, start_col: u32, row: usize, col: usize) -> Option<(u32, u16)> {
    let row = start_row.checked_add(u32::try_from(row).ok()?)?;
    let col = start_col.checked_add(u32::try_from(col).ok()?)?;
    Some((row, u16::try_from(col).ok()?))
}

fn convert_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}
