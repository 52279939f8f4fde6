//! Workbook serialization - TemplateWorkbook → .xlsx bytes

use crate::error::{TemplateError, TemplateResult};
use crate::excel::cell::{cell_reference, CellValue};
use crate::excel::workbook::TemplateWorkbook;
use rust_xlsxwriter::{Format, Formula, Url, Workbook, Worksheet, XlsxError};
use tracing::warn;

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATE_TIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

impl TemplateWorkbook {
    /// Serialize the workbook to .xlsx bytes.
    ///
    /// A workbook loaded from a template is written as the template package
    /// with the first sheet's edits patched in. Anything else is rebuilt from
    /// the cell model.
    pub fn to_bytes(&self) -> TemplateResult<Vec<u8>> {
        let Some(package) = self.package() else {
            return self.rebuild();
        };

        let sheets = self.sheets();
        let unchanged_layout = sheets.len() == package.sheet_count()
            && sheets.iter().skip(1).all(|sheet| !sheet.is_edited());
        if !unchanged_layout {
            warn!(
                "workbook changed outside its first sheet; rebuilding without template formatting"
            );
            return self.rebuild();
        }

        match sheets.first() {
            Some(first) => package.patch_first_sheet(first.edits()),
            None => self.rebuild(),
        }
    }

    /// Write every sheet and cell with rust_xlsxwriter.
    fn rebuild(&self) -> TemplateResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let formats = DateFormats::new();

        // The writer cannot produce a workbook without sheets
        if self.sheets().is_empty() {
            workbook.add_worksheet();
        }

        for sheet in self.sheets() {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet.name()).map_err(|e| {
                TemplateError::Codec(format!(
                    "Failed to set worksheet name '{}': {}",
                    sheet.name(),
                    e
                ))
            })?;

            for (row, col, value) in sheet.raw_cells() {
                write_cell(worksheet, row, col, value, &formats).map_err(|e| {
                    TemplateError::Codec(format!(
                        "Failed to write {}!{}: {}",
                        sheet.name(),
                        cell_reference(row + 1, u32::from(col) + 1),
                        e
                    ))
                })?;
            }
        }

        workbook
            .save_to_buffer()
            .map_err(|e| TemplateError::Codec(format!("Failed to serialize workbook: {}", e)))
    }
}

struct DateFormats {
    date: Format,
    date_time: Format,
}

impl DateFormats {
    fn new() -> Self {
        Self {
            date: Format::new().set_num_format(DATE_FORMAT),
            date_time: Format::new().set_num_format(DATE_TIME_FORMAT),
        }
    }

    fn for_serial(&self, serial: f64) -> &Format {
        if serial.fract() == 0.0 {
            &self.date
        } else {
            &self.date_time
        }
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    formats: &DateFormats,
) -> Result<(), XlsxError> {
    match value {
        CellValue::Empty => return Ok(()),
        CellValue::Number(n) => worksheet.write_number(row, col, *n)?,
        CellValue::String(s) => worksheet.write_string(row, col, s)?,
        CellValue::Boolean(b) => worksheet.write_boolean(row, col, *b)?,
        CellValue::DateTime(serial) => {
            worksheet.write_number_with_format(row, col, *serial, formats.for_serial(*serial))?
        }
        CellValue::Error(error) => {
            let formula = Formula::new(error.as_str()).set_result(error.as_str());
            worksheet.write_formula(row, col, formula)?
        }
        CellValue::Formula { formula, result } => {
            let mut formula = Formula::new(formula.as_str());
            if let Some(result) = result {
                formula = formula.set_result(result.as_str());
            }
            worksheet.write_formula(row, col, formula)?
        }
        CellValue::Hyperlink { text, url } => {
            let link = Url::new(url.as_str()).set_text(text.as_str());
            worksheet.write_url(row, col, link)?
        }
    };
    Ok(())
}
