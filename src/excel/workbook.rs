//! In-memory workbook model for templates

use crate::error::CellError;
use crate::excel::cell::{check_column, check_row, CellValue};
use crate::excel::package::{CellEdits, TemplatePackage};
use std::collections::BTreeMap;

/// A workbook loaded from a template. Sheets keep the template's order; only
/// the first one is filled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateWorkbook {
    sheets: Vec<TemplateSheet>,
    package: Option<TemplatePackage>,
}

impl TemplateWorkbook {
    /// Create a workbook with no sheets
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_sheet(&mut self, sheet: TemplateSheet) {
        self.sheets.push(sheet);
    }

    pub fn sheets(&self) -> &[TemplateSheet] {
        &self.sheets
    }

    pub fn first_worksheet(&self) -> Option<&TemplateSheet> {
        self.sheets.first()
    }

    pub fn first_worksheet_mut(&mut self) -> Option<&mut TemplateSheet> {
        self.sheets.first_mut()
    }

    pub fn worksheet(&self, name: &str) -> Option<&TemplateSheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    /// Whether the workbook was loaded from a package it can be written
    /// back into.
    pub fn has_package(&self) -> bool {
        self.package.is_some()
    }

    pub(crate) fn package(&self) -> Option<&TemplatePackage> {
        self.package.as_ref()
    }

    pub(crate) fn set_package(&mut self, package: TemplatePackage) {
        self.package = Some(package);
    }
}

/// Sparse cell storage for one worksheet, keyed by zero-based (row, column).
///
/// Writes made through [`RowWriter`] are also kept as edits, which is what
/// gets patched into the template package.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateSheet {
    name: String,
    cells: BTreeMap<(u32, u16), CellValue>,
    edits: CellEdits,
}

impl TemplateSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            edits: CellEdits::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Cell at 1-based `row` and `column`.
    pub fn cell(&self, row: u32, column: u32) -> Option<&CellValue> {
        let row = check_row(u64::from(row)).ok()?;
        let column = check_column(column).ok()?;
        self.cells.get(&(row, column))
    }

    /// Write a single cell at 1-based `row` and `column`. `Empty` clears it.
    pub fn set_cell(&mut self, row: u32, column: u32, value: CellValue) -> Result<(), CellError> {
        let mut staged = self.row(u64::from(row))?;
        staged.set(column, value)?;
        staged.commit();
        Ok(())
    }

    /// Start staging writes for a 1-based row. Nothing reaches the sheet until
    /// [`RowWriter::commit`] is called.
    pub fn row(&mut self, row: u64) -> Result<RowWriter<'_>, CellError> {
        let row = check_row(row)?;
        Ok(RowWriter {
            sheet: self,
            row,
            staged: Vec::new(),
        })
    }

    /// Populated cells as 1-based (row, column, value), in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, &CellValue)> {
        self.cells
            .iter()
            .map(|(&(row, col), value)| (row + 1, u32::from(col) + 1, value))
    }

    /// Last populated 1-based row and column.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let max_row = self.cells.keys().map(|&(row, _)| row).max()?;
        let max_col = self.cells.keys().map(|&(_, col)| col).max()?;
        Some((max_row + 1, u32::from(max_col) + 1))
    }

    /// Whether any cell was written since the sheet was loaded.
    pub fn is_edited(&self) -> bool {
        !self.edits.is_empty()
    }

    pub(crate) fn edits(&self) -> &CellEdits {
        &self.edits
    }

    pub(crate) fn raw_cells(&self) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.cells.iter().map(|(&(row, col), value)| (row, col, value))
    }

    /// Store a value at zero-based coordinates, as read from a template.
    pub(crate) fn insert_raw(&mut self, row: u32, col: u16, value: CellValue) {
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }
}

/// Pending writes for one row.
pub struct RowWriter<'a> {
    sheet: &'a mut TemplateSheet,
    row: u32,
    staged: Vec<(u16, CellValue)>,
}

impl RowWriter<'_> {
    /// Stage `value` for the 1-based `column`. A later write to the same
    /// column replaces an earlier one.
    pub fn set(&mut self, column: u32, value: CellValue) -> Result<(), CellError> {
        let col = check_column(column)?;
        self.staged.push((col, value));
        Ok(())
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Apply all staged writes to the sheet and return how many were applied.
    pub fn commit(self) -> usize {
        let count = self.staged.len();
        for (col, value) in self.staged {
            self.sheet.edits.insert((self.row, col), value.clone());
            self.sheet.insert_raw(self.row, col, value);
        }
        count
    }
}
