//! Template workbook codec
//!
//! - Read: Excel (.xlsx) → TemplateWorkbook (calamine), keeping the package bytes
//! - Write: the template package with the first sheet's edited rows patched
//!   in (zip + quick-xml); workbooks built in memory go through rust_xlsxwriter
//!
//! A loaded template is written back with its styles, column widths, merged
//! ranges and other parts untouched. With no edits the output is the template
//! byte for byte.

pub mod cell;
mod package;
mod reader;
#[cfg(test)]
mod test_package;
mod workbook;
mod writer;

pub use cell::{cell_reference, column_index, column_letter, CellValue};
pub use workbook::{RowWriter, TemplateSheet, TemplateWorkbook};
