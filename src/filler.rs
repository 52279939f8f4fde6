//! Template filler: writes item fields into the first worksheet, one row per item

use crate::error::{CellError, TemplateError, TemplateResult};
use crate::excel::cell::check_column;
use crate::excel::{CellValue, TemplateSheet, TemplateWorkbook};
use crate::types::{ColumnMapping, FillParameters, JsonObject, NodeExecutionData};
use tracing::{debug, warn};

/// What happens when a single item cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the whole run with the item's error.
    #[default]
    Abort,
    /// Record the item as failed and move on to the next one.
    ContinueOnFail,
}

impl From<bool> for FailurePolicy {
    fn from(continue_on_fail: bool) -> Self {
        if continue_on_fail {
            FailurePolicy::ContinueOnFail
        } else {
            FailurePolicy::Abort
        }
    }
}

/// An item skipped under [`FailurePolicy::ContinueOnFail`].
#[derive(Debug, Clone, PartialEq)]
pub struct FailedItem {
    pub index: usize,
    pub json: JsonObject,
    pub error: CellError,
}

impl FailedItem {
    /// Diagnostic item carrying the original fields, the error and the index.
    pub fn into_item(self) -> NodeExecutionData {
        NodeExecutionData::failed(self.json, self.error.to_string(), self.index)
    }
}

/// Outcome of a fill run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillReport {
    pub rows_written: usize,
    pub cells_written: usize,
    pub failures: Vec<FailedItem>,
}

/// Maps item fields onto cells starting at `start_row`.
#[derive(Debug, Clone)]
pub struct TemplateFiller {
    start_row: u32,
    columns: Vec<ColumnMapping>,
}

impl TemplateFiller {
    /// Create a filler. Fails when no columns are configured or `start_row` is 0.
    pub fn new(start_row: u32, columns: Vec<ColumnMapping>) -> TemplateResult<Self> {
        if columns.is_empty() {
            return Err(TemplateError::Configuration(
                "no configuration columns".to_string(),
            ));
        }
        if start_row == 0 {
            return Err(TemplateError::Configuration(
                "start row must be 1 or greater".to_string(),
            ));
        }
        Ok(Self { start_row, columns })
    }

    pub fn from_parameters(parameters: &FillParameters) -> TemplateResult<Self> {
        Self::new(
            parameters.start_row,
            parameters.columns_config.index_column.clone(),
        )
    }

    pub fn start_row(&self) -> u32 {
        self.start_row
    }

    pub fn columns(&self) -> &[ColumnMapping] {
        &self.columns
    }

    /// Write `items[i][mapping.property]` into row `start_row + i`, column
    /// `mapping.index` of the first worksheet.
    ///
    /// A row is committed only when every mapping of its item succeeded, so a
    /// failed item leaves its row as the template had it.
    pub fn fill(
        &self,
        workbook: &mut TemplateWorkbook,
        items: &[NodeExecutionData],
        policy: FailurePolicy,
    ) -> TemplateResult<FillReport> {
        let sheet = workbook
            .first_worksheet_mut()
            .ok_or_else(|| TemplateError::Configuration("no worksheet".to_string()))?;

        let mut report = FillReport::default();

        for (index, item) in items.iter().enumerate() {
            match self.fill_item(sheet, index, item) {
                Ok(written) => {
                    report.rows_written += 1;
                    report.cells_written += written;
                }
                Err(error) => match policy {
                    FailurePolicy::ContinueOnFail => {
                        warn!(item_index = index, %error, "skipping item");
                        report.failures.push(FailedItem {
                            index,
                            json: item.json.clone(),
                            error,
                        });
                    }
                    FailurePolicy::Abort => {
                        return Err(TemplateError::Record {
                            item_index: index,
                            source: error,
                        });
                    }
                },
            }
        }

        Ok(report)
    }

    fn fill_item(
        &self,
        sheet: &mut TemplateSheet,
        index: usize,
        item: &NodeExecutionData,
    ) -> Result<usize, CellError> {
        let row_number = u64::from(self.start_row) + index as u64;
        let mut row = sheet.row(row_number)?;

        for column in &self.columns {
            // An absent field leaves the template cell alone
            let Some(value) = item.json.get(&column.property) else {
                check_column(column.index)?;
                continue;
            };
            let cell = CellValue::from_json(&column.property, value)?;
            row.set(column.index, cell)?;
        }

        let written = row.commit();
        debug!(item_index = index, row = row_number, cells = written, "row committed");
        Ok(written)
    }
}
