use crate::config::{load_items, JobConfig};
use crate::error::{TemplateError, TemplateResult};
use crate::excel::{cell_reference, column_index, TemplateWorkbook};
use crate::node::ExcelByTemplate;
use crate::types::{ColumnMapping, ColumnsConfig, NodeExecutionData, BINARY_PROPERTY};
use colored::Colorize;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// `COL=property`, where COL is a 1-based number or column letters
const COLUMN_SPEC_PATTERN: &str = r"^\s*([A-Za-z]{1,3}|\d+)\s*[=:]\s*(\S.*?)\s*$";

/// Options for the fill command
#[derive(Debug, Clone)]
pub struct FillOptions {
    pub template: PathBuf,
    pub input: Option<PathBuf>,
    pub output: PathBuf,
    pub start_row: u32,
    pub columns: Vec<String>,
    pub continue_on_fail: bool,
    pub verbose: bool,
}

/// Execute the fill command
pub fn fill(options: FillOptions) -> TemplateResult<()> {
    println!("{}", "📄 Excel By Template - Fill".bold().green());
    println!("   Template: {}", options.template.display());
    println!("   Output:   {}\n", options.output.display());

    let columns = options
        .columns
        .iter()
        .map(|spec| parse_column_spec(spec))
        .collect::<TemplateResult<Vec<_>>>()?;

    let items = match &options.input {
        Some(input) => load_items(input)?,
        None => Vec::new(),
    };

    let job = JobConfig {
        template_file: options.template,
        start_row: options.start_row,
        columns_config: ColumnsConfig::new(columns),
        continue_on_fail: options.continue_on_fail,
        items,
        items_file: None,
        output: Some(options.output.clone()),
    };

    execute_job(&job, &options.output, options.verbose)
}

/// Execute the run command
pub fn run(job_file: PathBuf, output: Option<PathBuf>, verbose: bool) -> TemplateResult<()> {
    println!("{}", "📄 Excel By Template - Run".bold().green());
    println!("   Job: {}", job_file.display());

    let job = JobConfig::from_file(&job_file)?;
    let output = output.or_else(|| job.output.clone()).ok_or_else(|| {
        TemplateError::Configuration(
            "No output path: pass --output or set 'output' in the job file".to_string(),
        )
    })?;
    println!("   Output: {}\n", output.display());

    execute_job(&job, &output, verbose)
}

/// Execute the inspect command
pub fn inspect(file: PathBuf, rows: Option<u32>) -> TemplateResult<()> {
    let workbook = TemplateWorkbook::load(&file)?;

    println!("{}", "🔍 Excel By Template - Inspect".bold().green());
    println!("   File: {}", file.display());
    let names: Vec<&str> = workbook.sheets().iter().map(|s| s.name()).collect();
    println!("   Sheets: {}\n", names.join(", "));

    let Some(sheet) = workbook.first_worksheet() else {
        println!("{}", "   (no worksheet)".yellow());
        return Ok(());
    };

    for (row, col, value) in sheet.cells() {
        if rows.is_some_and(|limit| row > limit) {
            break;
        }
        println!("   {:<8} {}", cell_reference(row, col).bright_blue(), value);
    }
    println!();

    Ok(())
}

/// Execute the describe command
pub fn describe() -> TemplateResult<()> {
    let description = ExcelByTemplate::new().description();
    println!("{}", serde_json::to_string_pretty(&description)?);
    Ok(())
}

/// The `COL=property` pattern, compiled once per process.
fn column_spec_regex() -> TemplateResult<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(COLUMN_SPEC_PATTERN))
        .as_ref()
        .map_err(|e| TemplateError::Configuration(format!("Invalid column pattern: {}", e)))
}

/// Parse a `COL=property` column spec, e.g. `1=name`, `C=amount`.
pub fn parse_column_spec(spec: &str) -> TemplateResult<ColumnMapping> {
    let pattern = column_spec_regex()?;

    let captures = pattern.captures(spec).ok_or_else(|| {
        TemplateError::Configuration(format!(
            "Invalid column '{}': expected COL=property (e.g. 1=name or B=amount)",
            spec
        ))
    })?;

    let column = &captures[1];
    let index = if column.chars().all(|c| c.is_ascii_digit()) {
        column.parse::<u32>().ok()
    } else {
        column_index(column)
    }
    .ok_or_else(|| TemplateError::Configuration(format!("Invalid column '{}'", column)))?;

    Ok(ColumnMapping::new(index, &captures[2]))
}

fn execute_job(job: &JobConfig, output: &Path, verbose: bool) -> TemplateResult<()> {
    if verbose {
        println!("{}", "📖 Loading items...".cyan());
        println!("   {} items", job.items.len());
        for column in &job.columns_config.index_column {
            println!(
                "   {} ← {}",
                cell_reference(job.start_row, column.index).bright_blue(),
                column.property
            );
        }
        println!();
    }

    let ctx = job.to_context()?;
    let temp_dir = output
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let node = ExcelByTemplate::with_temp_dir(temp_dir);

    if verbose {
        println!("{}", "📊 Filling template...".cyan());
    }
    let items = node.execute(&ctx)?;

    let attachment = items
        .first()
        .and_then(|item| item.binary.get(BINARY_PROPERTY))
        .ok_or_else(|| TemplateError::Codec("Node returned no workbook".to_string()))?;
    fs::write(output, &attachment.data)?;

    let failures: Vec<&NodeExecutionData> = items.iter().filter(|i| i.is_error()).collect();
    print_failures(&failures);

    println!("{}", "✅ Template filled!".bold().green());
    println!(
        "   {} items, {} skipped",
        job.items.len(),
        failures.len()
    );
    println!("   Excel file: {}\n", output.display());

    Ok(())
}

fn print_failures(failures: &[&NodeExecutionData]) {
    if failures.is_empty() {
        return;
    }
    eprintln!("{}", "⚠️  Skipped items:".bold().yellow());
    for item in failures {
        eprintln!(
            "   item {}: {}",
            item.paired_item
                .map(|i| i.to_string())
                .unwrap_or_else(|| "?".to_string()),
            item.error.as_deref().unwrap_or_default()
        );
    }
    eprintln!();
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
