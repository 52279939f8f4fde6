// Unit tests for CLI command handlers

use super::*;
use crate::excel::CellValue;
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

fn write_template(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("template.xlsx");
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "Name").unwrap();
    worksheet.write_string(0, 1, "Amount").unwrap();
    workbook.save(&path).unwrap();
    path
}

// ═══════════════════════════════════════════════════════════════════════════
// COLUMN SPEC PARSING
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_column_spec_regex_is_compiled_once() {
    let first = column_spec_regex().unwrap();
    let second = column_spec_regex().unwrap();
    assert!(std::ptr::eq(first, second));
}

#[test]
fn test_parse_column_spec_number() {
    assert_eq!(
        parse_column_spec("1=name").unwrap(),
        ColumnMapping::new(1, "name")
    );
}

#[test]
fn test_parse_column_spec_letters() {
    assert_eq!(
        parse_column_spec("C=amount").unwrap(),
        ColumnMapping::new(3, "amount")
    );
    assert_eq!(
        parse_column_spec("aa:total").unwrap(),
        ColumnMapping::new(27, "total")
    );
}

#[test]
fn test_parse_column_spec_trims_whitespace() {
    assert_eq!(
        parse_column_spec("  2 = unit price ").unwrap(),
        ColumnMapping::new(2, "unit price")
    );
}

#[test]
fn test_parse_column_spec_invalid() {
    assert!(parse_column_spec("name").is_err());
    assert!(parse_column_spec("1=").is_err());
    assert!(parse_column_spec("A1=name").is_err());
    assert!(parse_column_spec("99999999999=name").is_err());
}

// ═══════════════════════════════════════════════════════════════════════════
// FILL / RUN
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_fill_writes_output() {
    let dir = TempDir::new().unwrap();
    let template = write_template(&dir);
    let input = dir.path().join("items.json");
    fs::write(
        &input,
        r#"[{"name": "Alice", "amount": 10}, {"name": "Bob", "amount": 20.5}]"#,
    )
    .unwrap();
    let output = dir.path().join("out.xlsx");

    fill(FillOptions {
        template,
        input: Some(input),
        output: output.clone(),
        start_row: 2,
        columns: vec!["A=name".to_string(), "2=amount".to_string()],
        continue_on_fail: false,
        verbose: true,
    })
    .unwrap();

    let workbook = TemplateWorkbook::load(&output).unwrap();
    let sheet = workbook.first_worksheet().unwrap();
    assert_eq!(sheet.cell(1, 1).and_then(CellValue::as_str), Some("Name"));
    assert_eq!(sheet.cell(2, 1).and_then(CellValue::as_str), Some("Alice"));
    assert_eq!(sheet.cell(3, 2), Some(&CellValue::Number(20.5)));
}

#[test]
fn test_fill_without_columns_fails() {
    let dir = TempDir::new().unwrap();
    let template = write_template(&dir);
    let output = dir.path().join("out.xlsx");

    let result = fill(FillOptions {
        template,
        input: None,
        output: output.clone(),
        start_row: 1,
        columns: vec![],
        continue_on_fail: false,
        verbose: false,
    });

    assert!(matches!(result, Err(TemplateError::Configuration(_))));
    assert!(!output.exists());
}

#[test]
fn test_run_job_file() {
    let dir = TempDir::new().unwrap();
    write_template(&dir);
    let job = dir.path().join("job.yaml");
    fs::write(
        &job,
        "templateFile: template.xlsx\n\
         startRow: 2\n\
         columnsConfig:\n  indexColumn:\n    - { index: 1, property: name }\n\
         items:\n  - { name: Carol }\n\
         output: filled.xlsx\n",
    )
    .unwrap();

    run(job, None, false).unwrap();

    let workbook = TemplateWorkbook::load(dir.path().join("filled.xlsx")).unwrap();
    assert_eq!(
        workbook
            .first_worksheet()
            .unwrap()
            .cell(2, 1)
            .and_then(CellValue::as_str),
        Some("Carol")
    );
}

#[test]
fn test_run_without_output_fails() {
    let dir = TempDir::new().unwrap();
    write_template(&dir);
    let job = dir.path().join("job.yaml");
    fs::write(
        &job,
        "templateFile: template.xlsx\ncolumnsConfig:\n  indexColumn:\n    - { index: 1, property: name }\n",
    )
    .unwrap();

    let err = run(job, None, false).unwrap_err();
    assert!(err.to_string().contains("No output path"));
}

#[test]
fn test_inspect_and_describe() {
    let dir = TempDir::new().unwrap();
    let template = write_template(&dir);
    assert!(inspect(template, Some(1)).is_ok());
    assert!(describe().is_ok());
}

#[test]
fn test_no_temp_files_left_next_to_output() {
    let dir = TempDir::new().unwrap();
    let template = write_template(&dir);
    let output = dir.path().join("out.xlsx");

    fill(FillOptions {
        template,
        input: None,
        output,
        start_row: 1,
        columns: vec!["1=name".to_string()],
        continue_on_fail: false,
        verbose: false,
    })
    .unwrap();

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("temp_"))
        .collect();
    assert!(leftovers.is_empty());
}
