//! In-place patching of a template package
//!
//! A filled workbook is the template's zip container with the rows of the
//! first worksheet's `sheetData` rewritten. Every other part (styles, column
//! widths, merged ranges, drawings, other sheets) is copied entry by entry
//! without recompression. A cell that replaces a template cell keeps the
//! template cell's `s` (style) attribute.
//!
//! When a formula is written or overwritten, the calculation chain is removed
//! together with its content-type override and relationship, and the workbook
//! is flagged `fullCalcOnLoad` so spreadsheet applications rebuild it.

use crate::error::{TemplateError, TemplateResult};
use crate::excel::cell::{cell_reference, parse_cell_reference, CellValue};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::{btree_map, BTreeMap};
use std::fmt::Display;
use std::io::{Cursor, Read, Seek, Write};
use std::iter::Peekable;
use tracing::debug;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

/// Excel rejects string literals longer than this inside a formula.
const MAX_FORMULA_LITERAL: usize = 255;

/// Elements of `workbook.xml` that must come after `calcPr`.
const AFTER_CALC_PR: &[&[u8]] = &[
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

/// Cell writes keyed by zero-based (row, column), in row-major order.
pub(crate) type CellEdits = BTreeMap<(u32, u16), CellValue>;

/// The template's original .xlsx bytes and the zip entry of its first sheet.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TemplatePackage {
    bytes: Vec<u8>,
    first_sheet_part: Option<String>,
    sheet_count: usize,
}

impl TemplatePackage {
    pub(crate) fn new(bytes: Vec<u8>, sheet_count: usize) -> TemplateResult<Self> {
        let mut archive = open_archive(&bytes)?;
        let first_sheet_part = first_worksheet_part(&mut archive)?;
        debug!(part = ?first_sheet_part, "resolved first worksheet part");
        Ok(Self {
            bytes,
            first_sheet_part,
            sheet_count,
        })
    }

    /// Number of sheets the template was loaded with.
    pub(crate) fn sheet_count(&self) -> usize {
        self.sheet_count
    }

    /// Apply `edits` to the first worksheet. Without edits the template bytes
    /// are returned as they were loaded.
    pub(crate) fn patch_first_sheet(&self, edits: &CellEdits) -> TemplateResult<Vec<u8>> {
        if edits.is_empty() {
            return Ok(self.bytes.clone());
        }

        let part = self
            .first_sheet_part
            .as_deref()
            .ok_or_else(|| codec("Template has no worksheet to fill"))?;

        let mut archive = open_archive(&self.bytes)?;
        let sheet_xml = read_part(&mut archive, part)?
            .ok_or_else(|| codec(format!("Worksheet part '{}' is missing", part)))?;
        let (mut sheet_xml, formulas_changed) = patch_sheet_xml(&sheet_xml, edits)?;

        let mut out = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);

        for index in 0..archive.len() {
            let name = archive
                .by_index_raw(index)
                .map_err(zip_error)?
                .name()
                .to_string();

            let replacement = if name == part {
                Some(std::mem::take(&mut sheet_xml))
            } else if formulas_changed {
                match name.as_str() {
                    CALC_CHAIN_PART => continue,
                    CONTENT_TYPES_PART => Some(drop_elements(
                        &read_required(&mut archive, &name)?,
                        b"Override",
                        b"PartName",
                        |value| value == "/xl/calcChain.xml",
                    )?),
                    WORKBOOK_RELS_PART => Some(drop_elements(
                        &read_required(&mut archive, &name)?,
                        b"Relationship",
                        b"Target",
                        |value| value.ends_with("calcChain.xml"),
                    )?),
                    WORKBOOK_PART => {
                        Some(full_calc_on_load(&read_required(&mut archive, &name)?)?)
                    }
                    _ => None,
                }
            } else {
                None
            };

            match replacement {
                Some(xml) => {
                    out.start_file(name, options).map_err(zip_error)?;
                    out.write_all(&xml)?;
                }
                None => {
                    let file = archive.by_index_raw(index).map_err(zip_error)?;
                    out.raw_copy_file(file).map_err(zip_error)?;
                }
            }
        }

        let cursor = out.finish().map_err(zip_error)?;
        debug!(
            part,
            cells = edits.len(),
            formulas_changed,
            "patched template package"
        );
        Ok(cursor.into_inner())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PACKAGE STRUCTURE
// ═══════════════════════════════════════════════════════════════════════════

fn open_archive(bytes: &[u8]) -> TemplateResult<ZipArchive<Cursor<&[u8]>>> {
    ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| codec(format!("Failed to read workbook package: {}", e)))
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> TemplateResult<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(zip_error(e)),
    };
    let mut bytes = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

fn read_required<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> TemplateResult<Vec<u8>> {
    read_part(archive, name)?
        .ok_or_else(|| codec(format!("Package part '{}' is missing", name)))
}

/// Zip entry of the first `<sheet>` in `xl/workbook.xml`, resolved through
/// the workbook relationships.
fn first_worksheet_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> TemplateResult<Option<String>> {
    let workbook = read_required(archive, WORKBOOK_PART)?;
    let Some(rel_id) = first_sheet_relationship(&workbook)? else {
        return Ok(None);
    };

    let rels = read_required(archive, WORKBOOK_RELS_PART)?;
    let target = relationship_target(&rels, &rel_id)?
        .ok_or_else(|| codec(format!("Worksheet relationship '{}' not found", rel_id)))?;
    Ok(Some(resolve_target(&target)))
}

fn first_sheet_relationship(workbook: &[u8]) -> TemplateResult<Option<String>> {
    let mut reader = Reader::from_reader(workbook);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"sheet" => {
                // `r:id`; the unprefixed `sheetId` has a different local name
                return attribute(&e, |key| key.contains(&b':') && local_name(key) == b"id");
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

fn relationship_target(rels: &[u8], rel_id: &str) -> TemplateResult<Option<String>> {
    let mut reader = Reader::from_reader(rels);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e)
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                if attribute(&e, |key| key == b"Id")?.as_deref() == Some(rel_id) {
                    return attribute(&e, |key| key == b"Target");
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Relationship targets are relative to `xl/` unless they start with `/`.
fn resolve_target(target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    };
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    segments.join("/")
}

/// Copy `xml` without the `element`s whose `key` attribute matches.
fn drop_elements(
    xml: &[u8],
    element: &[u8],
    key: &[u8],
    matches: impl Fn(&str) -> bool,
) -> TemplateResult<Vec<u8>> {
    let dropped = |e: &BytesStart<'_>| -> TemplateResult<bool> {
        if local_name(e.name().as_ref()) != element {
            return Ok(false);
        }
        Ok(attribute(e, |k| k == key)?.is_some_and(|value| matches(value.as_str())))
    };

    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::new();
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(xml_error)?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
            continue;
        }
        match event {
            Event::Eof => break,
            Event::Start(e) => {
                if dropped(&e)? {
                    skip_depth = 1;
                } else {
                    writer.write_event(Event::Start(e)).map_err(xml_error)?;
                }
            }
            Event::Empty(e) => {
                if !dropped(&e)? {
                    writer.write_event(Event::Empty(e)).map_err(xml_error)?;
                }
            }
            event => writer.write_event(event).map_err(xml_error)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

/// Set `fullCalcOnLoad="1"` on `calcPr`, adding the element when absent.
fn full_calc_on_load(workbook: &[u8]) -> TemplateResult<Vec<u8>> {
    let mut reader = Reader::from_reader(workbook);
    let mut writer = Writer::new(Vec::with_capacity(workbook.len() + 32));
    let mut buf = Vec::new();
    let mut saw_calc_pr = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Eof => break,
            Event::Start(e) if local_name(e.name().as_ref()) == b"calcPr" => {
                saw_calc_pr = true;
                let e = set_attribute(&e, b"fullCalcOnLoad", Some("1"))?;
                writer.write_event(Event::Start(e)).map_err(xml_error)?;
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"calcPr" => {
                saw_calc_pr = true;
                let e = set_attribute(&e, b"fullCalcOnLoad", Some("1"))?;
                writer.write_event(Event::Empty(e)).map_err(xml_error)?;
            }
            Event::Start(e) if !saw_calc_pr && follows_calc_pr(e.name().as_ref()) => {
                saw_calc_pr = true;
                writer.get_mut().extend_from_slice(br#"<calcPr fullCalcOnLoad="1"/>"#);
                writer.write_event(Event::Start(e)).map_err(xml_error)?;
            }
            Event::Empty(e) if !saw_calc_pr && follows_calc_pr(e.name().as_ref()) => {
                saw_calc_pr = true;
                writer.get_mut().extend_from_slice(br#"<calcPr fullCalcOnLoad="1"/>"#);
                writer.write_event(Event::Empty(e)).map_err(xml_error)?;
            }
            Event::End(e) if !saw_calc_pr && local_name(e.name().as_ref()) == b"workbook" => {
                saw_calc_pr = true;
                writer.get_mut().extend_from_slice(br#"<calcPr fullCalcOnLoad="1"/>"#);
                writer.write_event(Event::End(e)).map_err(xml_error)?;
            }
            event => writer.write_event(event).map_err(xml_error)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

fn follows_calc_pr(name: &[u8]) -> bool {
    let name = local_name(name);
    AFTER_CALC_PR.iter().any(|follower| *follower == name)
}

// ═══════════════════════════════════════════════════════════════════════════
// WORKSHEET ROWS
// ═══════════════════════════════════════════════════════════════════════════

type PendingRows<'a> = Peekable<btree_map::IntoIter<u32, Vec<(u32, &'a CellValue)>>>;

/// Rewrite the rows of `sheetData` that have edits. Returns the new part and
/// whether any formula was written or replaced.
fn patch_sheet_xml(xml: &[u8], edits: &CellEdits) -> TemplateResult<(Vec<u8>, bool)> {
    let mut rows: BTreeMap<u32, Vec<(u32, &CellValue)>> = BTreeMap::new();
    for (&(row, col), value) in edits {
        rows.entry(row + 1)
            .or_default()
            .push((u32::from(col) + 1, value));
    }

    let mut patcher = SheetPatcher {
        writer: Writer::new(Vec::with_capacity(xml.len() + edits.len() * 32)),
        rows: rows.into_iter().peekable(),
        formulas_changed: false,
    };
    patcher.run(xml, edit_bounds(edits))?;
    Ok((patcher.writer.into_inner(), patcher.formulas_changed))
}

struct SheetPatcher<'a> {
    writer: Writer<Vec<u8>>,
    rows: PendingRows<'a>,
    formulas_changed: bool,
}

/// A template row being copied, with the edits that land in it.
struct OpenRow<'a> {
    number: u32,
    cells: std::vec::IntoIter<(u32, &'a CellValue)>,
    last_column: u32,
}

impl<'a> SheetPatcher<'a> {
    fn run(&mut self, xml: &[u8], bounds: Option<Bounds>) -> TemplateResult<()> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();
        let mut saw_sheet_data = false;
        let mut last_row = 0u32;
        let mut open: Option<OpenRow<'a>> = None;

        loop {
            let event = reader.read_event_into(&mut buf).map_err(xml_error)?;
            match event {
                Event::Eof => break,

                Event::Empty(e) if local_name(e.name().as_ref()) == b"dimension" => {
                    let e = widen_dimension(&e, bounds)?;
                    self.write(Event::Empty(e))?;
                }
                Event::Start(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                    saw_sheet_data = true;
                    self.write(Event::Start(e))?;
                }
                Event::Empty(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                    saw_sheet_data = true;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    self.write(Event::Start(e))?;
                    self.flush_rows_before(u32::MAX)?;
                    self.write_raw(format!("</{}>", name).as_bytes());
                }
                Event::End(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                    self.flush_rows_before(u32::MAX)?;
                    self.write(Event::End(e))?;
                }

                Event::Start(e) if local_name(e.name().as_ref()) == b"row" => {
                    let number = row_number(&e)?.unwrap_or(last_row + 1);
                    last_row = number;
                    self.flush_rows_before(number)?;
                    let cells = self.take_row(number);
                    if cells.is_empty() {
                        self.write(Event::Start(e))?;
                    } else {
                        self.write(Event::Start(set_attribute(&e, b"spans", None)?))?;
                    }
                    open = Some(OpenRow {
                        number,
                        cells: cells.into_iter(),
                        last_column: 0,
                    });
                }
                Event::Empty(e) if local_name(e.name().as_ref()) == b"row" => {
                    let number = row_number(&e)?.unwrap_or(last_row + 1);
                    last_row = number;
                    self.flush_rows_before(number)?;
                    let cells = self.take_row(number);
                    if cells.is_empty() {
                        self.write(Event::Empty(e))?;
                    } else {
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        self.write(Event::Start(set_attribute(&e, b"spans", None)?))?;
                        for (column, value) in cells {
                            self.write_cell(number, column, value, None);
                        }
                        self.write_raw(format!("</{}>", name).as_bytes());
                    }
                }
                Event::End(e) if local_name(e.name().as_ref()) == b"row" => {
                    if let Some(row) = open.take() {
                        for (column, value) in row.cells {
                            self.write_cell(row.number, column, value, None);
                        }
                    }
                    self.write(Event::End(e))?;
                }

                Event::Start(e) if local_name(e.name().as_ref()) == b"c" && open.is_some() => {
                    if let Some(row) = open.as_mut() {
                        match self.enter_cell(row, &e)? {
                            Some((column, value)) => {
                                let style = attribute(&e, |key| key == b"s")?;
                                if skip_cell(&mut reader)? {
                                    self.formulas_changed = true;
                                }
                                self.write_cell(row.number, column, value, style.as_deref());
                            }
                            None => self.write(Event::Start(e))?,
                        }
                    }
                }
                Event::Empty(e) if local_name(e.name().as_ref()) == b"c" && open.is_some() => {
                    if let Some(row) = open.as_mut() {
                        match self.enter_cell(row, &e)? {
                            Some((column, value)) => {
                                let style = attribute(&e, |key| key == b"s")?;
                                self.write_cell(row.number, column, value, style.as_deref());
                            }
                            None => self.write(Event::Empty(e))?,
                        }
                    }
                }

                event => self.write(event)?,
            }
            buf.clear();
        }

        if !saw_sheet_data {
            return Err(codec("Worksheet has no sheetData element"));
        }
        Ok(())
    }

    /// Write edits that sort before the template cell `cell`. Returns the
    /// edit for the cell itself, if any.
    fn enter_cell(
        &mut self,
        row: &mut OpenRow<'a>,
        cell: &BytesStart<'_>,
    ) -> TemplateResult<Option<(u32, &'a CellValue)>> {
        let column = attribute(cell, |key| key == b"r")?
            .and_then(|reference| parse_cell_reference(&reference))
            .map(|(_, column)| column)
            .unwrap_or(row.last_column + 1);
        row.last_column = column;

        while let Some(&(next, value)) = row.cells.as_slice().first() {
            if next > column {
                break;
            }
            row.cells.next();
            if next == column {
                return Ok(Some((next, value)));
            }
            self.write_cell(row.number, next, value, None);
        }
        Ok(None)
    }

    fn take_row(&mut self, number: u32) -> Vec<(u32, &'a CellValue)> {
        match self.rows.peek() {
            Some(&(next, _)) if next == number => {
                self.rows.next().map(|(_, cells)| cells).unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }

    /// Write edited rows numbered below `number` that the template lacks.
    fn flush_rows_before(&mut self, number: u32) -> TemplateResult<()> {
        while let Some(&(next, _)) = self.rows.peek() {
            if next >= number {
                break;
            }
            let Some((row, cells)) = self.rows.next() else {
                break;
            };
            let markup: Vec<String> = cells
                .into_iter()
                .filter_map(|(column, value)| self.cell_markup(row, column, value, None))
                .collect();
            if markup.is_empty() {
                continue;
            }
            self.write_raw(format!(r#"<row r="{}">"#, row).as_bytes());
            for cell in markup {
                self.write_raw(cell.as_bytes());
            }
            self.write_raw(b"</row>");
        }
        Ok(())
    }

    fn write_cell(&mut self, row: u32, column: u32, value: &CellValue, style: Option<&str>) {
        if let Some(markup) = self.cell_markup(row, column, value, style) {
            self.write_raw(markup.as_bytes());
        }
    }

    fn cell_markup(
        &mut self,
        row: u32,
        column: u32,
        value: &CellValue,
        style: Option<&str>,
    ) -> Option<String> {
        if matches!(value, CellValue::Formula { .. } | CellValue::Hyperlink { .. }) {
            self.formulas_changed = true;
        }
        cell_markup(&cell_reference(row, column), value, style)
    }

    fn write(&mut self, event: Event<'_>) -> TemplateResult<()> {
        self.writer.write_event(event).map_err(xml_error)
    }

    fn write_raw(&mut self, bytes: &[u8]) {
        self.writer.get_mut().extend_from_slice(bytes);
    }
}

/// Consume a replaced cell up to its end tag. Returns whether it held a
/// formula.
fn skip_cell(reader: &mut Reader<&[u8]>) -> TemplateResult<bool> {
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut had_formula = false;
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => {
                had_formula |= local_name(e.name().as_ref()) == b"f";
                depth += 1;
            }
            Event::Empty(e) => had_formula |= local_name(e.name().as_ref()) == b"f",
            Event::End(_) if depth == 0 => return Ok(had_formula),
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(codec("Worksheet ends inside a cell")),
            _ => {}
        }
        buf.clear();
    }
}

fn row_number(row: &BytesStart<'_>) -> TemplateResult<Option<u32>> {
    Ok(attribute(row, |key| key == b"r")?.and_then(|r| r.trim().parse().ok()))
}

// ═══════════════════════════════════════════════════════════════════════════
// CELL MARKUP
// ═══════════════════════════════════════════════════════════════════════════

/// `<c>` element for `value`. An `Empty` value keeps a styled cell and drops
/// an unstyled one.
fn cell_markup(reference: &str, value: &CellValue, style: Option<&str>) -> Option<String> {
    let style = style
        .map(|s| format!(r#" s="{}""#, escape_attr(s)))
        .unwrap_or_default();

    let markup = match value {
        CellValue::Empty if style.is_empty() => return None,
        CellValue::Empty => format!(r#"<c r="{reference}"{style}/>"#),
        CellValue::Number(n) | CellValue::DateTime(n) => {
            format!(r#"<c r="{reference}"{style}><v>{n}</v></c>"#)
        }
        CellValue::String(text) => inline_string(reference, &style, text),
        CellValue::Boolean(b) => {
            format!(r#"<c r="{reference}"{style} t="b"><v>{}</v></c>"#, u8::from(*b))
        }
        CellValue::Error(error) => {
            format!(r#"<c r="{reference}"{style} t="e"><v>{}</v></c>"#, escape_text(error))
        }
        CellValue::Formula { formula, result } => {
            formula_cell(reference, &style, formula, result.as_deref())
        }
        CellValue::Hyperlink { text, url } => {
            let too_long = |s: &str| s.chars().count() > MAX_FORMULA_LITERAL;
            if too_long(url) || too_long(text) {
                inline_string(reference, &style, url)
            } else {
                let formula = format!(
                    "HYPERLINK(\"{}\",\"{}\")",
                    url.replace('"', "\"\""),
                    text.replace('"', "\"\"")
                );
                formula_cell(reference, &style, &formula, Some(text))
            }
        }
    };
    Some(markup)
}

fn inline_string(reference: &str, style: &str, text: &str) -> String {
    let padded = text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace);
    let preserve = if padded {
        r#" xml:space="preserve""#
    } else {
        ""
    };
    format!(
        r#"<c r="{reference}"{style} t="inlineStr"><is><t{preserve}>{}</t></is></c>"#,
        escape_text(text)
    )
}

fn formula_cell(reference: &str, style: &str, formula: &str, result: Option<&str>) -> String {
    let formula = escape_text(formula);
    match result {
        None => format!(r#"<c r="{reference}"{style}><f>{formula}</f></c>"#),
        Some(result) if result.parse::<f64>().is_ok() => {
            format!(r#"<c r="{reference}"{style}><f>{formula}</f><v>{result}</v></c>"#)
        }
        Some(result) => format!(
            r#"<c r="{reference}"{style} t="str"><f>{formula}</f><v>{}</v></c>"#,
            escape_text(result)
        ),
    }
}

/// XML text escaping. Control characters XML cannot carry use Excel's
/// `_xHHHH_` form.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c < ' ' => out.push_str(&format!("_x{:04X}_", u32::from(c))),
            c => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

// ═══════════════════════════════════════════════════════════════════════════
// DIMENSION
// ═══════════════════════════════════════════════════════════════════════════

/// 1-based (first row, first column, last row, last column).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds(u32, u32, u32, u32);

impl Bounds {
    fn union(self, other: Bounds) -> Bounds {
        Bounds(
            self.0.min(other.0),
            self.1.min(other.1),
            self.2.max(other.2),
            self.3.max(other.3),
        )
    }

    fn parse(range: &str) -> Option<Bounds> {
        let (first, last) = range.split_once(':').unwrap_or((range, range));
        let (r1, c1) = parse_cell_reference(first)?;
        let (r2, c2) = parse_cell_reference(last)?;
        Some(Bounds(r1.min(r2), c1.min(c2), r1.max(r2), c1.max(c2)))
    }

    fn to_range(self) -> String {
        let first = cell_reference(self.0, self.1);
        let last = cell_reference(self.2, self.3);
        if first == last {
            first
        } else {
            format!("{}:{}", first, last)
        }
    }
}

fn edit_bounds(edits: &CellEdits) -> Option<Bounds> {
    edits
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(&(row, col), _)| {
            let (row, col) = (row + 1, u32::from(col) + 1);
            Bounds(row, col, row, col)
        })
        .reduce(Bounds::union)
}

fn widen_dimension(
    dimension: &BytesStart<'_>,
    bounds: Option<Bounds>,
) -> TemplateResult<BytesStart<'static>> {
    let current = attribute(dimension, |key| key == b"ref")?;
    let widened = match (current.as_deref().and_then(Bounds::parse), bounds) {
        (Some(current), Some(bounds)) => Some(current.union(bounds)),
        (None, bounds) => bounds,
        (current, None) => current,
    };
    let range = widened.map(Bounds::to_range);
    match range {
        Some(range) => set_attribute(dimension, b"ref", Some(&range)),
        None => Ok(dimension.clone().into_owned()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// XML HELPERS
// ═══════════════════════════════════════════════════════════════════════════

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

fn attribute(
    element: &BytesStart<'_>,
    matches: impl Fn(&[u8]) -> bool,
) -> TemplateResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(xml_error)?;
        if matches(attr.key.as_ref()) {
            return Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned()));
        }
    }
    Ok(None)
}

/// Copy of `element` with `key` replaced, appended, or (for `None`) removed.
fn set_attribute(
    element: &BytesStart<'_>,
    key: &[u8],
    value: Option<&str>,
) -> TemplateResult<BytesStart<'static>> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    let mut replaced = false;
    for attr in element.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.as_ref() != key {
            out.push_attribute(attr);
            continue;
        }
        if let Some(value) = value {
            out.push_attribute((key, value.as_bytes()));
            replaced = true;
        }
    }
    if let (Some(value), false) = (value, replaced) {
        out.push_attribute((key, value.as_bytes()));
    }
    Ok(out)
}

fn codec(message: impl Into<String>) -> TemplateError {
    TemplateError::Codec(message.into())
}

fn xml_error(e: impl Display) -> TemplateError {
    codec(format!("Malformed workbook XML: {}", e))
}

fn zip_error(e: ZipError) -> TemplateError {
    codec(format!("Workbook package error: {}", e))
}
