// Excel file import (xlsx) and export (xlsx)
//
// Import: first worksheet only, decoded into a physical-coordinate grid.
// Export: the consolidated table as a single sheet, header row first, no index column.

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use paycon_core::{CellValue, ConsolidateError, RawSheet, SheetReader, Table};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};

/// Excel's last row/column (1,048,576 rows x 16,384 columns)
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Excel's phantom 1900-02-29.
const FAKE_LEAP_DAY_SERIAL: f64 = 60.0;

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// [`SheetReader`] over in-memory `.xlsx` bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxReader;

impl SheetReader for XlsxReader {
    fn read_first_sheet(&self, bytes: &[u8]) -> Result<RawSheet, ConsolidateError> {
        read_first_sheet(bytes)
    }
}

/// Decode the first worksheet of an `.xlsx` document.
///
/// Row 0 of the result is spreadsheet row 1 even when the used range starts
/// lower down; leading blank rows and columns are kept as empty cells.
pub fn read_first_sheet(bytes: &[u8]) -> Result<RawSheet, ConsolidateError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e| ConsolidateError::SheetRead(format!("Failed to open Excel file: {}", e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ConsolidateError::NoSheets)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ConsolidateError::SheetRead(format!("Failed to read sheet '{}': {}", sheet_name, e)))?;

    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let (start_row, start_col) = (start_row as usize, start_col as usize);

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row.min(MAX_ROWS)];
    for row in range.rows() {
        if rows.len() >= MAX_ROWS {
            log::warn!("sheet '{}' truncated at {} rows", sheet_name, MAX_ROWS);
            break;
        }
        let mut cells = vec![CellValue::Empty; start_col.min(MAX_COLS)];
        cells.extend(row.iter().take(MAX_COLS.saturating_sub(start_col)).map(convert_cell));
        rows.push(cells);
    }

    log::debug!("read sheet '{}': {} physical row(s)", sheet_name, rows.len());
    Ok(RawSheet::new(sheet_name, rows))
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        // Store error as text representation
        Data::Error(e) => CellValue::Error(format!("#{:?}", e)),
        // Assumes the 1900 date system (most common).
        Data::DateTime(dt) => serial_to_value(dt.as_f64()),
        Data::DateTimeIso(s) => parse_iso(s),
        Data::DurationIso(s) => CellValue::text(s.as_str()),
    }
}

fn excel_epoch() -> NaiveDate {
    // 1899-12-30 is always a valid date.
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Excel serial (1900 system) to a date, or a date-time when it has a time part.
/// Serials chrono cannot represent stay numbers.
pub fn serial_to_value(serial: f64) -> CellValue {
    if !serial.is_finite() || serial < 0.0 {
        return CellValue::Number(serial);
    }

    let whole = serial.floor();
    let mut seconds = ((serial - whole) * SECONDS_PER_DAY).round() as i64;
    let mut days = whole as i64;
    if seconds >= SECONDS_PER_DAY as i64 {
        days += 1;
        seconds = 0;
    }
    // Serials 1..=60 count Excel's nonexistent 1900-02-29.
    if (1.0..FAKE_LEAP_DAY_SERIAL + 1.0).contains(&whole) {
        days += 1;
    }

    let Some(date) = Duration::try_days(days).and_then(|d| excel_epoch().checked_add_signed(d)) else {
        return CellValue::Number(serial);
    };
    if seconds == 0 {
        CellValue::Date(date)
    } else {
        CellValue::DateTime(date.and_time(chrono::NaiveTime::MIN) + Duration::seconds(seconds))
    }
}

/// 1 for dates before 1900-03-01, whose serials skip Excel's phantom leap day.
fn leap_bug_offset(date: NaiveDate) -> i64 {
    match NaiveDate::from_ymd_opt(1900, 3, 1) {
        Some(march1) if date < march1 && date > excel_epoch() => 1,
        _ => 0,
    }
}

pub fn date_to_serial(date: NaiveDate) -> f64 {
    ((date - excel_epoch()).num_days() - leap_bug_offset(date)) as f64
}

pub fn datetime_to_serial(dt: NaiveDateTime) -> f64 {
    let since = dt - excel_epoch().and_time(chrono::NaiveTime::MIN);
    since.num_seconds() as f64 / SECONDS_PER_DAY - leap_bug_offset(dt.date()) as f64
}

fn parse_iso(s: &str) -> CellValue {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return CellValue::DateTime(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return CellValue::Date(d);
    }
    CellValue::text(s)
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Result of an export operation
#[derive(Debug, Default)]
pub struct ExportResult {
    pub rows_exported: usize,
    pub columns_exported: usize,
    /// Non-empty data cells written (header excluded)
    pub cells_exported: usize,
    pub export_duration_ms: u128,
}

/// Encode `table` as a one-sheet `.xlsx` document.
pub fn export_to_buffer(table: &Table, sheet_name: &str) -> Result<(Vec<u8>, ExportResult), ConsolidateError> {
    let start_time = Instant::now();
    let mut workbook = XlsxWorkbook::new();
    let mut result = build_workbook(&mut workbook, table, sheet_name)?;

    let bytes = workbook
        .save_to_buffer()
        .map_err(|e| ConsolidateError::Write(format!("Failed to encode XLSX: {}", e)))?;

    result.export_duration_ms = start_time.elapsed().as_millis();
    Ok((bytes, result))
}

/// Write `table` to `path` as a one-sheet `.xlsx` file.
pub fn export(table: &Table, sheet_name: &str, path: &Path) -> Result<ExportResult, ConsolidateError> {
    let start_time = Instant::now();
    let mut workbook = XlsxWorkbook::new();
    let mut result = build_workbook(&mut workbook, table, sheet_name)?;

    workbook
        .save(path)
        .map_err(|e| ConsolidateError::Write(format!("Failed to save XLSX file: {}", e)))?;

    result.export_duration_ms = start_time.elapsed().as_millis();
    Ok(result)
}

fn build_workbook(
    workbook: &mut XlsxWorkbook,
    table: &Table,
    sheet_name: &str,
) -> Result<ExportResult, ConsolidateError> {
    if table.width() > MAX_COLS || table.height() + 1 > MAX_ROWS {
        return Err(ConsolidateError::Write(format!(
            "table of {}x{} exceeds the xlsx sheet limit",
            table.height() + 1,
            table.width()
        )));
    }

    let worksheet = workbook
        .add_worksheet()
        .set_name(sheet_name)
        .map_err(|e| ConsolidateError::Write(format!("Failed to create sheet '{}': {}", sheet_name, e)))?;

    let cells_exported = write_table(worksheet, table)?;

    Ok(ExportResult {
        rows_exported: table.height(),
        columns_exported: table.width(),
        cells_exported,
        export_duration_ms: 0,
    })
}

/// Header in row 0, data from row 1. Returns the number of data cells written.
fn write_table(worksheet: &mut Worksheet, table: &Table) -> Result<usize, ConsolidateError> {
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);

    for (col, name) in table.columns().iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &header_format)
            .map_err(|e| write_err(0, col, e))?;
    }

    let mut cells_exported = 0;
    for (r, row) in table.rows().iter().enumerate() {
        let row32 = (r + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            let col16 = col as u16;
            let written = match value {
                CellValue::Empty => continue,
                CellValue::Text(s) | CellValue::Error(s) => worksheet.write_string(row32, col16, s),
                CellValue::Number(n) => worksheet.write_number(row32, col16, *n),
                CellValue::Bool(b) => worksheet.write_boolean(row32, col16, *b),
                CellValue::Date(d) => {
                    worksheet.write_number_with_format(row32, col16, date_to_serial(*d), &date_format)
                }
                CellValue::DateTime(dt) => {
                    worksheet.write_number_with_format(row32, col16, datetime_to_serial(*dt), &datetime_format)
                }
            };
            written.map_err(|e| write_err(r + 1, col, e))?;
            cells_exported += 1;
        }
    }

    Ok(cells_exported)
}

fn write_err(row: usize, col: usize, e: rust_xlsxwriter::XlsxError) -> ConsolidateError {
    ConsolidateError::Write(format!("Failed to write cell ({}, {}): {}", row, col, e))
}
