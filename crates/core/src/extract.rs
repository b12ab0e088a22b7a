//! Row filter & field extractor: turns one payroll sheet into a standardized table.
//!
//! The sheet header sits at a fixed physical row; the rows right below it are
//! spacer rows. Period fields are derived from the file name, which follows
//! `<PayrollType>-<MMDDYYYY>.xlsx`.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::ExtractOptions;
use crate::error::ConsolidateError;
use crate::model::{base_name, CellValue, RawSheet, SheetReader, Table};

pub const PAYROLL_TYPE: &str = "Payroll Type";
pub const PAYROLL_DATE: &str = "Payroll Date";
pub const MONTH: &str = "Month";
pub const CUTOFF_TYPE: &str = "Cutoff Type";

/// Reserved column name; a source column with this name is dropped.
pub const PAYROLL_PERIOD: &str = "Payroll Period";

/// Leading columns of every standardized table, in order.
pub const DERIVED_COLUMNS: [&str; 4] = [PAYROLL_TYPE, PAYROLL_DATE, MONTH, CUTOFF_TYPE];

// ---------------------------------------------------------------------------
// Period fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CutoffType {
    FirstCutoff,
    SecondCutoff,
    Other,
}

impl CutoffType {
    pub fn from_day(day: u32) -> Self {
        match day {
            15 => Self::FirstCutoff,
            30 | 31 => Self::SecondCutoff,
            _ => Self::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FirstCutoff => "First Cutoff",
            Self::SecondCutoff => "Second Cutoff",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for CutoffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Fields encoded in a payroll file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayrollPeriod {
    pub payroll_type: String,
    pub date: Option<NaiveDate>,
}

impl PayrollPeriod {
    /// Split the base name on its first hyphen: type before, `MMDDYYYY` after.
    pub fn from_file_name(file_name: &str) -> Self {
        let base = base_name(file_name);
        match base.split_once('-') {
            Some((payroll_type, fragment)) => Self {
                payroll_type: payroll_type.to_string(),
                date: parse_payroll_date(fragment),
            },
            None => Self {
                payroll_type: base.to_string(),
                date: None,
            },
        }
    }

    pub fn month(&self) -> Option<String> {
        self.date.map(|d| d.format("%B").to_string())
    }

    pub fn cutoff(&self) -> Option<CutoffType> {
        use chrono::Datelike;
        self.date.map(|d| CutoffType::from_day(d.day()))
    }
}

/// Parse exactly eight ASCII digits as `MMDDYYYY`. Anything else is `None`.
pub fn parse_payroll_date(fragment: &str) -> Option<NaiveDate> {
    if fragment.len() != 8 || !fragment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let month: u32 = fragment[0..2].parse().ok()?;
    let day: u32 = fragment[2..4].parse().ok()?;
    let year: i32 = fragment[4..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

// ---------------------------------------------------------------------------
// Header handling
// ---------------------------------------------------------------------------

/// Column names from the header row. Blank cells become `Unnamed: <i>`,
/// repeats become `Name.1`, `Name.2`, ...
pub fn header_names(cells: &[CellValue], width: usize) -> Vec<String> {
    let raw = (0..width).map(|i| {
        let name = cells.get(i).map(CellValue::display_string).unwrap_or_default();
        if name.is_empty() {
            format!("Unnamed: {i}")
        } else {
            name
        }
    });

    let mut used: HashSet<String> = HashSet::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(width);
    for name in raw {
        let mut candidate = name.clone();
        while used.contains(&candidate) {
            let n = counts.entry(name.clone()).or_insert(0);
            *n += 1;
            candidate = format!("{name}.{n}");
        }
        used.insert(candidate.clone());
        names.push(candidate);
    }
    names
}

/// Table of everything below the header row.
pub fn header_table(sheet: RawSheet, header_row: usize) -> Result<Table, ConsolidateError> {
    let rows = sheet.row_count();
    if rows <= header_row {
        return Err(ConsolidateError::MissingHeaderRow { header_row, rows });
    }

    let mut body = sheet.rows;
    let data = body.split_off(header_row + 1);
    let header = body.pop().unwrap_or_default();
    let width = data.iter().map(Vec::len).chain(std::iter::once(header.len())).max().unwrap_or(0);

    Ok(Table::from_rows(header_names(&header, width), data))
}

// ---------------------------------------------------------------------------
// Standardize
// ---------------------------------------------------------------------------

/// Standardize an already-decoded sheet.
pub fn standardize(
    sheet: RawSheet,
    file_name: &str,
    options: &ExtractOptions,
) -> Result<Table, ConsolidateError> {
    let mut table = header_table(sheet, options.header_row)?;

    if table.height() >= options.spacer_rows {
        table.drop_leading_rows(options.spacer_rows);
    }

    if let Some(idx) = table.column_index(&options.id_column) {
        let before = table.height();
        table.retain_rows(|row| options.id_pattern.is_match(&row[idx].display_string()));
        log::debug!(
            "{file_name}: kept {} of {before} row(s) with a valid '{}'",
            table.height(),
            options.id_column
        );
    }

    let period = PayrollPeriod::from_file_name(file_name);
    let height = table.height();
    let payroll_type = CellValue::text(period.payroll_type.clone());
    let date = period.date.map(CellValue::Date).unwrap_or_default();
    let month = period.month().map(CellValue::Text).unwrap_or_default();
    let cutoff = period
        .cutoff()
        .map(|c| CellValue::Text(c.label().to_string()))
        .unwrap_or_default();

    table.set_column(PAYROLL_TYPE, vec![payroll_type; height]);
    table.set_column(PAYROLL_DATE, vec![date; height]);
    table.set_column(MONTH, vec![month; height]);
    table.set_column(CUTOFF_TYPE, vec![cutoff; height]);

    let order: Vec<String> = DERIVED_COLUMNS
        .iter()
        .map(|s| s.to_string())
        .chain(
            table
                .columns()
                .iter()
                .filter(|c| !DERIVED_COLUMNS.contains(&c.as_str()) && c.as_str() != PAYROLL_PERIOD)
                .cloned(),
        )
        .collect();

    Ok(table.select(&order))
}

/// Decode `bytes` with `reader` and standardize the first sheet.
pub fn extract<R: SheetReader + ?Sized>(
    reader: &R,
    bytes: &[u8],
    file_name: &str,
    options: &ExtractOptions,
) -> Result<Table, ConsolidateError> {
    let sheet = reader.read_first_sheet(bytes)?;
    log::debug!("{file_name}: read sheet '{}' ({} rows)", sheet.name, sheet.row_count());
    standardize(sheet, file_name, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    /// Title rows, header at physical row 4, two spacer rows, then `data`.
    fn payroll_sheet(header: &[&str], data: Vec<Vec<CellValue>>) -> RawSheet {
        let mut rows = vec![
            vec![t("ACME Corp Payroll Register")],
            vec![],
            vec![t("Period: January")],
            header.iter().map(|h| t(h)).collect(),
            vec![],
            vec![],
        ];
        rows.extend(data);
        RawSheet::new("Sheet1", rows)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn cutoff_from_day() {
        assert_eq!(CutoffType::from_day(15), CutoffType::FirstCutoff);
        assert_eq!(CutoffType::from_day(30), CutoffType::SecondCutoff);
        assert_eq!(CutoffType::from_day(31), CutoffType::SecondCutoff);
        assert_eq!(CutoffType::from_day(14), CutoffType::Other);
        assert_eq!(CutoffType::from_day(29), CutoffType::Other);
        assert_eq!(CutoffType::from_day(1), CutoffType::Other);
        assert_eq!(CutoffType::SecondCutoff.to_string(), "Second Cutoff");
    }

    #[test]
    fn parse_payroll_date_strict() {
        assert_eq!(parse_payroll_date("01152024"), Some(date(2024, 1, 15)));
        assert_eq!(parse_payroll_date("12312023"), Some(date(2023, 12, 31)));
        assert_eq!(parse_payroll_date("1152024"), None);
        assert_eq!(parse_payroll_date("011520245"), None);
        assert_eq!(parse_payroll_date("02302024"), None);
        assert_eq!(parse_payroll_date("13012024"), None);
        assert_eq!(parse_payroll_date("Jan-2024"), None);
        assert_eq!(parse_payroll_date(""), None);
    }

    #[test]
    fn period_from_file_name() {
        let p = PayrollPeriod::from_file_name("Regular-01152024.xlsx");
        assert_eq!(p.payroll_type, "Regular");
        assert_eq!(p.date, Some(date(2024, 1, 15)));
        assert_eq!(p.month().as_deref(), Some("January"));
        assert_eq!(p.cutoff(), Some(CutoffType::FirstCutoff));
    }

    #[test]
    fn period_splits_on_first_hyphen_only() {
        let p = PayrollPeriod::from_file_name("13th-Month-12152023.xlsx");
        assert_eq!(p.payroll_type, "13th");
        assert_eq!(p.date, None);
        assert_eq!(p.month(), None);
        assert_eq!(p.cutoff(), None);
    }

    #[test]
    fn period_without_hyphen() {
        let p = PayrollPeriod::from_file_name("Adjustments.xlsx");
        assert_eq!(p.payroll_type, "Adjustments");
        assert_eq!(p.date, None);
    }

    #[test]
    fn header_names_fill_blanks_and_mangle_repeats() {
        let cells = vec![t("Code"), CellValue::Empty, t("Code"), t("Code"), CellValue::Number(2024.0)];
        let names = header_names(&cells, 6);
        assert_eq!(names, vec!["Code", "Unnamed: 1", "Code.1", "Code.2", "2024", "Unnamed: 5"]);
    }

    #[test]
    fn header_names_skip_taken_suffix() {
        let cells = vec![t("A"), t("A.1"), t("A")];
        assert_eq!(header_names(&cells, 3), vec!["A", "A.1", "A.2"]);
    }

    #[test]
    fn missing_header_row_is_error() {
        let sheet = RawSheet::new("Sheet1", vec![vec![t("title")], vec![], vec![]]);
        let err = standardize(sheet, "Regular-01152024.xlsx", &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ConsolidateError::MissingHeaderRow { header_row: 3, rows: 3 }));
    }

    #[test]
    fn derived_columns_lead_in_fixed_order() {
        let sheet = payroll_sheet(
            &["Employee ID*", "Name", "Amount"],
            vec![vec![t("012-345678"), t("Ana"), CellValue::Number(1000.0)]],
        );
        let table = standardize(sheet, "Regular-01152024.xlsx", &ExtractOptions::default()).unwrap();

        assert_eq!(
            table.columns(),
            &[
                "Payroll Type", "Payroll Date", "Month", "Cutoff Type",
                "Employee ID*", "Name", "Amount",
            ]
            .map(String::from)[..]
        );
        assert_eq!(table.height(), 1);
        assert_eq!(table.get(0, PAYROLL_TYPE), Some(&t("Regular")));
        assert_eq!(table.get(0, PAYROLL_DATE), Some(&CellValue::Date(date(2024, 1, 15))));
        assert_eq!(table.get(0, MONTH), Some(&t("January")));
        assert_eq!(table.get(0, CUTOFF_TYPE), Some(&t("First Cutoff")));
        assert_eq!(table.get(0, "Amount"), Some(&CellValue::Number(1000.0)));
    }

    #[test]
    fn day_31_is_second_cutoff() {
        let sheet = payroll_sheet(&["Employee ID*"], vec![vec![t("012-345678")]]);
        let table = standardize(sheet, "Regular-01312024.xlsx", &ExtractOptions::default()).unwrap();
        assert_eq!(table.get(0, CUTOFF_TYPE), Some(&t("Second Cutoff")));
    }

    #[test]
    fn invalid_identifiers_are_dropped() {
        let sheet = payroll_sheet(
            &["Employee ID*", "Name"],
            vec![
                vec![t("012-345678"), t("keep")],
                vec![t("12-345678"), t("short")],
                vec![t("012-3456789"), t("long")],
                vec![CellValue::Empty, t("blank")],
                vec![CellValue::Number(12345678.0), t("numeric")],
                vec![t("TOTAL"), t("footer")],
                vec![t("999-000001"), t("keep too")],
            ],
        );
        let table = standardize(sheet, "Regular-01152024.xlsx", &ExtractOptions::default()).unwrap();
        let names: Vec<String> = table.column("Name").unwrap().iter().map(|v| v.display_string()).collect();
        assert_eq!(names, vec!["keep", "keep too"]);
    }

    #[test]
    fn no_id_column_keeps_all_rows_minus_spacers() {
        let sheet = payroll_sheet(
            &["Name", "Amount"],
            vec![vec![t("a"), t("1")], vec![t("b"), t("2")], vec![t("TOTAL"), t("3")]],
        );
        let table = standardize(sheet, "Regular-01152024.xlsx", &ExtractOptions::default()).unwrap();
        assert_eq!(table.height(), 3);
    }

    #[test]
    fn spacer_rows_kept_when_fewer_than_two() {
        let rows = vec![vec![], vec![], vec![], vec![t("Name")], vec![t("only")]];
        let table = standardize(RawSheet::new("S", rows), "X-01152024.xlsx", &ExtractOptions::default()).unwrap();
        assert_eq!(table.height(), 1);
        assert_eq!(table.get(0, "Name"), Some(&t("only")));
    }

    #[test]
    fn spacer_drop_happens_before_id_filter() {
        // Spacer rows are not blank here; they are dropped by position anyway.
        let rows = vec![
            vec![], vec![], vec![],
            vec![t("Employee ID*")],
            vec![t("111-111111")],
            vec![t("222-222222")],
            vec![t("333-333333")],
        ];
        let table = standardize(RawSheet::new("S", rows), "X-01152024.xlsx", &ExtractOptions::default()).unwrap();
        assert_eq!(table.height(), 1);
        assert_eq!(table.get(0, "Employee ID*"), Some(&t("333-333333")));
    }

    #[test]
    fn null_date_leaves_month_and_cutoff_empty() {
        let sheet = payroll_sheet(&["Employee ID*"], vec![vec![t("012-345678")]]);
        let table = standardize(sheet, "Regular-2024JAN15.xlsx", &ExtractOptions::default()).unwrap();
        assert_eq!(table.get(0, PAYROLL_TYPE), Some(&t("Regular")));
        assert_eq!(table.get(0, PAYROLL_DATE), Some(&CellValue::Empty));
        assert_eq!(table.get(0, MONTH), Some(&CellValue::Empty));
        assert_eq!(table.get(0, CUTOFF_TYPE), Some(&CellValue::Empty));
    }

    #[test]
    fn day_neither_15_nor_month_end_is_other() {
        let sheet = payroll_sheet(&["Employee ID*"], vec![vec![t("012-345678")]]);
        let table = standardize(sheet, "Special-02202024.xlsx", &ExtractOptions::default()).unwrap();
        assert_eq!(table.get(0, MONTH), Some(&t("February")));
        assert_eq!(table.get(0, CUTOFF_TYPE), Some(&t("Other")));
    }

    #[test]
    fn source_column_with_derived_name_is_replaced() {
        let sheet = payroll_sheet(&["Month", "Name"], vec![vec![t("stale"), t("Ana")]]);
        let table = standardize(sheet, "Regular-03152024.xlsx", &ExtractOptions::default()).unwrap();
        assert_eq!(table.width(), 5);
        assert_eq!(table.columns()[2], "Month");
        assert_eq!(table.get(0, MONTH), Some(&t("March")));
        assert_eq!(table.columns()[4], "Name");
    }

    #[test]
    fn source_payroll_period_column_is_dropped() {
        let sheet = payroll_sheet(
            &["Employee ID*", "Payroll Period", "Name"],
            vec![vec![t("012-345678"), t("Jan 1-15"), t("Ana")]],
        );
        let table = standardize(sheet, "Regular-01152024.xlsx", &ExtractOptions::default()).unwrap();
        assert!(!table.has_column(PAYROLL_PERIOD));
        assert_eq!(table.width(), 6);
        assert_eq!(table.columns()[5], "Name");
    }

    #[test]
    fn header_only_sheet_yields_empty_standardized_table() {
        let rows = vec![vec![], vec![], vec![], vec![t("Employee ID*"), t("Name")]];
        let table = standardize(RawSheet::new("S", rows), "Regular-01152024.xlsx", &ExtractOptions::default()).unwrap();
        assert_eq!(table.height(), 0);
        assert_eq!(table.width(), 6);
        assert_eq!(&table.columns()[..4], &DERIVED_COLUMNS.map(String::from)[..]);
    }

    #[test]
    fn extract_propagates_reader_error() {
        struct Broken;
        impl SheetReader for Broken {
            fn read_first_sheet(&self, _bytes: &[u8]) -> Result<RawSheet, ConsolidateError> {
                Err(ConsolidateError::SheetRead("not a zip archive".into()))
            }
        }
        let err = extract(&Broken, b"junk", "Regular-01152024.xlsx", &ExtractOptions::default()).unwrap_err();
        assert!(err.to_string().contains("not a zip archive"));
    }
}
