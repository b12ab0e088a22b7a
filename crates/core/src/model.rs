use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::ConsolidateError;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// An untyped spreadsheet value, as read from a payroll sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text value, or `Empty` for an empty string.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }

    /// The value as a spreadsheet user would read it.
    /// Integral numbers print without decimals.
    pub fn display_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Error(e) => e.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw sheet
// ---------------------------------------------------------------------------

/// One worksheet in physical coordinates: `rows[0]` is spreadsheet row 1,
/// `rows[r][0]` is column A, no matter where the used range starts.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { name: name.into(), rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Decodes spreadsheet bytes. Implemented by the xlsx reader in `paycon-io`.
pub trait SheetReader {
    /// Read the first worksheet of `bytes`.
    fn read_first_sheet(&self, bytes: &[u8]) -> Result<RawSheet, ConsolidateError>;
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Named columns over rows of equal width. Column names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Build a table, padding short rows with `Empty` and cutting long ones.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has neither columns nor rows.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&CellValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(row);
    }

    pub fn retain_rows<F>(&mut self, f: F)
    where
        F: FnMut(&Vec<CellValue>) -> bool,
    {
        self.rows.retain(f);
    }

    /// Drop the first `n` rows (all of them if fewer exist).
    pub fn drop_leading_rows(&mut self, n: usize) {
        let n = n.min(self.rows.len());
        self.rows.drain(..n);
    }

    /// Append a column filled with `values` (padded with `Empty`). An existing
    /// column of the same name is overwritten in place.
    pub fn set_column(&mut self, name: &str, values: Vec<CellValue>) {
        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(CellValue::Empty);
                }
                self.columns.len() - 1
            }
        };
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row[idx] = values.next().unwrap_or_default();
        }
    }

    /// Project onto `order`. Names the table lacks become all-empty columns;
    /// columns not named in `order` are dropped.
    pub fn select(mut self, order: &[String]) -> Table {
        let index: Vec<Option<usize>> = order.iter().map(|name| self.column_index(name)).collect();
        let rows = self
            .rows
            .iter_mut()
            .map(|row| {
                index
                    .iter()
                    .map(|idx| match idx {
                        Some(i) => std::mem::take(&mut row[*i]),
                        None => CellValue::Empty,
                    })
                    .collect()
            })
            .collect();
        Table { columns: order.to_vec(), rows }
    }

    /// Row-wise union. Columns appear in order of first appearance; a table
    /// lacking a column contributes `Empty` cells for it.
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for table in &tables {
            for name in &table.columns {
                if !positions.contains_key(name) {
                    positions.insert(name.clone(), columns.len());
                    columns.push(name.clone());
                }
            }
        }

        let width = columns.len();
        let mut rows = Vec::with_capacity(tables.iter().map(Table::height).sum());
        for table in tables {
            let targets: Vec<usize> = table.columns.iter().map(|c| positions[c]).collect();
            for row in table.rows {
                let mut out = vec![CellValue::Empty; width];
                for (value, &target) in row.into_iter().zip(&targets) {
                    out[target] = value;
                }
                rows.push(out);
            }
        }

        Table { columns, rows }
    }
}

// ---------------------------------------------------------------------------
// Run input + output
// ---------------------------------------------------------------------------

/// A spreadsheet loaded fully into memory, with the name it was supplied under.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Why the bytes could not be loaded. Such a file is reported as failed.
    pub load_error: Option<String>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes, load_error: None }
    }

    pub fn unreadable(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), bytes: Vec::new(), load_error: Some(message.into()) }
    }

    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }
}

/// File name without directory components and without its last extension.
pub fn base_name(name: &str) -> &str {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file.rfind('.') {
        Some(dot) => &file[..dot],
        None => file,
    }
}

/// What happened to one payroll input during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Processed,
    /// Another file with the same base name came first.
    Skipped,
    /// Wrong extension; never counted.
    Ignored,
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Result of consolidating a batch of payroll files.
#[derive(Debug, Clone, Default)]
pub struct Consolidation {
    pub table: Table,
    pub files: Vec<FileReport>,
}

impl Consolidation {
    /// No payroll file produced a table.
    pub fn is_empty(&self) -> bool {
        self.processed().is_empty()
    }

    pub fn processed(&self) -> Vec<&str> {
        self.names_with(|o| matches!(o, FileOutcome::Processed))
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.names_with(|o| matches!(o, FileOutcome::Skipped))
    }

    /// (file name, error message) for every file that failed extraction.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.files
            .iter()
            .filter_map(|f| match &f.outcome {
                FileOutcome::Failed { message } => Some((f.name.as_str(), message.as_str())),
                _ => None,
            })
            .collect()
    }

    fn names_with(&self, pred: impl Fn(&FileOutcome) -> bool) -> Vec<&str> {
        self.files
            .iter()
            .filter(|f| pred(&f.outcome))
            .map(|f| f.name.as_str())
            .collect()
    }
}
