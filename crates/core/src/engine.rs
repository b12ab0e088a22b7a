use std::collections::HashSet;

use crate::config::ConsolidateOptions;
use crate::error::ConsolidateError;
use crate::extract::extract;
use crate::model::{Consolidation, FileOutcome, FileReport, InputFile, SheetReader, Table};
use crate::reference::derive_columns;
use crate::reorder::reorder_like_reference;

/// Derive the canonical order from `reference`, then consolidate `payroll`.
///
/// A reference failure aborts before any payroll file is read.
pub fn run<R: SheetReader + ?Sized>(
    reader: &R,
    reference: &InputFile,
    payroll: &[InputFile],
    options: &ConsolidateOptions,
) -> Result<Consolidation, ConsolidateError> {
    let canonical = derive_columns(reader, reference, &options.extract)?;
    Ok(consolidate(reader, payroll, &canonical, options))
}

/// Extract every accepted payroll file, concatenate, and reorder like `canonical`.
///
/// Files are taken in order. The first file with a given base name wins; later
/// ones are skipped unread. A file that could not be loaded or fails
/// extraction is reported and left out; it never aborts the batch.
pub fn consolidate<R: SheetReader + ?Sized>(
    reader: &R,
    files: &[InputFile],
    canonical: &[String],
    options: &ConsolidateOptions,
) -> Consolidation {
    let mut tables: Vec<Table> = Vec::new();
    let mut reports: Vec<FileReport> = Vec::with_capacity(files.len());
    let mut seen_bases: HashSet<&str> = HashSet::new();

    for file in files {
        let outcome = if !options.accepts(&file.name) {
            log::debug!("ignoring '{}': not a .{} file", file.name, options.extension);
            FileOutcome::Ignored
        } else if !seen_bases.insert(file.base_name()) {
            log::info!("skipping '{}': duplicate base name '{}'", file.name, file.base_name());
            FileOutcome::Skipped
        } else if let Some(message) = &file.load_error {
            log::warn!("Error processing {}: {}", file.name, message);
            FileOutcome::Failed { message: message.clone() }
        } else {
            match extract(reader, &file.bytes, &file.name, &options.extract) {
                Ok(table) => {
                    log::debug!("'{}': {} row(s), {} column(s)", file.name, table.height(), table.width());
                    tables.push(table);
                    FileOutcome::Processed
                }
                Err(e) => {
                    log::warn!("Error processing {}: {}", file.name, e);
                    FileOutcome::Failed { message: e.to_string() }
                }
            }
        };
        reports.push(FileReport {
            name: file.name.clone(),
            outcome,
        });
    }

    if tables.is_empty() {
        log::warn!("no payroll files were processed");
        return Consolidation {
            table: Table::default(),
            files: reports,
        };
    }

    let merged = Table::concat(tables);
    let table = reorder_like_reference(merged, canonical, options.missing_columns);
    log::info!(
        "consolidated {} row(s) across {} column(s)",
        table.height(),
        table.width()
    );

    Consolidation { table, files: reports }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MissingColumns;
    use crate::model::{CellValue, RawSheet};

    /// Reads a tiny text grid: rows split on '\n', cells on '|'. The byte
    /// string `!` stands for an unreadable file.
    struct GridReader;

    impl SheetReader for GridReader {
        fn read_first_sheet(&self, bytes: &[u8]) -> Result<RawSheet, ConsolidateError> {
            let text = std::str::from_utf8(bytes).map_err(|e| ConsolidateError::SheetRead(e.to_string()))?;
            if text == "!" {
                return Err(ConsolidateError::SheetRead("corrupt file".into()));
            }
            let rows = text
                .split('\n')
                .map(|line| {
                    if line.is_empty() {
                        Vec::new()
                    } else {
                        line.split('|').map(CellValue::text).collect()
                    }
                })
                .collect();
            Ok(RawSheet::new("Sheet1", rows))
        }
    }

    fn sheet(header: &str, data: &[&str]) -> Vec<u8> {
        let mut text = format!("Title\n\n\n{header}\n\n");
        for row in data {
            text.push('\n');
            text.push_str(row);
        }
        text.into_bytes()
    }

    fn file(name: &str, bytes: Vec<u8>) -> InputFile {
        InputFile::new(name, bytes)
    }

    fn canonical(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn duplicate_base_names_first_wins() {
        let files = vec![
            file("Regular-01152024.xlsx", sheet("Employee ID*|Name", &["012-345678|first"])),
            file("Regular-01152024.xlsx", sheet("Employee ID*|Name", &["012-345678|second"])),
        ];
        let out = consolidate(&GridReader, &files, &[], &ConsolidateOptions::default());

        assert_eq!(out.processed(), vec!["Regular-01152024.xlsx"]);
        assert_eq!(out.skipped(), vec!["Regular-01152024.xlsx"]);
        assert_eq!(out.table.height(), 1);
        assert_eq!(out.table.get(0, "Name"), Some(&CellValue::Text("first".into())));
    }

    #[test]
    fn extension_case_does_not_split_base_names() {
        let files = vec![
            file("Regular-01152024.xlsx", sheet("Name", &["a"])),
            file("Regular-01152024.XLSX", sheet("Name", &["b"])),
        ];
        let out = consolidate(&GridReader, &files, &[], &ConsolidateOptions::default());
        assert_eq!(out.skipped(), vec!["Regular-01152024.XLSX"]);
    }

    #[test]
    fn wrong_extension_is_ignored_silently() {
        let files = vec![
            file("notes.csv", sheet("Name", &["a"])),
            file("Regular-01152024.xlsx", sheet("Name", &["b"])),
        ];
        let out = consolidate(&GridReader, &files, &[], &ConsolidateOptions::default());
        assert_eq!(out.processed(), vec!["Regular-01152024.xlsx"]);
        assert!(out.skipped().is_empty());
        assert_eq!(out.files[0].outcome, FileOutcome::Ignored);
    }

    #[test]
    fn failing_file_is_reported_and_run_continues() {
        let files = vec![
            file("Bad-01152024.xlsx", b"!".to_vec()),
            file("Short-01152024.xlsx", b"only\ntwo".to_vec()),
            file("Regular-01152024.xlsx", sheet("Name", &["ok"])),
        ];
        let out = consolidate(&GridReader, &files, &[], &ConsolidateOptions::default());

        assert_eq!(out.processed(), vec!["Regular-01152024.xlsx"]);
        let failures = out.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].0, "Bad-01152024.xlsx");
        assert!(failures[0].1.contains("corrupt file"));
        assert_eq!(failures[1].0, "Short-01152024.xlsx");
        assert!(failures[1].1.contains("header row 4"));
        assert_eq!(out.table.height(), 1);
    }

    #[test]
    fn unloadable_file_is_reported_and_claims_its_base_name() {
        let files = vec![
            InputFile::unreadable("Regular-01152024.xlsx", "IO error: permission denied"),
            file("Regular-01152024.XLSX", sheet("Name", &["never read"])),
            file("Regular-01312024.xlsx", sheet("Name", &["ok"])),
        ];
        let out = consolidate(&GridReader, &files, &[], &ConsolidateOptions::default());
        assert_eq!(out.failures(), vec![("Regular-01152024.xlsx", "IO error: permission denied")]);
        assert_eq!(out.skipped(), vec!["Regular-01152024.XLSX"]);
        assert_eq!(out.processed(), vec!["Regular-01312024.xlsx"]);
        assert_eq!(out.table.height(), 1);
    }

    #[test]
    fn failed_file_still_claims_its_base_name() {
        let files = vec![
            file("Regular-01152024.xlsx", b"!".to_vec()),
            file("Regular-01152024.XLSX", sheet("Name", &["never read"])),
        ];
        let out = consolidate(&GridReader, &files, &[], &ConsolidateOptions::default());
        assert!(out.is_empty());
        assert_eq!(out.skipped(), vec!["Regular-01152024.XLSX"]);
    }

    #[test]
    fn empty_run_returns_empty_table_with_lists() {
        let files = vec![file("Bad-01152024.xlsx", b"!".to_vec())];
        let out = consolidate(&GridReader, &files, &canonical(&["A"]), &ConsolidateOptions::default());
        assert!(out.is_empty());
        assert!(out.table.is_empty());
        assert_eq!(out.failures().len(), 1);
    }

    #[test]
    fn rows_concatenate_and_columns_union() {
        let files = vec![
            file("Regular-01152024.xlsx", sheet("Employee ID*|Name|Basic", &["012-345678|Ana|100"])),
            file("Regular-01312024.xlsx", sheet("Employee ID*|Name|Overtime", &["012-345679|Ben|5"])),
        ];
        let canonical = canonical(&[
            "Payroll Type", "Payroll Date", "Month", "Cutoff Type", "Employee ID*", "Name", "Basic",
        ]);
        let out = consolidate(&GridReader, &files, &canonical, &ConsolidateOptions::default());

        assert_eq!(out.table.height(), 2);
        assert_eq!(
            out.table.columns(),
            &[
                "Payroll Type", "Payroll Date", "Month", "Cutoff Type",
                "Employee ID*", "Name", "Basic", "Overtime",
            ]
            .map(String::from)[..]
        );
        assert_eq!(out.table.get(0, "Overtime"), Some(&CellValue::Empty));
        assert_eq!(out.table.get(1, "Basic"), Some(&CellValue::Empty));
        assert_eq!(out.table.get(1, "Cutoff Type"), Some(&CellValue::Text("Second Cutoff".into())));
    }

    #[test]
    fn run_aborts_on_reference_failure() {
        let reference = file("REF-01152024.xlsx", b"!".to_vec());
        let payroll = vec![file("Regular-01152024.xlsx", sheet("Name", &["a"]))];
        let err = run(&GridReader, &reference, &payroll, &ConsolidateOptions::default()).unwrap_err();
        assert!(matches!(err, ConsolidateError::Reference { .. }));
    }

    #[test]
    fn run_with_fill_policy() {
        let reference = file("REF-01152024.xlsx", sheet("Employee ID*|Name|Amount", &[]));
        let payroll = vec![file("Regular-01152024.xlsx", sheet("Employee ID*|Name", &["012-345678|Ana"]))];
        let options = ConsolidateOptions {
            missing_columns: MissingColumns::Fill,
            ..ConsolidateOptions::default()
        };
        let out = run(&GridReader, &reference, &payroll, &options).unwrap();
        assert_eq!(out.table.columns().last().map(String::as_str), Some("Amount"));
        assert_eq!(out.table.get(0, "Amount"), Some(&CellValue::Empty));
    }
}
