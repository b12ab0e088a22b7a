//! `paycon-io` - spreadsheet I/O for the payroll consolidator.
//!
//! Decodes `.xlsx` uploads into [`paycon_core::RawSheet`] grids and writes the
//! consolidated table back out as a single-sheet workbook.

pub mod xlsx;

pub use xlsx::{export, export_to_buffer, read_first_sheet, ExportResult, XlsxReader};
