//! `paycon-core` - payroll consolidation engine.
//!
//! Pure engine crate: receives spreadsheet bytes through a [`SheetReader`],
//! returns standardized and consolidated tables. No file system access.

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod model;
pub mod reference;
pub mod reorder;

pub use config::{ConsolidateOptions, ExtractOptions, MissingColumns, RunConfig};
pub use engine::{consolidate, run};
pub use error::ConsolidateError;
pub use extract::{extract, standardize, CutoffType, PayrollPeriod, DERIVED_COLUMNS};
pub use model::{CellValue, Consolidation, FileOutcome, FileReport, InputFile, RawSheet, SheetReader, Table};
pub use reference::{derive_columns, CanonicalColumns};
pub use reorder::{reconcile_columns, reorder_like_reference};
