//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts rely on them; do not renumber.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success (also an empty run: nothing processed, no output) |
//! | 1    | General error (unspecified)                               |
//! | 2    | Usage error (bad args, missing reference/payroll/confirm) |
//! | 3    | Reference file could not be parsed                        |
//! | 4    | Run config invalid                                        |
//! | 5    | I/O failure reading inputs or writing the output          |

use paycon_core::ConsolidateError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, or the run is not ready (gating).
pub const EXIT_USAGE: u8 = 2;

/// The reference file could not be standardized; nothing was consolidated.
pub const EXIT_REFERENCE: u8 = 3;

/// Run config failed to parse or validate.
pub const EXIT_CONFIG: u8 = 4;

/// Reading an input file or writing the output document failed.
pub const EXIT_IO: u8 = 5;

/// Map an engine error to its exit code.
pub fn core_exit_code(err: &ConsolidateError) -> u8 {
    match err {
        ConsolidateError::Reference { .. } => EXIT_REFERENCE,
        ConsolidateError::ConfigParse(_)
        | ConsolidateError::ConfigValidation(_)
        | ConsolidateError::InvalidPattern(_) => EXIT_CONFIG,
        ConsolidateError::Io(_) | ConsolidateError::Write(_) => EXIT_IO,
        ConsolidateError::SheetRead(_)
        | ConsolidateError::NoSheets
        | ConsolidateError::MissingHeaderRow { .. } => EXIT_ERROR,
    }
}
