//! Canonical column order, taken from the standardized reference file.

use crate::config::ExtractOptions;
use crate::error::ConsolidateError;
use crate::extract::extract;
use crate::model::{InputFile, SheetReader};

/// Column names of the reference file after standardization, in order.
pub type CanonicalColumns = Vec<String>;

/// Any failure is wrapped in [`ConsolidateError::Reference`]; callers treat it as fatal.
pub fn derive_columns<R: SheetReader + ?Sized>(
    reader: &R,
    reference: &InputFile,
    options: &ExtractOptions,
) -> Result<CanonicalColumns, ConsolidateError> {
    let wrap = |e: ConsolidateError| ConsolidateError::Reference {
        file: reference.name.clone(),
        source: Box::new(e),
    };
    if let Some(message) = &reference.load_error {
        return Err(wrap(ConsolidateError::Io(message.clone())));
    }
    let table = extract(reader, &reference.bytes, &reference.name, options).map_err(wrap)?;

    let columns = table.columns().to_vec();
    log::info!("reference '{}': {} canonical column(s)", reference.name, columns.len());
    Ok(columns)
}
