use std::fmt;

#[derive(Debug)]
pub enum ConsolidateError {
    /// The bytes could not be decoded as a spreadsheet.
    SheetRead(String),
    /// Workbook decoded but contains no worksheets.
    NoSheets,
    /// Sheet has no physical row at the configured header offset.
    MissingHeaderRow { header_row: usize, rows: usize },
    /// Identifier pattern does not compile.
    InvalidPattern(String),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty extension, bad sheet name, etc.).
    ConfigValidation(String),
    /// The reference file could not be extracted. Fatal to the run.
    Reference { file: String, source: Box<ConsolidateError> },
    /// IO error (file read, etc.).
    Io(String),
    /// Encoding the output document failed.
    Write(String),
}

impl fmt::Display for ConsolidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SheetRead(msg) => write!(f, "cannot read spreadsheet: {msg}"),
            Self::NoSheets => write!(f, "workbook contains no sheets"),
            Self::MissingHeaderRow { header_row, rows } => write!(
                f,
                "header row {} not found (sheet has {rows} row(s))",
                header_row + 1
            ),
            Self::InvalidPattern(msg) => write!(f, "invalid identifier pattern: {msg}"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Reference { file, source } => {
                write!(f, "unable to derive reference columns from '{file}': {source}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Write(msg) => write!(f, "cannot write output: {msg}"),
        }
    }
}

impl std::error::Error for ConsolidateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Reference { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
