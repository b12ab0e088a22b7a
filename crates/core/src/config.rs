use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::error::ConsolidateError;

pub const DEFAULT_HEADER_ROW: usize = 3;
pub const DEFAULT_SPACER_ROWS: usize = 2;
pub const DEFAULT_ID_COLUMN: &str = "Employee ID*";
pub const DEFAULT_ID_PATTERN: &str = r"^\d{3}-\d{6}$";
pub const DEFAULT_EXTENSION: &str = "xlsx";
pub const DEFAULT_SHEET_NAME: &str = "Consolidated";
pub const DEFAULT_OUTPUT_FILE: &str = "Payroll_Consolidation.xlsx";

/// Excel rejects sheet names longer than this.
const MAX_SHEET_NAME_LEN: usize = 31;

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Layout of a payroll sheet and the identifier check applied to its rows.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Zero-based physical row holding the column headers.
    pub header_row: usize,
    /// Blank rows dropped right below the header (only if that many exist).
    pub spacer_rows: usize,
    /// Column whose values must match `id_pattern`. Absent column = no filter.
    pub id_column: String,
    pub id_pattern: Regex,
}

impl ExtractOptions {
    pub fn new(
        header_row: usize,
        spacer_rows: usize,
        id_column: impl Into<String>,
        id_pattern: &str,
    ) -> Result<Self, ConsolidateError> {
        let id_pattern =
            Regex::new(id_pattern).map_err(|e| ConsolidateError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            header_row,
            spacer_rows,
            id_column: id_column.into(),
            id_pattern,
        })
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            header_row: DEFAULT_HEADER_ROW,
            spacer_rows: DEFAULT_SPACER_ROWS,
            id_column: DEFAULT_ID_COLUMN.to_string(),
            // Constant pattern, covered by tests.
            id_pattern: Regex::new(DEFAULT_ID_PATTERN).unwrap(),
        }
    }
}

// ---------------------------------------------------------------------------
// Consolidation
// ---------------------------------------------------------------------------

/// What to do with canonical columns no payroll file supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingColumns {
    /// Leave them out of the output.
    #[default]
    Omit,
    /// Emit them as all-empty columns at their canonical position.
    Fill,
}

#[derive(Debug, Clone)]
pub struct ConsolidateOptions {
    pub extract: ExtractOptions,
    /// Payroll file extension, without the dot. Compared case-insensitively.
    pub extension: String,
    pub missing_columns: MissingColumns,
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self {
            extract: ExtractOptions::default(),
            extension: DEFAULT_EXTENSION.to_string(),
            missing_columns: MissingColumns::Omit,
        }
    }
}

impl ConsolidateOptions {
    /// Whether `name` carries the payroll extension.
    pub fn accepts(&self, name: &str) -> bool {
        let suffix = format!(".{}", self.extension.to_lowercase());
        name.to_lowercase().ends_with(&suffix)
    }
}

// ---------------------------------------------------------------------------
// Run config (TOML)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub reference: Option<PathBuf>,
    /// Paths or glob patterns.
    #[serde(default)]
    pub payroll: Vec<String>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub output_options: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    #[serde(default = "default_header_row")]
    pub header_row: usize,
    #[serde(default = "default_spacer_rows")]
    pub spacer_rows: usize,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(default = "default_id_pattern")]
    pub id_pattern: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            header_row: DEFAULT_HEADER_ROW,
            spacer_rows: DEFAULT_SPACER_ROWS,
            id_column: default_id_column(),
            id_pattern: default_id_pattern(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    #[serde(default)]
    pub missing_columns: MissingColumns,
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sheet_name: default_sheet_name(),
            missing_columns: MissingColumns::Omit,
            extension: default_extension(),
        }
    }
}

fn default_header_row() -> usize {
    DEFAULT_HEADER_ROW
}

fn default_spacer_rows() -> usize {
    DEFAULT_SPACER_ROWS
}

fn default_id_column() -> String {
    DEFAULT_ID_COLUMN.into()
}

fn default_id_pattern() -> String {
    DEFAULT_ID_PATTERN.into()
}

fn default_sheet_name() -> String {
    DEFAULT_SHEET_NAME.into()
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.into()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConsolidateError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| ConsolidateError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConsolidateError> {
        let ext = self.output_options.extension.trim_start_matches('.');
        if ext.is_empty() {
            return Err(ConsolidateError::ConfigValidation(
                "output_options.extension must not be empty".into(),
            ));
        }

        let sheet = &self.output_options.sheet_name;
        if sheet.is_empty() || sheet.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(ConsolidateError::ConfigValidation(format!(
                "output_options.sheet_name must be 1-{MAX_SHEET_NAME_LEN} characters, got {:?}",
                sheet
            )));
        }

        Regex::new(&self.layout.id_pattern).map_err(|e| {
            ConsolidateError::ConfigValidation(format!("layout.id_pattern: {e}"))
        })?;

        Ok(())
    }

    /// Resolve relative `reference`, `payroll` and `output` entries against `base_dir`.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        if let Some(reference) = self.reference.take() {
            self.reference = Some(base_dir.join(reference));
        }
        if let Some(output) = self.output.take() {
            self.output = Some(base_dir.join(output));
        }
        for pattern in &mut self.payroll {
            if Path::new(pattern.as_str()).is_relative() {
                *pattern = base_dir.join(pattern.as_str()).to_string_lossy().into_owned();
            }
        }
    }

    pub fn consolidate_options(&self) -> Result<ConsolidateOptions, ConsolidateError> {
        let layout = &self.layout;
        Ok(ConsolidateOptions {
            extract: ExtractOptions::new(
                layout.header_row,
                layout.spacer_rows,
                layout.id_column.clone(),
                &layout.id_pattern,
            )?,
            extension: self.output_options.extension.trim_start_matches('.').to_string(),
            missing_columns: self.output_options.missing_columns,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
