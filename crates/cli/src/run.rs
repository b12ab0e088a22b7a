//! `paycon run` / `columns` / `validate`.

use std::path::{Path, PathBuf};

use clap::Args;
use paycon_core::config::DEFAULT_OUTPUT_FILE;
use paycon_core::{
    consolidate, derive_columns, ConsolidateError, Consolidation, FileReport, InputFile, MissingColumns, RunConfig,
};
use paycon_io::XlsxReader;
use serde::Serialize;

use crate::CliError;

#[derive(Args)]
pub struct RunArgs {
    /// Reference .xlsx file that fixes the column order
    #[arg(long, short = 'r')]
    pub reference: Option<PathBuf>,

    /// Payroll .xlsx files or glob patterns
    pub payroll: Vec<String>,

    /// TOML run config (flags override its values)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Output workbook [default: Payroll_Consolidation.xlsx]
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Confirm the consolidation; nothing runs without it
    #[arg(long)]
    pub confirm: bool,

    /// Output the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Keep reference columns that no payroll file has, as empty columns
    #[arg(long)]
    pub fill_missing: bool,
}

/// Machine-readable run summary (`--json`).
#[derive(Debug, Serialize)]
struct RunSummary {
    engine_version: String,
    run_at: String,
    reference: String,
    processed: Vec<String>,
    skipped: Vec<String>,
    failures: Vec<FailureEntry>,
    output: Option<String>,
    rows: usize,
    columns: usize,
    /// Per-input outcome, including files ignored for their extension.
    files: Vec<FileReport>,
}

#[derive(Debug, Serialize)]
struct FailureEntry {
    file: String,
    message: String,
}

impl RunSummary {
    fn new(reference: &InputFile, result: &Consolidation, output: Option<&Path>) -> Self {
        let owned = |names: Vec<&str>| names.into_iter().map(String::from).collect::<Vec<_>>();
        Self {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            reference: reference.name.clone(),
            processed: owned(result.processed()),
            skipped: owned(result.skipped()),
            failures: result
                .failures()
                .into_iter()
                .map(|(file, message)| FailureEntry { file: file.to_string(), message: message.to_string() })
                .collect(),
            output: output.map(|p| p.display().to_string()),
            rows: result.table.height(),
            columns: result.table.width(),
            files: result.files.clone(),
        }
    }

    fn print_human(&self) {
        eprintln!("processed {} file(s): {}", self.processed.len(), self.processed.join(", "));
        if !self.skipped.is_empty() {
            eprintln!(
                "skipped {} duplicate file(s): {}",
                self.skipped.len(),
                self.skipped.join(", ")
            );
        }
        for failure in &self.failures {
            eprintln!("Error processing {}: {}", failure.file, failure.message);
        }
        match &self.output {
            Some(path) => eprintln!("wrote {} ({} rows x {} columns)", path, self.rows, self.columns),
            None => eprintln!("warning: no files were processed; no output written"),
        }
    }
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => RunConfig::default(),
    };
    if args.fill_missing {
        config.output_options.missing_columns = MissingColumns::Fill;
    }
    let options = config.consolidate_options()?;

    // Gating: reference, payroll files and confirmation, in that order.
    let reference_path = args.reference.or_else(|| config.reference.clone()).ok_or_else(|| {
        CliError::args("no reference file given")
            .with_hint("pass --reference <FILE> or set `reference` in the run config")
    })?;

    let patterns = if args.payroll.is_empty() { &config.payroll } else { &args.payroll };
    let payroll_paths = expand_inputs(patterns)?;
    if payroll_paths.is_empty() {
        return Err(CliError::args("no payroll files given")
            .with_hint("pass one or more payroll .xlsx files or glob patterns"));
    }

    if !args.confirm {
        return Err(CliError::args(format!(
            "{} payroll file(s) ready; consolidation not confirmed",
            payroll_paths.len()
        ))
        .with_hint("re-run with --confirm to consolidate"));
    }

    let output_path = args
        .output
        .or_else(|| config.output.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE));

    // The reference is fatal and is derived before any payroll file is touched.
    let reference = read_input(&reference_path)?;
    let canonical = derive_columns(&XlsxReader, &reference, &options.extract)?;

    let payroll: Vec<InputFile> = payroll_paths
        .iter()
        .map(|path| {
            read_input(path).unwrap_or_else(|e| {
                log::warn!("{}", e);
                InputFile::unreadable(file_name(path), e.to_string())
            })
        })
        .collect();

    if !args.json {
        print_inputs(&reference, &payroll);
    }

    let result = consolidate(&XlsxReader, &payroll, &canonical, &options);

    let written = if result.is_empty() {
        None
    } else {
        let export = paycon_io::export(&result.table, &config.output_options.sheet_name, &output_path)?;
        log::info!(
            "exported {} cell(s) to {} in {}ms",
            export.cells_exported,
            output_path.display(),
            export.export_duration_ms
        );
        Some(output_path.as_path())
    };

    let summary = RunSummary::new(&reference, &result, written);
    if args.json {
        let json_str = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        summary.print_human();
    }

    Ok(())
}

pub fn cmd_columns(
    reference_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => RunConfig::default(),
    };
    let reference_path = reference_path.or_else(|| config.reference.clone()).ok_or_else(|| {
        CliError::args("no reference file given")
            .with_hint("pass the reference file or set `reference` in the run config")
    })?;
    let options = config.consolidate_options()?;

    let reference = read_input(&reference_path)?;
    let columns = derive_columns(&XlsxReader, &reference, &options.extract)?;

    if json {
        let json_str = serde_json::to_string_pretty(&columns)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        for name in &columns {
            println!("{name}");
        }
    }
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: reference {}, {} payroll pattern(s), sheet '{}', missing columns {:?}",
        config
            .reference
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(from --reference)".into()),
        config.payroll.len(),
        config.output_options.sheet_name,
        config.output_options.missing_columns,
    );
    Ok(())
}

/// Parse, validate and resolve a run config relative to its own directory.
fn load_config(path: &Path) -> Result<RunConfig, CliError> {
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| ConsolidateError::Io(format!("cannot read config {}: {e}", path.display())))?;
    let mut config = RunConfig::from_toml(&config_str)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base_dir);
    Ok(config)
}

fn has_glob_chars(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Literal paths keep their given order; each pattern expands in sorted order.
fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>, CliError> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if !has_glob_chars(pattern) {
            paths.push(PathBuf::from(pattern));
            continue;
        }
        let entries = glob::glob(pattern)
            .map_err(|e| CliError::args(format!("invalid glob pattern {:?}: {}", pattern, e)))?;
        let mut matched: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    log::warn!("skipping unreadable glob match: {}", e);
                    None
                }
            })
            .filter(|p| p.is_file())
            .collect();
        matched.sort();
        if matched.is_empty() {
            log::warn!("pattern {:?} matched no files", pattern);
        }
        paths.extend(matched);
    }
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_input(path: &Path) -> Result<InputFile, ConsolidateError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ConsolidateError::Io(format!("cannot read {}: {e}", path.display())))?;
    log::debug!("read {} ({} bytes)", path.display(), bytes.len());
    Ok(InputFile::new(file_name(path), bytes))
}

fn print_inputs(reference: &InputFile, payroll: &[InputFile]) {
    eprintln!("Reference: {}", reference.name);
    eprintln!("Payroll files:");
    for file in payroll {
        eprintln!("  - {}", file.name);
    }
    eprintln!("Total: {} file(s)", payroll.len());
}
