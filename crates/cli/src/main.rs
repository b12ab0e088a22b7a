// paycon - consolidate semi-monthly payroll registers into one workbook

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use paycon_core::ConsolidateError;

use exit_codes::{core_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use run::RunArgs;

#[derive(Parser)]
#[command(name = "paycon")]
#[command(about = "Consolidate payroll register workbooks into a single sheet")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consolidate payroll files, ordering columns like the reference file
    #[command(after_help = "\
Payroll files are named <PayrollType>-<MMDDYYYY>.xlsx. Arguments may be glob
patterns; each pattern expands in sorted order.

Examples:
  paycon run --reference REF-01152024.xlsx Regular-01152024.xlsx Regular-01312024.xlsx --confirm
  paycon run --reference REF-01152024.xlsx 'payroll/*.xlsx' -o january.xlsx --confirm
  paycon run --config payroll.toml --confirm --json")]
    Run(RunArgs),

    /// Print the canonical column order derived from a reference file
    #[command(after_help = "\
Examples:
  paycon columns REF-01152024.xlsx
  paycon columns REF-01152024.xlsx --json
  paycon columns --config payroll.toml")]
    Columns {
        /// Reference .xlsx file (defaults to the config's `reference`)
        reference: Option<PathBuf>,

        /// TOML run config whose `[layout]` is used to read the reference
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output a JSON array instead of one name per line
        #[arg(long)]
        json: bool,
    },

    /// Validate a run config without running
    #[command(after_help = "\
Examples:
  paycon validate payroll.toml")]
    Validate {
        /// Path to the TOML run config
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine:  paycon-core ", env!("CARGO_PKG_VERSION"),
        "\nformats: xlsx (read: calamine, write: rust_xlsxwriter)",
    )
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => run::cmd_run(args),
        Commands::Columns { reference, config, json } => run::cmd_columns(reference, config, json),
        Commands::Validate { config } => run::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ConsolidateError> for CliError {
    fn from(err: ConsolidateError) -> Self {
        let code = core_exit_code(&err);
        let hint = match &err {
            ConsolidateError::Reference { .. } => {
                Some("the reference must be an .xlsx payroll register with its header on row 4".to_string())
            }
            ConsolidateError::ConfigParse(_) | ConsolidateError::ConfigValidation(_) => {
                Some("check the config with: paycon validate <FILE>".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}
