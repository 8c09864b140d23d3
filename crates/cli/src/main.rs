// sellout - reconcile retail chain sell-out exports against master data

mod exit_codes;
mod pipeline;

use std::process::ExitCode;

use clap::Parser;
use sellout_recon::ReconError;
use tracing_subscriber::EnvFilter;

use exit_codes::{recon_exit_code, EXIT_SUCCESS};

/// Environment variable holding a tracing filter directive (e.g. `sellout_io=debug`).
const LOG_ENV: &str = "SELLOUT_LOG";

#[derive(Parser)]
#[command(name = "sellout")]
#[command(about = "Reconcile retail chain sell-out exports against master data")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log per-file and per-sheet detail
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: pipeline::Commands,
}

const fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("SELLOUT_COMMIT"), ")",
        "\ntarget:  ", env!("SELLOUT_TARGET"),
    )
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    // A global subscriber may already be installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match pipeline::cmd_pipeline(cli.command) {
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
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => {
                Some("check the config against `sellout validate <config>`")
            }
            ReconError::SchemaMismatch { .. } => {
                Some("the chain's layout in the config may not match this export")
            }
            ReconError::MasterData(_) => Some("check [master] file and table in the config"),
            ReconError::ZeroVolumeGroup { .. } => {
                Some("set distribution.zero_volume = \"skip\" to leave such groups out")
            }
            _ => None,
        };
        let cli_err = CliError {
            code: recon_exit_code(&err),
            message: err.to_string(),
            hint: None,
        };
        match hint {
            Some(h) => cli_err.with_hint(h),
            None => cli_err,
        }
    }
}
