//! `sellout run|validate|distribution|precision`: config-driven sell-out
//! reconciliation.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use log::info;
use serde::Serialize;

use sellout_recon::distribution::store_shares;
use sellout_recon::model::{DistributionShare, ReconSummary};
use sellout_recon::precision::most_precise_amount;
use sellout_recon::{PipelineConfig, Reconciliation, SalesBatch};

use crate::exit_codes::EXIT_USAGE;
use crate::CliError;

#[derive(Subcommand)]
pub enum Commands {
    /// Load every chain, reconcile against master data and replace the sales table
    #[command(after_help = "\
Examples:
  sellout run sellout.toml
  sellout run sellout.toml --json
  sellout run sellout.toml --skip-write --output summary.json")]
    Run {
        /// Path to the pipeline TOML config
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Reconcile without touching the sales table
        #[arg(long)]
        skip_write: bool,
    },

    /// Validate a pipeline config without running
    #[command(after_help = "\
Examples:
  sellout validate sellout.toml")]
    Validate {
        /// Path to the pipeline TOML config
        config: PathBuf,
    },

    /// Print each store's share of its chain/line unit volume (CSV by default)
    #[command(after_help = "\
Examples:
  sellout distribution sellout.toml
  sellout distribution sellout.toml --json
  sellout distribution sellout.toml --output distribucion.csv")]
    Distribution {
        /// Path to the pipeline TOML config
        config: PathBuf,

        /// Output JSON to stdout instead of CSV
        #[arg(long)]
        json: bool,

        /// Write CSV to file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Report the sales amount with the most decimal places
    Precision {
        /// Path to the pipeline TOML config
        config: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_pipeline(cmd: Commands) -> Result<(), CliError> {
    match cmd {
        Commands::Run {
            config,
            json,
            output,
            skip_write,
        } => cmd_run(&config, json, output, skip_write),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Distribution { config, json, output } => cmd_distribution(&config, json, output),
        Commands::Precision { config, json } => cmd_precision(&config, json),
    }
}

fn usage_err(msg: impl Into<String>) -> CliError {
    CliError { code: EXIT_USAGE, message: msg.into(), hint: None }
}

// ============================================================================
// Stages
// ============================================================================

/// Parse, validate and resolve paths against the config file's directory.
pub fn load_config(config_path: &Path) -> Result<PipelineConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| usage_err(format!("cannot read config {}: {e}", config_path.display())))?;
    let config = PipelineConfig::from_toml(&config_str)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.resolve(base_dir))
}

/// Normalize every chain in config order, load master data, reconcile.
pub fn reconcile(config: &PipelineConfig) -> Result<Reconciliation, CliError> {
    let mut batches: Vec<SalesBatch> = Vec::with_capacity(config.chains.len());
    for chain in &config.chains {
        batches.push(sellout_io::load_chain(chain, &config.chain_path(chain))?);
    }
    let master = sellout_io::load_master(&config.master.file, &config.master.table)?;
    Ok(sellout_recon::run(config, batches, &master)?)
}

// ============================================================================
// run
// ============================================================================

#[derive(Serialize)]
struct RunReport<'a> {
    name: &'a str,
    engine_version: &'static str,
    run_at: String,
    /// `None` when the write was skipped.
    rows_written: Option<usize>,
    sales_table: &'a str,
    summary: &'a ReconSummary,
    distribution: &'a [DistributionShare],
}

fn cmd_run(
    config_path: &Path,
    json_output: bool,
    output_file: Option<PathBuf>,
    skip_write: bool,
) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let recon = reconcile(&config)?;

    let rows_written = if skip_write {
        info!("--skip-write: sales table left untouched");
        None
    } else {
        Some(sellout_io::write_sales(
            &config.database.path,
            &config.database.sales_table,
            &recon.facts,
        )?)
    };

    let shares = store_shares(&recon.facts, config.distribution.zero_volume)?;

    let report = RunReport {
        name: &config.name,
        engine_version: env!("CARGO_PKG_VERSION"),
        run_at: chrono::Utc::now().to_rfc3339(),
        rows_written,
        sales_table: &config.database.sales_table,
        summary: &recon.summary,
        distribution: &shares,
    };
    emit_json(&report, json_output, output_file.as_deref())?;

    // Human summary to stderr
    let s = &recon.summary;
    let per_chain: Vec<String> = s
        .rows_by_chain
        .iter()
        .map(|(chain, rows)| format!("{chain} {rows}"))
        .collect();
    eprintln!(
        "'{}': {} sales rows ({}), {} unmatched products, {} unmatched stores",
        config.name,
        s.total_rows,
        per_chain.join(", "),
        s.unmatched_product_rows,
        s.unmatched_store_rows,
    );
    match rows_written {
        Some(n) => eprintln!(
            "wrote {n} rows to {} [{}]",
            config.database.path.display(),
            config.database.sales_table
        ),
        None => eprintln!("sales table not written (--skip-write)"),
    }
    eprintln!("distribution: {} store shares", shares.len());

    Ok(())
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    eprintln!(
        "valid: '{}' with {} chain(s), master {} [{}], sales table '{}'",
        config.name,
        config.chains.len(),
        config.master.file.display(),
        config.master.table,
        config.database.sales_table,
    );
    for chain in &config.chains {
        eprintln!("  {} ({}): {}", chain.name, chain.layout, config.chain_path(chain).display());
    }
    Ok(())
}

// ============================================================================
// distribution
// ============================================================================

fn cmd_distribution(
    config_path: &Path,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let recon = reconcile(&config)?;
    let shares = store_shares(&recon.facts, config.distribution.zero_volume)?;

    if let Some(ref path) = output_file {
        let file = std::fs::File::create(path)
            .map_err(|e| usage_err(format!("cannot write {}: {e}", path.display())))?;
        write_csv(file, &shares)
            .map_err(|e| usage_err(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        emit_json(&shares, true, None)?;
    } else if output_file.is_none() {
        let stdout = std::io::stdout();
        write_csv(stdout.lock(), &shares).map_err(|e| usage_err(e.to_string()))?;
    }

    eprintln!("distribution: {} store shares", shares.len());
    Ok(())
}

/// Distribution rows as CSV with a `chain,line,store,units,line_units,ratio` header.
pub fn write_csv<W: Write>(writer: W, shares: &[DistributionShare]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for share in shares {
        wtr.serialize(share)?;
    }
    wtr.flush()?;
    Ok(())
}

// ============================================================================
// precision
// ============================================================================

fn cmd_precision(config_path: &Path, json_output: bool) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let recon = reconcile(&config)?;

    let Some(found) = most_precise_amount(&recon.facts) else {
        eprintln!("no sales rows");
        return Ok(());
    };

    if json_output {
        emit_json(&found, true, None)?;
    } else {
        let fact = &recon.facts[found.row];
        println!(
            "row {}: amount {} has {} decimal place(s) ({}, {}, {})",
            found.row,
            found.amount,
            found.decimals,
            fact.chain.as_deref().unwrap_or("-"),
            fact.store,
            fact.date,
        );
    }
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn emit_json<T: Serialize>(
    value: &T,
    to_stdout: bool,
    output_file: Option<&Path>,
) -> Result<(), CliError> {
    if !to_stdout && output_file.is_none() {
        return Ok(());
    }
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| usage_err(format!("JSON serialization error: {e}")))?;

    if let Some(path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| usage_err(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }
    if to_stdout {
        println!("{json_str}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_has_header_and_rows() {
        let shares = vec![
            DistributionShare {
                chain: "ALKOSTO".into(),
                line: "TV".into(),
                store: "S1".into(),
                units: 10.0,
                line_units: 40.0,
                ratio: 0.25,
            },
            DistributionShare {
                chain: "ALKOSTO".into(),
                line: "TV".into(),
                store: "S2".into(),
                units: 30.0,
                line_units: 40.0,
                ratio: 0.75,
            },
        ];
        let mut buf = Vec::new();
        write_csv(&mut buf, &shares).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "chain,line,store,units,line_units,ratio\n\
             ALKOSTO,TV,S1,10.0,40.0,0.25\n\
             ALKOSTO,TV,S2,30.0,40.0,0.75\n"
        );
    }

    #[test]
    fn missing_config_is_usage_error() {
        let err = load_config(Path::new("/nonexistent/sellout.toml")).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
    }
}
