//! Barplay CLI: inspect price files, replay them bar by bar, report pips statistics.
//!
//! Commands:
//! - `inspect`: ingest a delimited OHLCV file and print what was kept and dropped
//! - `replay`: step or auto-play through a file (or saved snapshot) and trade it
//! - `stats`: performance statistics for a saved trade ledger

mod commands;
mod repl;
mod report;

use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use barplay_core::config::ReplayConfig;
use barplay_core::data::{ingest_text, Dataset, DatasetStore, LedgerFile, SessionSnapshot};
use barplay_core::engine::ReplaySession;
use barplay_core::metrics::PerformanceStats;

#[derive(Parser)]
#[command(
    name = "barplay",
    about = "Barplay: replay historical price bars and simulate single-position trades"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a price file and print the ingestion report.
    Inspect {
        /// Delimited text file with a Date/Time/Open/High/Low/Close[/Volume] header.
        file: PathBuf,

        /// Number of raw rows to preview.
        #[arg(long)]
        preview: Option<usize>,
    },
    /// Replay a price file interactively, reading commands from stdin.
    Replay {
        /// Price file to ingest. Omit when restoring with --snapshot.
        file: Option<PathBuf>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Take-profit in pips (0 disables). Overrides the config file.
        #[arg(long, allow_hyphen_values = true)]
        tp: Option<f64>,

        /// Stop-loss in pips (0 disables). Overrides the config file.
        #[arg(long, allow_hyphen_values = true)]
        sl: Option<f64>,

        /// Autoplay interval in milliseconds. Overrides the config file.
        #[arg(long)]
        interval: Option<u64>,

        /// Restore bars from a snapshot saved with `save`.
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Write the trade ledger here as JSON on exit.
        #[arg(long)]
        ledger_out: Option<PathBuf>,
    },
    /// Print performance statistics for a saved trade ledger.
    Stats {
        /// Ledger JSON written by `replay --ledger-out`.
        ledger: PathBuf,

        /// Print the statistics as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { file, preview } => run_inspect(&file, preview),
        Commands::Replay {
            file,
            config,
            tp,
            sl,
            interval,
            snapshot,
            ledger_out,
        } => {
            let config = build_config(config.as_deref(), tp, sl, interval)?;
            run_replay(file, snapshot, &config, ledger_out)
        }
        Commands::Stats { ledger, json } => run_stats(&ledger, json),
    }
}

/// Logs go to stderr so stdout carries only reports. `RUST_LOG` overrides
/// the default `warn` level.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();
}

fn build_config(
    path: Option<&Path>,
    tp: Option<f64>,
    sl: Option<f64>,
    interval: Option<u64>,
) -> Result<ReplayConfig> {
    let mut config = match path {
        Some(path) => ReplayConfig::load(path)?,
        None => ReplayConfig::default(),
    };
    if let Some(tp) = tp {
        config.take_profit_pips = tp;
    }
    if let Some(sl) = sl {
        config.stop_loss_pips = sl;
    }
    if let Some(ms) = interval {
        config.autoplay_interval_ms = ms;
    }
    Ok(config.validated()?)
}

fn load_dataset(path: &Path, config: &ReplayConfig) -> Result<Dataset> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    ingest_text(&text, &config.ingest_options())
        .with_context(|| format!("failed to ingest {}", path.display()))
}

fn run_inspect(file: &Path, preview: Option<usize>) -> Result<()> {
    let mut config = ReplayConfig::default();
    if let Some(rows) = preview {
        config.preview_rows = rows;
    }
    let dataset = load_dataset(file, &config)?;
    print!("{}", report::ingest_summary(&dataset));
    Ok(())
}

fn run_replay(
    file: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    config: &ReplayConfig,
    ledger_out: Option<PathBuf>,
) -> Result<()> {
    let dataset = match (file, snapshot) {
        (Some(_), Some(_)) => bail!("a price file and --snapshot are mutually exclusive"),
        (None, None) => bail!("a price file or --snapshot is required"),
        (Some(file), None) => {
            let dataset = load_dataset(&file, config)?;
            print!("{}", report::ingest_summary(&dataset));
            dataset
        }
        (None, Some(path)) => {
            let snapshot = SessionSnapshot::load(&path)
                .with_context(|| format!("failed to restore {}", path.display()))?;
            println!(
                "Restored {} bars saved at {}",
                snapshot.dataset.len(),
                snapshot.saved_at.to_rfc3339()
            );
            snapshot.dataset
        }
    };

    let store = DatasetStore::new();
    let mut session = ReplaySession::new(config);
    session.replace_dataset(store.publish(dataset));

    let stdin = BufReader::new(io::stdin());
    repl::run(&mut session, stdin, &mut io::stdout())?;

    println!("{}", report::stats(&session.stats()));
    if let Some(path) = ledger_out {
        let fingerprint = store.latest().map(|d| d.fingerprint.clone());
        LedgerFile::new(session.ledger().clone(), fingerprint)
            .save(&path)
            .with_context(|| format!("failed to write ledger to {}", path.display()))?;
        println!("Ledger saved to: {}", path.display());
    }
    Ok(())
}

fn run_stats(path: &Path, json: bool) -> Result<()> {
    let ledger = LedgerFile::load(path)
        .with_context(|| format!("failed to read ledger {}", path.display()))?;
    let stats = PerformanceStats::compute(ledger.trades.as_slice());
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    if let Some(fingerprint) = &ledger.dataset_fingerprint {
        println!("Dataset:    {fingerprint}");
    }
    println!("{}", report::stats(&stats));
    Ok(())
}
