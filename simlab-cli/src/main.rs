//! SimLab CLI: backtest, verify, replay and data generation commands.
//!
//! Commands:
//! - `backtest`: run a spec over a bar file (or synthetic data) and write artifacts
//! - `verify`: re-run the verification suite from a run directory alone
//! - `replay`: run a spec N times and compare output digests
//! - `generate`: write a synthetic multi-symbol tape as Parquet
//!
//! Exit status is 2 when a run fails verification or a replay diverges.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use simlab_core::data::{interleave, write_bars_parquet, SyntheticSeries};
use simlab_core::domain::Bar;
use simlab_core::rng::SeedHierarchy;
use simlab_core::strategy::StrategyLogic;
use simlab_runner::{
    load_market_data, replay, run_backtest, ArtifactManager, BacktestResult, RunSpec,
    VerificationReport, Verifier,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(
    name = "simlab",
    about = "SimLab CLI: deterministic backtesting with post-run verification"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest and write trades, equity curve, summary and report.
    Backtest {
        /// Run spec (.json or .toml).
        #[arg(long)]
        spec: PathBuf,

        /// Bar file (.parquet or .csv).
        #[arg(long, conflicts_with = "synthetic")]
        data: Option<PathBuf>,

        /// Generate this many synthetic daily bars per symbol instead of reading a file.
        #[arg(long)]
        synthetic: Option<usize>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        out: PathBuf,
    },
    /// Re-verify a run directory written by `backtest`.
    Verify {
        /// Run directory.
        #[arg(long)]
        dir: PathBuf,
    },
    /// Execute a spec several times and check the outputs are identical.
    Replay {
        #[arg(long)]
        spec: PathBuf,

        #[arg(long, conflicts_with = "synthetic")]
        data: Option<PathBuf>,

        #[arg(long)]
        synthetic: Option<usize>,

        #[arg(long, default_value_t = 3)]
        runs: usize,
    },
    /// Write a synthetic daily tape to a Parquet file.
    Generate {
        /// Output file.
        #[arg(long)]
        out: PathBuf,

        /// Symbols to generate.
        #[arg(long, num_args = 1.., default_value = "SPY")]
        symbols: Vec<String>,

        /// Bars per symbol.
        #[arg(long, default_value_t = 504)]
        bars: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simlab_core=info,simlab_runner=info,simlab=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            spec,
            data,
            synthetic,
            out,
        } => run_backtest_cmd(&spec, data.as_deref(), synthetic, &out),
        Commands::Verify { dir } => run_verify_cmd(&dir),
        Commands::Replay {
            spec,
            data,
            synthetic,
            runs,
        } => run_replay_cmd(&spec, data.as_deref(), synthetic, runs),
        Commands::Generate {
            out,
            symbols,
            bars,
            seed,
        } => run_generate_cmd(&out, &symbols, bars, seed),
    }
}

/// Synthetic tape for the strategy symbol plus the declared universe.
fn synthetic_tape(spec: &RunSpec, bars: usize) -> Vec<Bar> {
    let mut symbols: Vec<String> = spec.universe.clone();
    symbols.push(spec.strategy.symbol().to_string());
    symbols.sort();
    symbols.dedup();
    generate_tape(&symbols, bars, spec.seed)
}

fn generate_tape(symbols: &[String], bars: usize, seed: u64) -> Vec<Bar> {
    let seeds = SeedHierarchy::new(seed);
    interleave(
        symbols
            .iter()
            .map(|s| SyntheticSeries::daily(s.as_str(), bars).generate(&seeds))
            .collect(),
    )
}

fn load_inputs(
    spec_path: &Path,
    data: Option<&Path>,
    synthetic: Option<usize>,
) -> Result<(RunSpec, Vec<Bar>)> {
    let spec = RunSpec::load(spec_path)
        .with_context(|| format!("Failed to load run spec {}", spec_path.display()))?;
    let bars = match (data, synthetic) {
        (Some(path), _) => load_market_data(path)
            .with_context(|| format!("Failed to load market data {}", path.display()))?,
        (None, Some(n)) => synthetic_tape(&spec, n),
        (None, None) => bail!("one of --data or --synthetic is required"),
    };
    info!(bars = bars.len(), "market data loaded");
    Ok((spec, bars))
}

fn run_backtest_cmd(
    spec_path: &Path,
    data: Option<&Path>,
    synthetic: Option<usize>,
    out: &Path,
) -> Result<()> {
    let (spec, bars) = load_inputs(spec_path, data, synthetic)?;
    let result = run_backtest(&spec, &bars)?;

    print_summary(&result);
    print_report(&result.report);

    let paths = ArtifactManager::new(out)?.save_run(&result)?;
    println!("Artifacts saved to: {}", out.display());
    println!("  {}", paths.manifest.display());

    if !result.report.passed {
        std::process::exit(2);
    }
    Ok(())
}

fn run_verify_cmd(dir: &Path) -> Result<()> {
    let manager = ArtifactManager::open(dir);
    let loaded = manager.load_run();
    let verifier = match &loaded.manifest {
        Some(m) => Verifier::new(m.spec.policy.clone(), m.spec.verification.clone()),
        None => Verifier::default(),
    };
    let report = verifier.verify(&loaded.verification_input());

    print_report(&report);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.passed {
        std::process::exit(2);
    }
    Ok(())
}

fn run_replay_cmd(
    spec_path: &Path,
    data: Option<&Path>,
    synthetic: Option<usize>,
    runs: usize,
) -> Result<()> {
    let (spec, bars) = load_inputs(spec_path, data, synthetic)?;
    let outcome = replay(&spec, &bars, runs)?;

    for (i, digest) in outcome.digests.iter().enumerate() {
        println!("run {:>3}: {}", i + 1, digest.0);
    }
    if outcome.deterministic {
        println!("Deterministic: all {runs} runs produced identical output");
        Ok(())
    } else {
        eprintln!("Non-deterministic: digests differ across runs");
        std::process::exit(2);
    }
}

fn run_generate_cmd(out: &Path, symbols: &[String], bars: usize, seed: u64) -> Result<()> {
    let tape = generate_tape(symbols, bars, seed);
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    write_bars_parquet(out, &tape)?;
    println!(
        "Wrote {} bars for {} symbols to {}",
        tape.len(),
        symbols.len(),
        out.display()
    );
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let s = &result.summary;
    println!();
    println!("=== Backtest Summary ===");
    println!(
        "Strategy:         {} on {}",
        result.spec.strategy.name(),
        result.spec.strategy.symbol()
    );
    println!("Bars:             {}", result.bars_processed);
    println!("Fill timing:      {}", s.fill_timing.as_str());
    println!("Initial equity:   {:.2}", s.initial_equity);
    println!("Final equity:     {:.2}", s.final_equity);
    println!("Total return:     {:.2}%", s.total_return * 100.0);
    println!(
        "Sharpe:           {:.3} (annualization {:.0})",
        s.sharpe_ratio, s.annualization_factor
    );
    println!("Max drawdown:     {:.2}%", s.max_drawdown * 100.0);
    println!("Trades:           {}", s.trade_count);
    println!("Rejected orders:  {}", s.rejected_orders);
    println!("Commission:       {:.2}", s.total_commission);
    println!("Turnover:         {:.2}", s.turnover);
    match s.peak_leverage {
        Some(lev) => println!("Peak leverage:    {lev:.2}"),
        None => println!("Peak leverage:    unbounded (equity exhausted)"),
    }
    println!("Digest:           {}", result.digest.0);
}

fn print_report(report: &VerificationReport) {
    println!();
    println!(
        "=== Verification: {} ===",
        if report.passed { "PASSED" } else { "FAILED" }
    );
    for f in &report.findings {
        println!("[{:?}] {:?}: {}", f.severity, f.rule_id, f.message);
    }
}
