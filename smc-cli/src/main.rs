//! SMC CLI: replay, demo, and config commands.
//!
//! Commands:
//! - `replay` : feed a CSV of ticks through the engine, write signals as JSON Lines
//! - `demo` : generate a synthetic trend or walk and run it through the engine
//! - `config` : print the default runner config as TOML
//!
//! Signals go to `--output` when given, otherwise to stdout. The run summary
//! always goes to stderr so stdout stays machine-readable.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, DurationRound, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use smc_core::OutcomeKind;
use smc_runner::{
    CsvTickSource, JsonlSink, ReplaySummary, Runner, RunnerConfig, SyntheticFeed, SyntheticMode,
};

#[derive(Parser)]
#[command(name = "smc", about = "SMC CLI: market-structure signal engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a CSV of ticks (header `instrument,price,timestamp`).
    Replay {
        /// Tick file.
        #[arg(long)]
        ticks: PathBuf,

        /// Runner config TOML. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write signals here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the summary as JSON.
        #[arg(long, default_value_t = false)]
        json_summary: bool,
    },
    /// Run a synthetic price path through the engine.
    Demo {
        #[arg(long, default_value = "EURUSD")]
        instrument: String,

        /// Number of ticks, one per bar interval.
        #[arg(long, default_value_t = 60)]
        bars: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, value_enum, default_value_t = Trend::Up)]
        trend: Trend,

        /// Starting price.
        #[arg(long, default_value_t = 100.0)]
        price: f64,

        /// Drive the wall-clock polling loop instead of tick-time replay.
        #[arg(long, default_value_t = false)]
        poll: bool,

        /// Write signals here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the default runner config as TOML.
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum Trend {
    Up,
    Down,
    Walk,
}

impl Trend {
    fn mode(self) -> SyntheticMode {
        match self {
            Trend::Up => SyntheticMode::Trend { step_pct: 0.001 },
            Trend::Down => SyntheticMode::Trend { step_pct: -0.001 },
            Trend::Walk => SyntheticMode::Walk { volatility: 0.002 },
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            ticks,
            config,
            output,
            json_summary,
        } => run_replay(ticks, config, output, json_summary),
        Commands::Demo {
            instrument,
            bars,
            seed,
            trend,
            price,
            poll,
            output,
        } => run_demo(instrument, bars, seed, trend, price, poll, output),
        Commands::Config => {
            print!("{}", RunnerConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn open_sink(output: Option<&PathBuf>) -> Result<JsonlSink<Box<dyn Write>>> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    Ok(JsonlSink::new(writer))
}

fn run_replay(
    ticks: PathBuf,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    json_summary: bool,
) -> Result<()> {
    let config = match config_path {
        Some(path) => RunnerConfig::from_file(&path)?,
        None => RunnerConfig::default(),
    };
    let source = CsvTickSource::from_path(&ticks)?;
    if source.skipped() > 0 {
        info!(skipped = source.skipped(), "malformed rows dropped");
    }

    let runner = Runner::new(config)?;
    let mut sink = open_sink(output.as_ref())?;
    let summary = runner.replay(source.into_ticks(), &mut sink)?;

    if json_summary {
        eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, output.as_ref());
    }
    Ok(())
}

fn run_demo(
    instrument: String,
    bars: usize,
    seed: u64,
    trend: Trend,
    price: f64,
    poll: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    if !(price.is_finite() && price > 0.0) {
        bail!("--price must be positive, got {price}");
    }
    if bars == 0 {
        bail!("--bars must be at least 1");
    }

    let config = RunnerConfig {
        instruments: vec![instrument.clone()],
        seed,
        ..RunnerConfig::default()
    };
    let interval = config.schedule.bar_interval();
    // Align to the bar grid so every tick opens its own bar.
    let end = Utc::now().duration_trunc(interval)?;
    let start = demo_start(end, interval, bars)?;
    let mut feed = SyntheticFeed::new(&[instrument], price, trend.mode(), seed, start, interval);

    let runner = Runner::new(config)?;
    let mut sink = open_sink(output.as_ref())?;
    let summary = if poll {
        let stop = AtomicBool::new(false);
        let mut feed = feed.with_limit(bars);
        runner.run_polling(&mut feed, &mut sink, &stop)?
    } else {
        runner.replay(feed.take(bars), &mut sink)?
    };

    print_summary(&summary, output.as_ref());
    Ok(())
}

/// First tick time so that `bars` ticks, one per interval, end at `end`.
fn demo_start(end: DateTime<Utc>, interval: Duration, bars: usize) -> Result<DateTime<Utc>> {
    let Ok(steps) = i32::try_from(bars) else {
        bail!("--bars must be at most {}, got {bars}", i32::MAX);
    };
    interval
        .checked_mul(steps)
        .and_then(|span| end.checked_sub_signed(span))
        .context("--bars reaches before the earliest representable time")
}

fn print_summary(summary: &ReplaySummary, output: Option<&PathBuf>) {
    eprintln!();
    eprintln!("=== Run Summary ===");
    if let (Some(first), Some(last)) = (summary.first_tick, summary.last_tick) {
        eprintln!("Period:         {first} to {last}");
    }
    eprintln!(
        "Ticks:          {} accepted, {} rejected",
        summary.ticks_accepted, summary.ticks_rejected
    );
    eprintln!("Cycles:         {}", summary.cycles);
    eprintln!("Signals:        {}", summary.emitted);
    eprintln!();
    eprintln!("--- Outcomes ---");
    for kind in [
        OutcomeKind::InsufficientData,
        OutcomeKind::NoPrimaryConfirmation,
        OutcomeKind::BelowThreshold,
        OutcomeKind::RiskUnavailable,
        OutcomeKind::Duplicate,
        OutcomeKind::Emitted,
    ] {
        eprintln!("{:<24}{}", kind.as_str(), summary.count(kind));
    }
    if let Some(path) = output {
        eprintln!();
        eprintln!("Signals written to: {}", path.display());
    }
    eprintln!();
}
