mod app;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use hrl_core::PhotometerKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hrl", version, about = "Bookkeeping and device checks for psychophysics sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PhotometerArg {
    #[value(name = "optical")]
    OptiCal,
    #[value(name = "minolta")]
    Minolta,
}

impl From<PhotometerArg> for PhotometerKind {
    fn from(value: PhotometerArg) -> Self {
        match value {
            PhotometerArg::OptiCal => PhotometerKind::OptiCal,
            PhotometerArg::Minolta => PhotometerKind::Minolta,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// How far a run has progressed.
    Status {
        #[arg(long)]
        design: PathBuf,
        #[arg(long)]
        results: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Refresh rate from logged frame intervals (seconds, one per line).
    CheckRate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, default_value_t = hrl_timing::DEFAULT_MIN_RATE_HZ)]
        min_rate: f64,
        #[arg(long)]
        json: bool,
    },
    /// Writes a shuffled full-factorial design matrix.
    Design {
        /// `NAME=level,level,...`, once per factor.
        #[arg(long = "factor", required = true)]
        factors: Vec<String>,
        #[arg(long, default_value_t = 1)]
        repeats: usize,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Reads luminance samples from a photometer on a serial port.
    Measure {
        #[arg(long, value_enum)]
        kind: PhotometerArg,
        #[arg(long, default_value = hrl_devices::DEFAULT_PORT)]
        port: PathBuf,
        #[arg(long, default_value_t = 1)]
        samples: usize,
        /// How long to wait for each reply.
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
    /// Runs the remaining trials of a session on simulated hardware.
    Simulate {
        /// Session config; falls back to HRL_CONFIG_PATH.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Simulated response time per trial.
        #[arg(long, default_value_t = 350)]
        rt_ms: u64,
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Status {
            design,
            results,
            json,
        } => app::status(&design, &results, json),
        Commands::CheckRate {
            files,
            min_rate,
            json,
        } => app::check_rate(&files, min_rate, json),
        Commands::Design {
            factors,
            repeats,
            seed,
            output,
        } => app::design(&factors, repeats, seed, &output),
        Commands::Measure {
            kind,
            port,
            samples,
            timeout_ms,
        } => app::measure(kind.into(), &port, samples, timeout_ms),
        Commands::Simulate {
            config,
            rt_ms,
            timeout_ms,
        } => app::simulate(config.as_deref(), rt_ms, timeout_ms),
    }
}
