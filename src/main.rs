use clap::Parser;
use rate_guard_sim::clock::{Clock, SystemClock, VirtualClock};
use rate_guard_sim::sink::CsvSink;
use rate_guard_sim::{RateLimiterSimulation, SimulationConfig, SimulationError};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Simulate a token bucket or leaky bucket rate limiter and log every decision.
///
/// Capacity and rate are read from TOKEN_BUCKET_CAPACITY / TOKEN_BUCKET_REFILL_RATE
/// or LEAKY_BUCKET_CAPACITY / LEAKY_BUCKET_OUTFLOW_RATE.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Algorithm to run: `token_bucket` or `leaky_bucket`
    algorithm: String,

    /// Advance ticks instantly on a virtual clock instead of sleeping
    #[arg(long)]
    instant: bool,

    /// Directory receiving `<algorithm>_logs.csv`
    #[arg(long, default_value = "logs")]
    output_dir: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), SimulationError> {
    let config = SimulationConfig::from_env(&cli.algorithm)?;
    let clock: Arc<dyn Clock> = if cli.instant {
        Arc::new(VirtualClock::new())
    } else {
        Arc::new(SystemClock::new())
    };

    let mut simulation = RateLimiterSimulation::new(config, clock)?;
    println!("----- START -----");
    simulation.run()?;

    let path = cli
        .output_dir
        .join(format!("{}_logs.csv", simulation.algorithm()));
    let file = fs::create_dir_all(&cli.output_dir)
        .and_then(|_| File::create(&path))
        .map_err(rate_guard_sim::SinkError::from)?;
    simulation.emit(&mut CsvSink::new(BufWriter::new(file)))?;

    log::info!("decision log written to {}", path.display());
    println!("----- DONE -----");
    Ok(())
}
