//! Scheduler simulation binary.
//!
//! Runs a built-in or TOML-defined profile through the scheduler, prints
//! per-client results and exits non-zero if verification finds a violation.
//!
//! ```bash
//! # Built-in profile
//! mclock-sim --profile reference
//!
//! # Custom profile with a different seed and dispatch count
//! mclock-sim --profile-file tenants.toml --seed 7 --dispatches 10000
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mclock_workload::profiles::{list_profiles, load_profile};
use mclock_workload::{SimulationProfile, Workload};

#[derive(Parser, Debug)]
#[command(name = "mclock-sim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Built-in profile to run.
    #[arg(long, default_value = "reference")]
    profile: String,

    /// Load the profile from a TOML file instead.
    #[arg(long, conflicts_with = "profile")]
    profile_file: Option<PathBuf>,

    /// Seed for the workload RNG.
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Override the profile's dispatch count.
    #[arg(long)]
    dispatches: Option<u64>,

    /// List built-in profiles and exit.
    #[arg(long)]
    list_profiles: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: Level,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.list_profiles {
        for name in list_profiles() {
            let profile = load_profile(name)?;
            println!("{name:<12} {}", profile.description);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let profile = match &args.profile_file {
        Some(path) => SimulationProfile::from_file(path)?,
        None => load_profile(&args.profile)?,
    };
    info!(profile = %profile.name, seed = args.seed, "loaded profile");

    let mut builder = Workload::builder().seed(args.seed).profile(profile);
    if let Some(dispatches) = args.dispatches {
        builder = builder.dispatches(dispatches);
    }
    let stats = builder.build()?.run()?;
    stats.print_summary();

    if stats.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
