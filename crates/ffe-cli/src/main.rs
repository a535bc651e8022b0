//! serdes-ffe: channel modeling and zero-forcing FFE synthesis.
//!
//! Recovers the impulse and pulse response of a serial link channel from
//! measured S-parameters or an RLGC line model, then solves for the FFE taps
//! that force the sampled inter-symbol interference to zero.

mod config;
mod orchestrator;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "serdes-ffe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Model a channel and synthesize zero-forcing FFE taps
    Run {
        /// Run configuration files (TOML or JSON)
        #[arg(short, long, required = true, num_args = 1..)]
        config: Vec<PathBuf>,

        /// Output directory for results
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },

    /// Parse and summarize a Touchstone file
    Inspect {
        /// Path to the .sNp file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Run { config, output } => {
            run_configs(&config, &output, cli.format)?;
        }
        Commands::Inspect { file } => {
            inspect_touchstone(&file)?;
        }
    }

    Ok(())
}

/// Run every configuration; several runs go to one subdirectory each.
///
/// All configurations are loaded and validated before any run starts.
fn run_configs(paths: &[PathBuf], output_dir: &Path, format: OutputFormat) -> Result<()> {
    let nested = paths.len() > 1;

    let configs = paths
        .iter()
        .map(|path| {
            tracing::info!("Loading configuration from {:?}", path);
            config::load_config(path).with_context(|| format!("Invalid configuration {:?}", path))
        })
        .collect::<Result<Vec<_>>>()?;
    if nested {
        config::check_unique_names(paths.iter().map(PathBuf::as_path).zip(&configs))?;
    }

    let outcomes: Vec<(&PathBuf, Result<orchestrator::RunResults>)> = paths
        .par_iter()
        .zip(configs)
        .map(|(path, config)| (path, run_one(config, output_dir, nested, format)))
        .collect();

    let mut failures = 0;
    for (path, outcome) in outcomes {
        match outcome {
            Ok(results) => output::print_results(&results, format)?,
            Err(e) => {
                failures += 1;
                tracing::error!("Run {:?} failed: {:#}", path, e);
                eprintln!("{}: {:#}", path.display(), e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} runs failed", failures, paths.len());
    }
    Ok(())
}

fn run_one(
    config: config::RunConfig,
    output_dir: &Path,
    nested: bool,
    format: OutputFormat,
) -> Result<orchestrator::RunResults> {
    let run_dir = if nested {
        output_dir.join(&config.name)
    } else {
        output_dir.to_path_buf()
    };

    let results = orchestrator::Orchestrator::new(config).run()?;
    output::write_results(&results, &run_dir, format)
        .with_context(|| format!("Failed to write results to {:?}", run_dir))?;

    tracing::info!("Run complete. Results written to {:?}", run_dir);
    Ok(results)
}

fn inspect_touchstone(file: &Path) -> Result<()> {
    tracing::info!("Parsing Touchstone file: {:?}", file);

    let ts = lib_touchstone::parse_touchstone_file(file)
        .with_context(|| format!("Failed to parse {:?}", file))?;

    println!("Touchstone File");
    println!("  Ports: {}", ts.num_ports);
    println!("  Format: {:?}", ts.format);
    println!("  Z0: {} ohms", ts.z0.0);
    println!("  Frequency points: {}", ts.sparams.len());
    if ts.noise_points > 0 {
        println!("  Noise points: {} (ignored)", ts.noise_points);
    }

    if let Some((f_min, f_max)) = ts.sparams.frequency_range() {
        println!("  Frequency range: {:.2} MHz - {:.2} GHz", f_min.as_mhz(), f_max.as_ghz());
    }

    if ts.sparams.is_passive() {
        println!("  Passive: Yes");
    } else {
        println!("  Passive: No");
    }
    println!(
        "  Reciprocal: {}",
        if ts.sparams.is_reciprocal(1e-6) { "Yes" } else { "No" }
    );

    if ts.num_ports == 2 {
        let s21 = ts.sparams.to_db(1, 0);
        if let (Some(first), Some(last)) = (s21.first(), s21.last()) {
            println!("  |S21|: {:.2} dB (first point), {:.2} dB (last point)", first, last);
        }
    }

    Ok(())
}
