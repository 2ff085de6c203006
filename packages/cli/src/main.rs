#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the street lights dataset generator.
//!
//! Each subcommand runs one pipeline stage (reading upstream tables from
//! the output directory) or the whole pipeline. Without a subcommand an
//! interactive menu is shown.

mod interactive;

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use streetlights_cli_utils::{IndicatifProgress, MultiProgress};
use streetlights_generate::config::profile_names;
use streetlights_generate::{GeneratorConfig, default_output_dir, pipeline};

#[derive(Parser)]
#[command(name = "streetlights", about = "Synthetic street lights dataset generator")]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every subcommand.
#[derive(Args, Clone, Default)]
pub struct RunArgs {
    /// RNG seed; omit for a non-reproducible run
    #[arg(long, global = true)]
    pub seed: Option<u64>,
    /// Directory the CSV files are written to and read from
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,
    /// Path to a TOML profile (overrides --profile)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Embedded profile name (`full` or `sample`)
    #[arg(long, global = true)]
    pub profile: Option<String>,
    /// The run's "now", as `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`
    #[arg(long, global = true)]
    pub reference_time: Option<String>,
}

#[derive(Subcommand, Clone, Copy)]
pub enum Commands {
    /// Generate neighborhoods
    Neighborhoods,
    /// Generate street lights inside existing neighborhoods
    Lights,
    /// Generate maintenance suppliers
    Suppliers,
    /// Generate maintenance history for existing street lights
    Maintenance,
    /// Generate weather, demographics, and power grid enrichment
    Enrichment,
    /// Generate the complete dataset
    All,
    /// Generate the complete dataset with the `sample` profile
    Sample,
    /// Print supplier coverage for an existing dataset
    Report,
    /// List the embedded profiles
    Profiles,
}

/// Builds the run configuration from the profile and CLI overrides.
///
/// # Errors
///
/// Returns an error if the profile cannot be loaded or the reference time
/// does not parse.
pub fn resolve_config(
    args: &RunArgs,
    default_profile: &str,
) -> Result<GeneratorConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => GeneratorConfig::from_file(path)?,
        None => GeneratorConfig::profile(args.profile.as_deref().unwrap_or(default_profile))?,
    };

    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(text) = &args.reference_time {
        config.reference_time = Some(parse_reference_time(text)?);
    }
    Ok(config)
}

fn parse_reference_time(text: &str) -> Result<NaiveDateTime, Box<dyn std::error::Error>> {
    let text = text.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(text, streetlights_generate::TIMESTAMP_FORMAT) {
        return Ok(ts);
    }
    let date = NaiveDate::parse_from_str(text, streetlights_generate::DATE_FORMAT)
        .map_err(|e| format!("Invalid reference time '{text}': {e}"))?;
    Ok(date.and_time(chrono::NaiveTime::MIN))
}

/// Runs one command.
///
/// # Errors
///
/// Returns the first error from configuration, generation, or export.
pub fn execute(
    command: Commands,
    args: &RunArgs,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = args.output_dir.clone().unwrap_or_else(default_output_dir);

    match command {
        Commands::All | Commands::Sample => {
            let mut args = args.clone();
            if matches!(command, Commands::Sample) {
                args.profile = Some("sample".to_string());
            }
            let config = resolve_config(&args, "full")?;
            let progress = IndicatifProgress::stages_bar(multi, "Generating dataset");
            pipeline::run_all(config, &dir, progress.as_ref())?;
        }
        Commands::Neighborhoods => {
            pipeline::run_neighborhoods(resolve_config(args, "full")?, &dir)?;
        }
        Commands::Lights => {
            pipeline::run_street_lights(resolve_config(args, "full")?, &dir)?;
        }
        Commands::Suppliers => {
            pipeline::run_suppliers(resolve_config(args, "full")?, &dir)?;
        }
        Commands::Maintenance => {
            pipeline::run_maintenance(resolve_config(args, "full")?, &dir)?;
        }
        Commands::Enrichment => {
            pipeline::run_enrichment(resolve_config(args, "full")?, &dir)?;
        }
        Commands::Report => {
            let config = resolve_config(args, "full")?;
            let report = pipeline::run_report(&dir, &config.file_prefix)?;
            report.print();
        }
        Commands::Profiles => {
            println!(
                "{:<10} {:>13} {:>8} {:>9} {:>9} PREFIX",
                "NAME", "NEIGHBORHOODS", "LIGHTS", "SUPPLIERS", "REQUESTS"
            );
            println!("{}", "-".repeat(64));
            for name in profile_names() {
                let p = GeneratorConfig::profile(name)?;
                println!(
                    "{:<10} {:>13} {:>8} {:>9} {:>9} {}",
                    p.name,
                    p.counts.neighborhoods,
                    p.counts.street_lights,
                    p.counts.suppliers,
                    p.counts.maintenance_requests,
                    if p.file_prefix.is_empty() { "-" } else { p.file_prefix.as_str() },
                );
            }
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = streetlights_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&cli.run, &multi);
    };

    execute(command, &cli.run, &multi)
}
