#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the cyclone forecast assessment engine.

use std::fs::File;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cyclone_watch_forecast::{
    ForecastTrack, decode_forecast_text, encode_forecast_text, parse_forecast,
};
use cyclone_watch_report::export::write_outputs;
use cyclone_watch_report::{EngineConfig, assess_track};
use cyclone_watch_spatial::{PlanarProjection, RegionSet};
use cyclone_watch_spatial_models::AdminLevel;

#[derive(Parser)]
#[command(name = "cyclone_watch", about = "Tropical cyclone forecast assessment")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a forecast against administrative boundaries and write the
    /// normalized track, distance tables, cone and report
    Assess(AssessArgs),
    /// Print the transport encoding of a raw forecast file
    Encode {
        /// Raw forecast CSV
        file: PathBuf,
    },
    /// Decode a transport-encoded forecast and print the raw text
    Decode {
        /// Encoded forecast
        encoded: String,
    },
}

#[derive(Args)]
struct AssessArgs {
    /// Transport-encoded forecast CSV
    csv: Option<String>,
    /// Read the encoded forecast from this environment variable instead
    #[arg(long)]
    csv_env_var_name: Option<String>,
    /// Read a raw (not encoded) forecast CSV from this file instead
    #[arg(long)]
    raw_file: Option<PathBuf>,
    /// Level 1 administrative boundaries (`GeoJSON`)
    #[arg(long)]
    adm1: PathBuf,
    /// Level 2 administrative boundaries (`GeoJSON`)
    #[arg(long)]
    adm2: Option<PathBuf>,
    /// Engine configuration (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory the outputs are written to
    #[arg(long, default_value = "outputs")]
    output_dir: PathBuf,
    /// Closest passes farther than this go to the restricted distribution
    /// list only
    #[arg(long, default_value = "1000")]
    info_distance_threshold_km: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Assess(args) => assess(&args)?,
        Commands::Encode { file } => {
            let raw = std::fs::read_to_string(&file)?;
            println!("{}", encode_forecast_text(&raw));
        }
        Commands::Decode { encoded } => {
            print!("{}", decode_forecast_text(&encoded)?.into_inner());
        }
    }

    Ok(())
}

fn assess(args: &AssessArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let track = load_track(args)?;

    let projection = PlanarProjection::pdc_mercator();
    let mut regions = vec![RegionSet::read(AdminLevel::Adm1, &args.adm1, &projection)?];
    if let Some(path) = &args.adm2 {
        regions.push(RegionSet::read(AdminLevel::Adm2, path, &projection)?);
    }

    let assessment = assess_track(track, &regions, &config)?;
    let written = write_outputs(&assessment, &config, &args.output_dir)?;
    for path in &written {
        println!("{}", path.display());
    }

    match &assessment.closest_pass {
        Some(pass) if pass.is_within(args.info_distance_threshold_km) => log::info!(
            "{} passes {} km from {}: full distribution list",
            assessment.report.display_name(),
            pass.distance_km,
            pass.region_name
        ),
        Some(pass) => log::info!(
            "{} passes {} km from {} (beyond {} km): restricted distribution list",
            assessment.report.display_name(),
            pass.distance_km,
            pass.region_name,
            args.info_distance_threshold_km
        ),
        None => log::warn!("No closest pass computed, skipping routing check"),
    }

    Ok(())
}

/// Resolves the forecast from, in order of precedence, `--raw-file`,
/// `--csv-env-var-name` and the positional argument.
fn load_track(args: &AssessArgs) -> Result<ForecastTrack, Box<dyn std::error::Error>> {
    if let Some(path) = &args.raw_file {
        log::info!("Reading raw forecast from {}", path.display());
        return Ok(parse_forecast(File::open(path)?)?);
    }

    let encoded = match (&args.csv_env_var_name, &args.csv) {
        (Some(name), _) => std::env::var(name)
            .map_err(|e| format!("Cannot read forecast from ${name}: {e}"))?,
        (None, Some(csv)) => csv.clone(),
        (None, None) => {
            return Err(
                "No forecast given: pass an encoded CSV, --csv-env-var-name or --raw-file".into(),
            );
        }
    };

    Ok(parse_forecast(decode_forecast_text(&encoded)?)?)
}
