use clap::{Parser, Subcommand};
use fairtrack_core::config::{parse_radius, parse_tracking_mode, CliConfigOverrides};
use fairtrack_core::models::TrackingMode;
use std::path::PathBuf;

/// FairTrack - Proximity-gated contribution checks
#[derive(Parser, Debug)]
#[command(name = "fairtrack")]
#[command(about = "Proximity-gated contribution checks for Fairteiler points", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./fairtrack.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Proximity radius in meters
    #[arg(long, global = true, value_name = "METERS", value_parser = radius_arg)]
    pub radius: Option<f64>,

    /// Maximum number of position requests per acquisition
    #[arg(
        long,
        global = true,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_attempts: Option<u32>,

    /// Tracking mode (continuous or one_shot)
    #[arg(long, global = true, value_parser = mode_arg)]
    pub mode: Option<TrackingMode>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> CliConfigOverrides {
        CliConfigOverrides {
            proximity_radius_m: self.radius,
            max_attempts: self.max_attempts,
            tracking_mode: self.mode,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Great-circle distance between two points
    Distance(DistanceArgs),

    /// Check whether a position unlocks contributions for a Fairteiler
    Check(CheckArgs),

    /// Replay a scripted device against the location tracker
    Simulate(SimulateArgs),

    /// Show the effective configuration and where each value came from
    Config,
}

#[derive(Parser, Debug)]
pub struct DistanceArgs {
    /// First point as "lat,lng"
    #[arg(allow_hyphen_values = true)]
    pub from: String,

    /// Second point as "lat,lng"
    #[arg(allow_hyphen_values = true)]
    pub to: String,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Device position as "lat,lng"
    #[arg(allow_hyphen_values = true)]
    pub position: String,

    /// Fairteiler latitude as stored (decimal degrees)
    #[arg(long, allow_hyphen_values = true)]
    pub latitude: String,

    /// Fairteiler longitude as stored (decimal degrees)
    #[arg(long, allow_hyphen_values = true)]
    pub longitude: String,
}

#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Scenario file (TOML)
    pub scenario: PathBuf,
}

fn radius_arg(s: &str) -> Result<f64, String> {
    parse_radius(s).map_err(|e| e.to_string())
}

fn mode_arg(s: &str) -> Result<TrackingMode, String> {
    parse_tracking_mode(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::parse_from([
            "fairtrack",
            "check",
            "48.7758,9.1829",
            "--latitude",
            "48.7758",
            "--longitude",
            "9.1829",
            "--radius",
            "30",
            "--mode",
            "one-shot",
        ]);

        let overrides = cli.overrides();
        assert_eq!(overrides.proximity_radius_m, Some(30.0));
        assert_eq!(overrides.tracking_mode, Some(TrackingMode::OneShot));
        assert_eq!(overrides.max_attempts, None);
    }

    #[test]
    fn test_rejects_bad_radius() {
        let result = Cli::try_parse_from(["fairtrack", "config", "--radius", "-3"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_coordinates_are_values() {
        let cli =
            Cli::parse_from(["fairtrack", "distance", "-33.8688,151.2093", "-33.8651,151.2099"]);
        match cli.command {
            Commands::Distance(args) => assert_eq!(args.from, "-33.8688,151.2093"),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
