//! Distance command implementation

use crate::cli::DistanceArgs;
use crate::errors;
use crate::output::OutputWriter;
use crate::output_types::DistanceOutput;
use anyhow::Result;
use fairtrack_core::config::LayeredConfig;
use fairtrack_core::models::Coordinates;
use fairtrack_geo::{distance_meters, parse_coordinates};

pub fn execute(args: DistanceArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let from = parse_point(&args.from)?;
    let to = parse_point(&args.to)?;
    let radius_m = config.proximity_radius_m.value;

    let distance_m = distance_meters(&from, &to);
    let within_radius = distance_m <= radius_m;

    if output.is_json() {
        output.result(DistanceOutput { from, to, distance_m, radius_m, within_radius })?;
    } else {
        output.section("Distance");
        output.kv("From", from);
        output.kv("To", to);
        output.kv("Distance", format!("{:.1} m", distance_m));
        output.kv(
            "Within radius",
            format!("{} ({} m)", if within_radius { "yes" } else { "no" }, radius_m),
        );
    }

    Ok(())
}

pub(super) fn parse_point(raw: &str) -> Result<Coordinates> {
    parse_coordinates(raw).map_err(|e| errors::invalid_coordinates(raw, e).into())
}
