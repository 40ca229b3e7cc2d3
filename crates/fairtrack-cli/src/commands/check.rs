//! Check command implementation
//!
//! Evaluates a single reported position the same way the contribution form does
//! once a fix has arrived.

use crate::cli::CheckArgs;
use crate::errors;
use crate::output::OutputWriter;
use crate::output_types::CheckOutput;
use anyhow::Result;
use fairtrack_core::config::LayeredConfig;
use fairtrack_core::models::{
    AcquisitionPhase, AcquisitionState, Fairteiler, LocationStatus, RetryState,
};
use fairtrack_geo::{evaluate_proximity, try_target_for};
use fairtrack_location::derive_status;

use super::distance::parse_point;

pub fn execute(args: CheckArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let position = parse_point(&args.position)?;
    let fairteiler =
        Fairteiler::new("cli", "Fairteiler").with_location(args.latitude, args.longitude);
    let target = try_target_for(&fairteiler, config.proximity_radius_m.value)
        .map_err(errors::invalid_target)?;

    let proximity = evaluate_proximity(Some(&position), Some(&target));
    let acquired = AcquisitionState {
        phase: AcquisitionPhase::Succeeded,
        permission_denied: false,
        last_error: None,
    };
    let status = derive_status(&acquired, &RetryState::default(), &proximity, true);
    let distance_m = proximity.distance_m();
    let message = status.user_message(distance_m);

    tracing::debug!(%status, distance_m, radius_m = target.radius_meters, "Evaluated position");

    if output.is_json() {
        output.result(CheckOutput {
            position,
            target: target.coordinates,
            radius_m: target.radius_meters,
            distance_m,
            status,
            is_location_verified: status.is_verified(),
            message,
        })?;
    } else {
        output.section("Proximity Check");
        output.kv("Position", position);
        output.kv("Fairteiler", target.coordinates);
        if let Some(distance) = distance_m {
            output.kv("Distance", format!("{:.1} m", distance));
        }
        output.kv("Radius", format!("{} m", target.radius_meters));
        output.kv("Status", status);
        println!();
        if status == LocationStatus::Verified {
            output.success(message);
        } else {
            output.warning(message);
        }
    }

    Ok(())
}
