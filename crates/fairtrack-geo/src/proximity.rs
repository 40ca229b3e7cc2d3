use fairtrack_core::models::{Coordinates, ProximityResult, ProximityTarget};

use crate::spatial::distance_meters;

/// Compare the latest coordinate against the target.
///
/// Holds no state: call it again on every new reading and whenever the target
/// changes. A missing coordinate yields `Unknown`, a missing target `NoTarget`;
/// neither is ever in range.
pub fn evaluate_proximity(
    coordinates: Option<&Coordinates>,
    target: Option<&ProximityTarget>,
) -> ProximityResult {
    let Some(coordinates) = coordinates else {
        return ProximityResult::Unknown;
    };
    let Some(target) = target else {
        return ProximityResult::NoTarget;
    };

    let distance_m = distance_meters(coordinates, &target.coordinates);
    if distance_m <= target.radius_meters {
        ProximityResult::InRange { distance_m }
    } else {
        ProximityResult::OutOfRange { distance_m }
    }
}
