//! Parsing of decimal-degree strings delivered by the Fairteiler data provider.

use fairtrack_core::error::{FairtrackError, Result};
use fairtrack_core::models::{Coordinates, Fairteiler, ProximityTarget};

/// Parse a decimal-degree string for `field` ("latitude" or "longitude")
pub fn parse_degrees(field: &str, raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FairtrackError::InvalidCoordinate {
            field: field.to_string(),
            reason: "value is empty".to_string(),
        });
    }

    let value: f64 = trimmed.parse().map_err(|_| FairtrackError::InvalidCoordinate {
        field: field.to_string(),
        reason: format!("'{}' is not a decimal number", trimmed),
    })?;

    let limit = if field == "latitude" { 90.0 } else { 180.0 };
    if !value.is_finite() || value.abs() > limit {
        return Err(FairtrackError::InvalidCoordinate {
            field: field.to_string(),
            reason: format!("{} is outside ±{}", value, limit),
        });
    }

    Ok(value)
}

/// Parse "lat,lng" into coordinates
pub fn parse_coordinates(raw: &str) -> Result<Coordinates> {
    let (lat, lng) = raw.split_once(',').ok_or_else(|| FairtrackError::InvalidCoordinate {
        field: "coordinates".to_string(),
        reason: format!("expected 'latitude,longitude', got '{}'", raw),
    })?;

    Ok(Coordinates::new(parse_degrees("latitude", lat)?, parse_degrees("longitude", lng)?))
}

/// Build the proximity target for a Fairteiler record
pub fn try_target_for(fairteiler: &Fairteiler, radius_meters: f64) -> Result<ProximityTarget> {
    let (Some(lat), Some(lng)) = (&fairteiler.latitude, &fairteiler.longitude) else {
        return Err(FairtrackError::InvalidTarget {
            reason: format!("Fairteiler '{}' has no registered location", fairteiler.id),
        });
    };

    if !(radius_meters.is_finite() && radius_meters > 0.0) {
        return Err(FairtrackError::InvalidTarget {
            reason: format!("radius {} is not a positive distance", radius_meters),
        });
    }

    let coordinates =
        Coordinates::new(parse_degrees("latitude", lat)?, parse_degrees("longitude", lng)?);
    Ok(ProximityTarget::new(coordinates, radius_meters))
}

/// Build the proximity target, degrading to "no valid target" on bad data
pub fn target_for(fairteiler: &Fairteiler, radius_meters: f64) -> Option<ProximityTarget> {
    match try_target_for(fairteiler, radius_meters) {
        Ok(target) => Some(target),
        Err(e) => {
            tracing::warn!(fairteiler = %fairteiler.id, error = %e, "No usable proximity target");
            None
        }
    }
}
