//! Geographic coordinates and proximity targets.

use serde::{Deserialize, Serialize};

/// System-wide radius (meters) within which a contribution is allowed.
pub const DEFAULT_PROXIMITY_RADIUS_METERS: f64 = 20.0;

/// A WGS 84 position in decimal degrees.
///
/// Readings are replaced, never mutated: every new fix produces a new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Both components are finite and within the WGS 84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// The registered location of a Fairteiler together with the allowed radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityTarget {
    pub coordinates: Coordinates,
    pub radius_meters: f64,
}

impl ProximityTarget {
    pub fn new(coordinates: Coordinates, radius_meters: f64) -> Self {
        Self { coordinates, radius_meters }
    }

    /// Target using [`DEFAULT_PROXIMITY_RADIUS_METERS`]
    pub fn with_default_radius(coordinates: Coordinates) -> Self {
        Self::new(coordinates, DEFAULT_PROXIMITY_RADIUS_METERS)
    }
}
