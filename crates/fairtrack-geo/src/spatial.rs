use fairtrack_core::models::Coordinates;
use geo::{Distance, Haversine, Point};

fn to_point(c: &Coordinates) -> Point {
    Point::new(c.longitude, c.latitude)
}

/// Great-circle distance between two coordinates in meters (haversine).
///
/// Symmetric and zero for identical inputs. Non-finite input yields NaN rather
/// than an error.
pub fn distance_meters(a: &Coordinates, b: &Coordinates) -> f64 {
    Haversine.distance(to_point(a), to_point(b))
}

/// Whether `point` lies within `radius_meters` of `target`, boundary inclusive.
///
/// A NaN distance or radius compares false, so invalid input is never in range.
pub fn is_within_radius(point: &Coordinates, target: &Coordinates, radius_meters: f64) -> bool {
    distance_meters(point, target) <= radius_meters
}
