//! FairTrack Geo - Coordinate math and proximity evaluation
//!
//! Great-circle distances, radius checks, and turning raw Fairteiler records into
//! proximity targets.

pub mod proximity;
pub mod spatial;
pub mod target;

pub use proximity::evaluate_proximity;
pub use spatial::{distance_meters, is_within_radius};
pub use target::{parse_coordinates, parse_degrees, target_for, try_target_for};
