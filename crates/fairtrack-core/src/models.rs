pub mod coordinates;
pub mod fairteiler;
pub mod position;
pub mod status;

pub use coordinates::{Coordinates, ProximityTarget, DEFAULT_PROXIMITY_RADIUS_METERS};
pub use fairteiler::Fairteiler;
pub use position::{ErrorKind, PositionError, PositionOptions, PositionReading, TrackingMode};
pub use status::{
    AcquisitionPhase, AcquisitionState, LocationStatus, ProximityResult, RetryState,
    DEFAULT_MAX_ATTEMPTS,
};
