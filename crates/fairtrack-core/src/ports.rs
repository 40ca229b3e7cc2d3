//! Port trait definitions
//!
//! These traits define the interfaces that platform adapters must implement.

pub mod geolocation;

pub use geolocation::{GeolocationProvider, PositionStream};
