//! FairTrack Core - Domain models, configuration, and ports
//!
//! This crate contains the location-gating domain model and the port a platform
//! geolocation adapter must implement.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use error::{FairtrackError, Result};
