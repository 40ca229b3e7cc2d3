//! FairTrack Location - Position acquisition and the contribution gate
//!
//! This crate turns a platform geolocation service into a single derived
//! [`LocationStatus`](fairtrack_core::models::LocationStatus) that decides whether
//! the donation form is unlocked.

pub mod context;
pub mod controller;
pub mod derive;
pub mod policy;
pub mod simulated;
pub mod tracker;

// Re-export main types
pub use context::ContributionContext;
pub use controller::{AcquisitionController, Effect, Generation, TimerKind, TrackingEvent};
pub use derive::{derive_status, LocationSnapshot};
pub use policy::RetryPolicy;
pub use simulated::{SimulatedOutcome, SimulatedProvider, SimulatedStep};
pub use tracker::{LocationTracker, TrackerSettings};
