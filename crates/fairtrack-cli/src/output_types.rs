use fairtrack_core::models::{Coordinates, ErrorKind, LocationStatus};
use fairtrack_location::LocationSnapshot;
use serde::Serialize;

/// Output for distance command
#[derive(Debug, Serialize)]
pub struct DistanceOutput {
    pub from: Coordinates,
    pub to: Coordinates,
    pub distance_m: f64,
    pub radius_m: f64,
    pub within_radius: bool,
}

/// Output for check command
#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub position: Coordinates,
    pub target: Coordinates,
    pub radius_m: f64,
    pub distance_m: Option<f64>,
    pub status: LocationStatus,
    pub is_location_verified: bool,
    pub message: String,
}

/// Output for simulate command
#[derive(Debug, Serialize)]
pub struct SimulateOutput {
    pub scenario: String,
    pub timeline: Vec<TimelineEntry>,
    pub final_snapshot: LocationSnapshot,
    pub requests: Vec<RequestInfo>,
}

/// One line of a simulation timeline
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub at_ms: u64,
    pub kind: TimelineKind,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LocationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    Action,
    Event,
    Status,
}

/// Options the tracker passed to the simulated device
#[derive(Debug, Serialize)]
pub struct RequestInfo {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

/// Output for config command
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub entries: Vec<ConfigEntry>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: String,
}
