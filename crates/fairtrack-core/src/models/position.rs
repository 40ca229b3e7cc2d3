//! Position readings, request options, and the classified failure kinds a platform
//! geolocation service reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::Coordinates;

/// A single fix delivered by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReading {
    pub coordinates: Coordinates,
    /// Reported accuracy radius in meters, when the platform provides one
    pub accuracy_m: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionReading {
    pub fn new(coordinates: Coordinates) -> Self {
        Self { coordinates, accuracy_m: None, timestamp: Utc::now() }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }
}

/// Per-request options handed to the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the platform may return instead of a fresh one
    pub maximum_age: Duration,
}

/// Whether a session produces a single reading or keeps watching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    OneShot,
    #[default]
    Continuous,
}

impl TrackingMode {
    pub fn is_continuous(&self) -> bool {
        matches!(self, TrackingMode::Continuous)
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingMode::OneShot => write!(f, "one_shot"),
            TrackingMode::Continuous => write!(f, "continuous"),
        }
    }
}

/// Classified position failure.
///
/// The kinds are kept distinct because the retry policy treats them differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The user refused access to their location
    PermissionDenied,
    /// The device could not resolve a position right now
    PositionUnavailable,
    /// The request exceeded its deadline
    Timeout,
    /// Anything else the platform reported
    Unknown,
}

impl ErrorKind {
    /// Map a W3C geolocation error code (1, 2, 3) to a kind
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => ErrorKind::PermissionDenied,
            2 => ErrorKind::PositionUnavailable,
            3 => ErrorKind::Timeout,
            _ => ErrorKind::Unknown,
        }
    }

    /// Whether the controller may retry this failure on its own
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorKind::PermissionDenied)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::PermissionDenied => write!(f, "permission denied"),
            ErrorKind::PositionUnavailable => write!(f, "position unavailable"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Unknown => write!(f, "unknown error"),
        }
    }
}

/// A failed position request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct PositionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PositionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn permission_denied() -> Self {
        Self::new(ErrorKind::PermissionDenied, "User denied the request for geolocation")
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PositionUnavailable, message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("No position within {} ms", after.as_millis()),
        )
    }
}
