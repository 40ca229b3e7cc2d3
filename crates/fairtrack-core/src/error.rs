//! Error types for FairTrack

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FairtrackError {
    // Coordinate errors
    #[error("Invalid coordinate for {field}: {reason}")]
    InvalidCoordinate { field: String, reason: String },

    #[error("No valid Fairteiler location: {reason}")]
    InvalidTarget { reason: String },

    // Tracker errors
    #[error("Location tracker has shut down")]
    TrackerClosed,

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FairtrackError>;
