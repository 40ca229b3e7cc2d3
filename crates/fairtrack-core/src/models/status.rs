//! Acquisition bookkeeping and the externally visible location status.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ErrorKind;

/// Hard cap on automatic position attempts per session
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Where the acquisition controller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionPhase {
    #[default]
    Idle,
    Requesting,
    Succeeded,
    Failed,
}

/// Acquisition state owned by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AcquisitionState {
    pub phase: AcquisitionPhase,
    pub permission_denied: bool,
    pub last_error: Option<ErrorKind>,
}

impl AcquisitionState {
    pub fn is_acquiring(&self) -> bool {
        self.phase == AcquisitionPhase::Requesting
    }

    /// A failure that automatic retries will not recover from
    pub fn terminal_error(&self) -> Option<ErrorKind> {
        if self.phase == AcquisitionPhase::Failed {
            self.last_error
        } else {
            None
        }
    }
}

/// Automatic retry bookkeeping for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    /// Zero-based index of the attempt currently in flight or scheduled
    pub attempt: u32,
    pub max_attempts: u32,
    /// A retry timer is pending
    pub is_retrying: bool,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self { attempt: 0, max_attempts, is_retrying: false }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.max_attempts);
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Outcome of comparing the latest coordinate with the target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ProximityResult {
    /// No coordinate has been resolved yet
    #[default]
    Unknown,
    /// A coordinate exists but there is no valid target to compare it with
    NoTarget,
    InRange { distance_m: f64 },
    OutOfRange { distance_m: f64 },
}

impl ProximityResult {
    pub fn distance_m(&self) -> Option<f64> {
        match self {
            ProximityResult::InRange { distance_m }
            | ProximityResult::OutOfRange { distance_m } => Some(*distance_m),
            ProximityResult::Unknown | ProximityResult::NoTarget => None,
        }
    }

    pub fn is_in_range(&self) -> bool {
        matches!(self, ProximityResult::InRange { .. })
    }
}

/// The single location status the UI gates on.
///
/// Always derived, never assigned. Anything other than `Verified` keeps the
/// contribution form locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LocationStatus {
    #[default]
    Loading,
    Verified,
    TooFar,
    Denied,
    Error,
}

impl LocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationStatus::Loading => "loading",
            LocationStatus::Verified => "verified",
            LocationStatus::TooFar => "too-far",
            LocationStatus::Denied => "denied",
            LocationStatus::Error => "error",
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, LocationStatus::Verified)
    }

    /// Message shown next to the locked or unlocked form
    pub fn user_message(&self, distance_m: Option<f64>) -> String {
        match self {
            LocationStatus::Loading => "Determining your location...".to_string(),
            LocationStatus::Verified => {
                "You are at the Fairteiler. You can record your contribution.".to_string()
            }
            LocationStatus::TooFar => match distance_m {
                Some(d) if d.is_finite() => format!(
                    "You are about {:.0} m away from the Fairteiler. Move closer to record a contribution.",
                    d
                ),
                _ => "You are too far away from the Fairteiler. Move closer to record a contribution."
                    .to_string(),
            },
            LocationStatus::Denied => {
                "Location access is disabled. Enable location permission for this site in your browser or device settings, then try again."
                    .to_string()
            }
            LocationStatus::Error => {
                "Your location could not be determined. Check your connection or GPS and try again."
                    .to_string()
            }
        }
    }
}

impl fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(LocationStatus::TooFar.as_str(), "too-far");
        assert_eq!(serde_json::to_string(&LocationStatus::TooFar).unwrap(), "\"too-far\"");
        assert_eq!(LocationStatus::default(), LocationStatus::Loading);
    }

    #[test]
    fn test_only_verified_unlocks() {
        for status in [
            LocationStatus::Loading,
            LocationStatus::TooFar,
            LocationStatus::Denied,
            LocationStatus::Error,
        ] {
            assert!(!status.is_verified(), "{} must not unlock", status);
        }
        assert!(LocationStatus::Verified.is_verified());
    }

    #[test]
    fn test_too_far_message_mentions_distance() {
        let msg = LocationStatus::TooFar.user_message(Some(49.6));
        assert!(msg.contains("50 m"), "unexpected message: {}", msg);

        let msg = LocationStatus::TooFar.user_message(None);
        assert!(msg.contains("too far"));
    }

    #[test]
    fn test_denied_message_is_actionable() {
        let msg = LocationStatus::Denied.user_message(None);
        assert!(msg.contains("Enable location permission"));
    }

    #[test]
    fn test_retry_state_reset_keeps_cap() {
        let mut retry = RetryState { attempt: 2, max_attempts: 5, is_retrying: true };
        retry.reset();
        assert_eq!(retry, RetryState::new(5));
    }

    #[test]
    fn test_terminal_error_only_when_failed() {
        let state = AcquisitionState {
            phase: AcquisitionPhase::Requesting,
            permission_denied: false,
            last_error: Some(ErrorKind::Timeout),
        };
        assert_eq!(state.terminal_error(), None);

        let state = AcquisitionState { phase: AcquisitionPhase::Failed, ..state };
        assert_eq!(state.terminal_error(), Some(ErrorKind::Timeout));
    }
}
