//! Derivation of the externally visible location status.

use fairtrack_core::models::{
    AcquisitionState, Coordinates, ErrorKind, LocationStatus, ProximityResult, ProximityTarget,
    RetryState,
};
use fairtrack_geo::evaluate_proximity;
use serde::Serialize;

use crate::controller::AcquisitionController;

/// Map controller state and proximity to a status. First matching rule wins:
///
/// 1. tracking never enabled → `Denied`
/// 2. acquiring or waiting on a retry → `Loading`
/// 3. permission refused → `Denied`
/// 4. any other terminal failure → `Error`
/// 5. coordinate known → `Verified` in range, otherwise `TooFar`
/// 6. otherwise → `Loading`
pub fn derive_status(
    acquisition: &AcquisitionState,
    retry: &RetryState,
    proximity: &ProximityResult,
    tracking_enabled: bool,
) -> LocationStatus {
    if !tracking_enabled {
        return LocationStatus::Denied;
    }

    if acquisition.is_acquiring() || retry.is_retrying {
        return LocationStatus::Loading;
    }

    if acquisition.permission_denied
        || acquisition.terminal_error() == Some(ErrorKind::PermissionDenied)
    {
        return LocationStatus::Denied;
    }

    if acquisition.terminal_error().is_some() {
        return LocationStatus::Error;
    }

    match proximity {
        ProximityResult::InRange { .. } => LocationStatus::Verified,
        ProximityResult::OutOfRange { .. } | ProximityResult::NoTarget => LocationStatus::TooFar,
        ProximityResult::Unknown => LocationStatus::Loading,
    }
}

/// Everything the form and map UI read from the gate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSnapshot {
    pub status: LocationStatus,
    pub coordinates: Option<Coordinates>,
    pub accuracy_m: Option<f64>,
    pub distance_m: Option<f64>,
    pub is_location_verified: bool,
    pub tracking_enabled: bool,
    pub has_target: bool,
    pub show_loading_indicator: bool,
    pub attempt: u32,
    pub last_error: Option<ErrorKind>,
    pub message: String,
}

impl LocationSnapshot {
    /// Snapshot before the tracker has done anything
    pub fn initial(tracking_enabled: bool) -> Self {
        let status = derive_status(
            &AcquisitionState::default(),
            &RetryState::default(),
            &ProximityResult::Unknown,
            tracking_enabled,
        );
        Self {
            status,
            coordinates: None,
            accuracy_m: None,
            distance_m: None,
            is_location_verified: false,
            tracking_enabled,
            has_target: false,
            show_loading_indicator: false,
            attempt: 0,
            last_error: None,
            message: status.user_message(None),
        }
    }

    pub fn capture(
        controller: &AcquisitionController,
        target: Option<&ProximityTarget>,
        tracking_enabled: bool,
    ) -> Self {
        let proximity = evaluate_proximity(controller.coordinates(), target);
        let status = derive_status(
            controller.acquisition(),
            controller.retry(),
            &proximity,
            tracking_enabled,
        );
        let distance_m = proximity.distance_m();
        let reading = controller.reading();

        Self {
            status,
            coordinates: reading.map(|r| r.coordinates),
            accuracy_m: reading.and_then(|r| r.accuracy_m),
            distance_m,
            is_location_verified: status.is_verified(),
            tracking_enabled,
            has_target: target.is_some(),
            show_loading_indicator: status == LocationStatus::Loading
                && controller.loading_indicator_visible(),
            attempt: controller.retry().attempt,
            last_error: controller.acquisition().last_error,
            message: status.user_message(distance_m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairtrack_core::models::AcquisitionPhase;
    use proptest::prelude::*;

    fn state(phase: AcquisitionPhase, last_error: Option<ErrorKind>) -> AcquisitionState {
        AcquisitionState {
            phase,
            permission_denied: last_error == Some(ErrorKind::PermissionDenied),
            last_error,
        }
    }

    fn idle_retry() -> RetryState {
        RetryState::default()
    }

    const IN_RANGE: ProximityResult = ProximityResult::InRange { distance_m: 15.0 };
    const OUT_OF_RANGE: ProximityResult = ProximityResult::OutOfRange { distance_m: 50.0 };

    #[test]
    fn test_tracking_disabled_reads_as_denied() {
        let status = derive_status(
            &state(AcquisitionPhase::Succeeded, None),
            &idle_retry(),
            &IN_RANGE,
            false,
        );
        assert_eq!(status, LocationStatus::Denied);
    }

    #[test]
    fn test_acquiring_is_loading_even_with_old_fix() {
        let status = derive_status(
            &state(AcquisitionPhase::Requesting, None),
            &idle_retry(),
            &IN_RANGE,
            true,
        );
        assert_eq!(status, LocationStatus::Loading);
    }

    #[test]
    fn test_mid_retry_is_loading() {
        let retry = RetryState { attempt: 1, max_attempts: 3, is_retrying: true };
        let status = derive_status(
            &state(AcquisitionPhase::Requesting, Some(ErrorKind::Timeout)),
            &retry,
            &ProximityResult::Unknown,
            true,
        );
        assert_eq!(status, LocationStatus::Loading);
    }

    #[test]
    fn test_terminal_errors() {
        let denied = derive_status(
            &state(AcquisitionPhase::Failed, Some(ErrorKind::PermissionDenied)),
            &idle_retry(),
            &ProximityResult::Unknown,
            true,
        );
        assert_eq!(denied, LocationStatus::Denied);

        for kind in [ErrorKind::Timeout, ErrorKind::PositionUnavailable, ErrorKind::Unknown] {
            let status = derive_status(
                &state(AcquisitionPhase::Failed, Some(kind)),
                &idle_retry(),
                &IN_RANGE,
                true,
            );
            assert_eq!(status, LocationStatus::Error, "{:?} should surface as error", kind);
        }
    }

    #[test]
    fn test_proximity_outcomes() {
        let ok = state(AcquisitionPhase::Succeeded, None);
        assert_eq!(derive_status(&ok, &idle_retry(), &IN_RANGE, true), LocationStatus::Verified);
        assert_eq!(derive_status(&ok, &idle_retry(), &OUT_OF_RANGE, true), LocationStatus::TooFar);
        assert_eq!(
            derive_status(&ok, &idle_retry(), &ProximityResult::NoTarget, true),
            LocationStatus::TooFar
        );
    }

    #[test]
    fn test_default_is_loading() {
        let status = derive_status(
            &AcquisitionState::default(),
            &idle_retry(),
            &ProximityResult::Unknown,
            true,
        );
        assert_eq!(status, LocationStatus::Loading);
    }

    #[test]
    fn test_initial_snapshot() {
        let snapshot = LocationSnapshot::initial(false);
        assert_eq!(snapshot.status, LocationStatus::Denied);
        assert!(!snapshot.is_location_verified);

        let snapshot = LocationSnapshot::initial(true);
        assert_eq!(snapshot.status, LocationStatus::Loading);
    }

    fn phases() -> impl Strategy<Value = AcquisitionPhase> {
        prop_oneof![
            Just(AcquisitionPhase::Idle),
            Just(AcquisitionPhase::Requesting),
            Just(AcquisitionPhase::Succeeded),
            Just(AcquisitionPhase::Failed),
        ]
    }

    fn errors() -> impl Strategy<Value = Option<ErrorKind>> {
        prop_oneof![
            Just(None),
            Just(Some(ErrorKind::PermissionDenied)),
            Just(Some(ErrorKind::PositionUnavailable)),
            Just(Some(ErrorKind::Timeout)),
            Just(Some(ErrorKind::Unknown)),
        ]
    }

    fn proximities() -> impl Strategy<Value = ProximityResult> {
        prop_oneof![
            Just(ProximityResult::Unknown),
            Just(ProximityResult::NoTarget),
            (0.0f64..20.0).prop_map(|d| ProximityResult::InRange { distance_m: d }),
            (20.0f64..10_000.0).prop_map(|d| ProximityResult::OutOfRange { distance_m: d }),
        ]
    }

    proptest! {
        #[test]
        fn prop_derivation_is_pure(
            phase in phases(),
            last_error in errors(),
            attempt in 0u32..3,
            is_retrying in any::<bool>(),
            proximity in proximities(),
            tracking_enabled in any::<bool>(),
        ) {
            let acquisition = state(phase, last_error);
            let retry = RetryState { attempt, max_attempts: 3, is_retrying };

            let first = derive_status(&acquisition, &retry, &proximity, tracking_enabled);
            let second = derive_status(&acquisition, &retry, &proximity, tracking_enabled);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_only_in_range_unlocks(
            phase in phases(),
            last_error in errors(),
            is_retrying in any::<bool>(),
            proximity in proximities(),
            tracking_enabled in any::<bool>(),
        ) {
            let acquisition = state(phase, last_error);
            let retry = RetryState { attempt: 0, max_attempts: 3, is_retrying };

            let status = derive_status(&acquisition, &retry, &proximity, tracking_enabled);
            if status.is_verified() {
                prop_assert!(tracking_enabled);
                prop_assert!(proximity.is_in_range());
            }
        }
    }
}
