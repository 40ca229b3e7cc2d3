//! Acquisition state machine.
//!
//! The controller never performs I/O. Every operation takes the current state plus
//! one input and returns the [`Effect`]s the driver must carry out (subscribe to
//! the platform, arm or clear a timer, publish an event). This keeps the retry and
//! cancellation rules testable without a device or a clock.

use std::time::Duration;

use fairtrack_core::models::{
    AcquisitionPhase, AcquisitionState, Coordinates, ErrorKind, PositionError, PositionOptions,
    PositionReading, RetryState, TrackingMode,
};
use serde::Serialize;

use crate::policy::RetryPolicy;

/// Identifies one acquisition session.
///
/// Bumped on every start and stop; inputs tagged with an older generation are
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

/// Timers owned by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Retry,
    /// Delays showing a spinner so fast fixes never flash one
    LoadingIndicator,
}

/// Events published to consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackingEvent {
    TrackingStarted { mode: TrackingMode },
    Position { coordinates: Coordinates },
    Error { kind: ErrorKind, message: String },
    TrackingEnded,
}

/// Work the driver performs on behalf of the controller
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Request a position (one-shot) or start a watch (continuous)
    Subscribe { generation: Generation, mode: TrackingMode, options: PositionOptions },
    /// Drop the platform subscription, if any
    Unsubscribe,
    StartTimer { generation: Generation, kind: TimerKind, delay: Duration },
    CancelTimer(TimerKind),
    Emit(TrackingEvent),
}

#[derive(Debug)]
pub struct AcquisitionController {
    policy: RetryPolicy,
    loading_indicator_delay: Duration,
    mode: TrackingMode,
    generation: Generation,
    active: bool,
    acquisition: AcquisitionState,
    retry: RetryState,
    reading: Option<PositionReading>,
    retry_timer_armed: bool,
    loading_timer_armed: bool,
    loading_indicator: bool,
}

impl AcquisitionController {
    pub fn new(
        policy: RetryPolicy,
        mode: TrackingMode,
        loading_indicator_delay: Duration,
    ) -> Self {
        Self {
            retry: policy.initial_state(),
            policy,
            loading_indicator_delay,
            mode,
            generation: Generation::default(),
            active: false,
            acquisition: AcquisitionState::default(),
            reading: None,
            retry_timer_armed: false,
            loading_timer_armed: false,
            loading_indicator: false,
        }
    }

    pub fn acquisition(&self) -> &AcquisitionState {
        &self.acquisition
    }

    pub fn retry(&self) -> &RetryState {
        &self.retry
    }

    pub fn reading(&self) -> Option<&PositionReading> {
        self.reading.as_ref()
    }

    pub fn coordinates(&self) -> Option<&Coordinates> {
        self.reading.as_ref().map(|r| &r.coordinates)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    /// A session is running (subscribed or waiting on a retry)
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn loading_indicator_visible(&self) -> bool {
        self.loading_indicator
    }

    /// Begin a new session, stopping any session already running
    pub fn start(&mut self, mode: TrackingMode) -> Vec<Effect> {
        let mut effects = self.stop();

        self.generation = self.generation.next();
        self.mode = mode;
        self.active = true;
        self.acquisition = AcquisitionState {
            phase: AcquisitionPhase::Requesting,
            permission_denied: false,
            last_error: None,
        };

        tracing::info!(generation = self.generation.0, %mode, "Location tracking started");

        effects.push(Effect::Emit(TrackingEvent::TrackingStarted { mode }));
        effects.push(self.subscribe());
        self.arm_loading_indicator(&mut effects);
        effects
    }

    /// Manual "try again": a fresh session from attempt zero in the current mode
    pub fn request_location(&mut self) -> Vec<Effect> {
        tracing::info!(generation = self.generation.0, "Location requested by user");
        self.start(self.mode)
    }

    /// Cancel the session and return to idle. Idempotent.
    pub fn stop(&mut self) -> Vec<Effect> {
        if !self.active {
            // Finished sessions keep their outcome until stopped; stopping again is a no-op.
            self.reset_to_idle();
            return Vec::new();
        }

        let mut effects = vec![Effect::Unsubscribe];
        self.clear_timers(&mut effects);
        effects.push(Effect::Emit(TrackingEvent::TrackingEnded));

        // Anything still in flight for the old session is now stale.
        self.generation = self.generation.next();
        self.reset_to_idle();

        tracing::info!(generation = self.generation.0, "Location tracking stopped");
        effects
    }

    /// Apply a successful reading
    pub fn handle_position(
        &mut self,
        generation: Generation,
        reading: PositionReading,
    ) -> Vec<Effect> {
        if !self.accepts_provider(generation) {
            return Vec::new();
        }

        if !reading.coordinates.is_valid() {
            return self.handle_error(
                generation,
                PositionError::unavailable(format!(
                    "Platform returned unusable coordinates ({})",
                    reading.coordinates
                )),
            );
        }

        let mut effects = Vec::new();
        self.cancel_loading_indicator(&mut effects);

        let coordinates = reading.coordinates;
        self.reading = Some(reading);
        self.acquisition = AcquisitionState {
            phase: AcquisitionPhase::Succeeded,
            permission_denied: false,
            last_error: None,
        };
        self.retry.reset();

        tracing::debug!(generation = generation.0, "Position fix received");
        effects.push(Effect::Emit(TrackingEvent::Position { coordinates }));

        if !self.mode.is_continuous() {
            self.active = false;
            effects.push(Effect::Unsubscribe);
            effects.push(Effect::Emit(TrackingEvent::TrackingEnded));
        }

        effects
    }

    /// Apply a failed request, retrying where the policy allows
    pub fn handle_error(&mut self, generation: Generation, error: PositionError) -> Vec<Effect> {
        if !self.accepts_provider(generation) {
            return Vec::new();
        }

        let mut effects = vec![Effect::Unsubscribe];

        if error.kind.is_retryable() {
            if let Some(next) = self.policy.next_attempt(&self.retry) {
                let delay = self.policy.retry_delay(next);
                tracing::warn!(
                    generation = generation.0,
                    kind = %error.kind,
                    attempt = next,
                    max_attempts = self.policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Position request failed, retrying"
                );

                self.retry.attempt = next;
                self.retry.is_retrying = true;
                self.acquisition.phase = AcquisitionPhase::Requesting;
                self.acquisition.last_error = Some(error.kind);

                self.retry_timer_armed = true;
                effects.push(Effect::StartTimer {
                    generation: self.generation,
                    kind: TimerKind::Retry,
                    delay,
                });
                if !self.loading_indicator {
                    self.arm_loading_indicator(&mut effects);
                }
                return effects;
            }
        }

        // Terminal: permission refused or attempts exhausted.
        tracing::warn!(
            generation = generation.0,
            kind = %error.kind,
            attempt = self.retry.attempt,
            "Position acquisition failed"
        );

        self.clear_timers(&mut effects);
        self.active = false;
        self.retry.is_retrying = false;
        self.acquisition = AcquisitionState {
            phase: AcquisitionPhase::Failed,
            permission_denied: error.kind == ErrorKind::PermissionDenied,
            last_error: Some(error.kind),
        };

        effects.push(Effect::Emit(TrackingEvent::Error {
            kind: error.kind,
            message: error.message,
        }));
        effects.push(Effect::Emit(TrackingEvent::TrackingEnded));
        effects
    }

    /// Apply an expired timer
    pub fn handle_timer(&mut self, generation: Generation, kind: TimerKind) -> Vec<Effect> {
        if !self.accepts(generation) {
            return Vec::new();
        }

        match kind {
            TimerKind::Retry => {
                if !self.retry_timer_armed {
                    return Vec::new();
                }
                self.retry_timer_armed = false;
                self.retry.is_retrying = false;
                tracing::debug!(
                    generation = generation.0,
                    attempt = self.retry.attempt,
                    "Retrying position request"
                );
                vec![self.subscribe()]
            }
            TimerKind::LoadingIndicator => {
                if !self.loading_timer_armed {
                    return Vec::new();
                }
                self.loading_timer_armed = false;
                if self.acquisition.is_acquiring() || self.retry.is_retrying {
                    tracing::debug!(generation = generation.0, "Showing loading indicator");
                    self.loading_indicator = true;
                }
                Vec::new()
            }
        }
    }

    fn accepts(&self, generation: Generation) -> bool {
        if self.active && generation == self.generation {
            true
        } else {
            tracing::debug!(
                stale = generation.0,
                current = self.generation.0,
                "Dropping input from a superseded session"
            );
            false
        }
    }

    /// Provider output is only live while a subscription exists. While a retry is
    /// pending the previous subscription has been torn down, so anything it queued
    /// before teardown is dropped.
    fn accepts_provider(&self, generation: Generation) -> bool {
        if !self.accepts(generation) {
            return false;
        }
        if self.retry_timer_armed {
            tracing::debug!(
                generation = generation.0,
                "Dropping provider output received while a retry is pending"
            );
            return false;
        }
        true
    }

    fn subscribe(&self) -> Effect {
        Effect::Subscribe {
            generation: self.generation,
            mode: self.mode,
            options: self.policy.options_for(self.retry.attempt),
        }
    }

    fn arm_loading_indicator(&mut self, effects: &mut Vec<Effect>) {
        if self.loading_timer_armed {
            return;
        }
        self.loading_timer_armed = true;
        effects.push(Effect::StartTimer {
            generation: self.generation,
            kind: TimerKind::LoadingIndicator,
            delay: self.loading_indicator_delay,
        });
    }

    fn cancel_loading_indicator(&mut self, effects: &mut Vec<Effect>) {
        if self.loading_timer_armed {
            self.loading_timer_armed = false;
            effects.push(Effect::CancelTimer(TimerKind::LoadingIndicator));
        }
        self.loading_indicator = false;
    }

    fn clear_timers(&mut self, effects: &mut Vec<Effect>) {
        if self.retry_timer_armed {
            self.retry_timer_armed = false;
            effects.push(Effect::CancelTimer(TimerKind::Retry));
        }
        self.cancel_loading_indicator(effects);
    }

    fn reset_to_idle(&mut self) {
        self.active = false;
        self.acquisition = AcquisitionState::default();
        self.retry.reset();
        self.reading = None;
        self.retry_timer_armed = false;
        self.loading_timer_armed = false;
        self.loading_indicator = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOADING_DELAY: Duration = Duration::from_millis(300);

    fn controller() -> AcquisitionController {
        AcquisitionController::new(RetryPolicy::default(), TrackingMode::Continuous, LOADING_DELAY)
    }

    fn fix(lat: f64, lng: f64) -> PositionReading {
        PositionReading::new(Coordinates::new(lat, lng))
    }

    fn timeout() -> PositionError {
        PositionError::timeout(Duration::from_secs(10))
    }

    fn emitted(effects: &[Effect]) -> Vec<&TrackingEvent> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Emit(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    fn subscriptions(effects: &[Effect]) -> Vec<PositionOptions> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Subscribe { options, .. } => Some(*options),
                _ => None,
            })
            .collect()
    }

    fn retry_delay(effects: &[Effect]) -> Option<Duration> {
        effects.iter().find_map(|e| match e {
            Effect::StartTimer { kind: TimerKind::Retry, delay, .. } => Some(*delay),
            _ => None,
        })
    }

    #[test]
    fn test_start_subscribes_with_first_attempt_options() {
        let mut c = controller();
        let effects = c.start(TrackingMode::Continuous);

        assert!(c.is_active());
        assert_eq!(c.acquisition().phase, AcquisitionPhase::Requesting);
        assert_eq!(
            emitted(&effects),
            vec![&TrackingEvent::TrackingStarted { mode: TrackingMode::Continuous }]
        );

        let options = subscriptions(&effects);
        assert_eq!(options.len(), 1);
        assert!(options[0].enable_high_accuracy);
        assert_eq!(options[0].timeout, Duration::from_secs(10));

        assert!(effects.contains(&Effect::StartTimer {
            generation: c.generation(),
            kind: TimerKind::LoadingIndicator,
            delay: LOADING_DELAY,
        }));
    }

    #[test]
    fn test_position_resets_retry_and_clears_loading_timer() {
        let mut c = controller();
        c.start(TrackingMode::Continuous);
        let generation = c.generation();
        c.handle_error(generation, timeout());
        assert_eq!(c.retry().attempt, 1);

        c.handle_timer(generation, TimerKind::Retry);
        let effects = c.handle_position(generation, fix(48.7691, 9.1610));

        assert_eq!(c.acquisition().phase, AcquisitionPhase::Succeeded);
        assert_eq!(c.acquisition().last_error, None);
        assert_eq!(*c.retry(), RetryState::new(3));
        assert!(effects.contains(&Effect::CancelTimer(TimerKind::LoadingIndicator)));
        assert_eq!(
            emitted(&effects),
            vec![&TrackingEvent::Position { coordinates: Coordinates::new(48.7691, 9.1610) }]
        );
        // Continuous sessions keep running after a fix.
        assert!(c.is_active());
    }

    #[test]
    fn test_one_shot_ends_after_fix() {
        let mut c = controller();
        c.start(TrackingMode::OneShot);
        let effects = c.handle_position(c.generation(), fix(48.7691, 9.1610));

        assert!(!c.is_active());
        assert!(effects.contains(&Effect::Unsubscribe));
        assert_eq!(emitted(&effects).last(), Some(&&TrackingEvent::TrackingEnded));
        assert!(c.coordinates().is_some());
    }

    #[test]
    fn test_retry_schedule_and_exhaustion() {
        let mut c = controller();
        c.start(TrackingMode::OneShot);
        let generation = c.generation();

        // First failure: retry after 2s, error suppressed.
        let effects = c.handle_error(generation, timeout());
        assert_eq!(retry_delay(&effects), Some(Duration::from_millis(2_000)));
        assert!(emitted(&effects).is_empty());
        assert!(c.retry().is_retrying);
        assert_eq!(c.acquisition().phase, AcquisitionPhase::Requesting);

        let effects = c.handle_timer(generation, TimerKind::Retry);
        let options = subscriptions(&effects);
        assert!(options[0].enable_high_accuracy);
        assert_eq!(options[0].timeout, Duration::from_secs(15));

        // Second failure: retry after 5s with relaxed accuracy.
        let effects = c.handle_error(generation, timeout());
        assert_eq!(retry_delay(&effects), Some(Duration::from_millis(5_000)));
        let effects = c.handle_timer(generation, TimerKind::Retry);
        let options = subscriptions(&effects);
        assert!(!options[0].enable_high_accuracy);
        assert_eq!(options[0].timeout, Duration::from_secs(20));

        // Third failure is terminal.
        let effects = c.handle_error(generation, timeout());
        assert_eq!(retry_delay(&effects), None);
        assert!(subscriptions(&effects).is_empty());
        assert_eq!(c.acquisition().phase, AcquisitionPhase::Failed);
        assert_eq!(c.acquisition().last_error, Some(ErrorKind::Timeout));
        assert!(!c.is_active());
        assert!(matches!(
            emitted(&effects)[0],
            TrackingEvent::Error { kind: ErrorKind::Timeout, .. }
        ));

        // A fourth error without a manual request goes nowhere.
        assert!(c.handle_error(generation, timeout()).is_empty());
        assert!(c.handle_timer(generation, TimerKind::Retry).is_empty());
    }

    #[test]
    fn test_permission_denied_is_never_retried() {
        for attempt_before in 0..2 {
            let mut c = controller();
            c.start(TrackingMode::Continuous);
            let generation = c.generation();
            for _ in 0..attempt_before {
                c.handle_error(generation, timeout());
                c.handle_timer(generation, TimerKind::Retry);
            }

            let effects = c.handle_error(generation, PositionError::permission_denied());

            assert_eq!(retry_delay(&effects), None);
            assert!(subscriptions(&effects).is_empty());
            assert!(c.acquisition().permission_denied);
            assert_eq!(c.acquisition().phase, AcquisitionPhase::Failed);
            assert!(!c.retry().is_retrying);
        }
    }

    #[test]
    fn test_manual_request_restarts_from_zero() {
        let mut c = controller();
        c.start(TrackingMode::OneShot);
        let generation = c.generation();
        for _ in 0..3 {
            c.handle_error(generation, timeout());
            c.handle_timer(generation, TimerKind::Retry);
        }
        assert_eq!(c.acquisition().phase, AcquisitionPhase::Failed);

        let effects = c.request_location();

        assert!(c.generation() > generation);
        assert_eq!(c.retry().attempt, 0);
        assert_eq!(c.acquisition().phase, AcquisitionPhase::Requesting);
        assert_eq!(c.mode(), TrackingMode::OneShot);
        assert_eq!(subscriptions(&effects)[0].timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut c = controller();
        c.start(TrackingMode::Continuous);
        c.handle_error(c.generation(), timeout());

        let effects = c.stop();
        assert!(effects.contains(&Effect::Unsubscribe));
        assert!(effects.contains(&Effect::CancelTimer(TimerKind::Retry)));
        assert!(effects.contains(&Effect::CancelTimer(TimerKind::LoadingIndicator)));
        assert_eq!(emitted(&effects), vec![&TrackingEvent::TrackingEnded]);

        let generation = c.generation();
        let acquisition = *c.acquisition();
        let retry = *c.retry();

        assert!(c.stop().is_empty());
        assert_eq!(c.generation(), generation);
        assert_eq!(*c.acquisition(), acquisition);
        assert_eq!(*c.retry(), retry);
        assert_eq!(acquisition, AcquisitionState::default());
        assert!(!retry.is_retrying);
    }

    #[test]
    fn test_late_inputs_after_stop_are_ignored() {
        let mut c = controller();
        c.start(TrackingMode::Continuous);
        let old = c.generation();
        c.stop();

        assert!(c.handle_position(old, fix(48.7691, 9.1610)).is_empty());
        assert!(c.handle_error(old, PositionError::permission_denied()).is_empty());
        assert!(c.handle_timer(old, TimerKind::LoadingIndicator).is_empty());
        assert!(c.coordinates().is_none());
        assert_eq!(c.acquisition().phase, AcquisitionPhase::Idle);
    }

    #[test]
    fn test_restart_supersedes_previous_session() {
        let mut c = controller();
        c.start(TrackingMode::Continuous);
        let first = c.generation();

        let effects = c.start(TrackingMode::Continuous);
        assert!(effects.contains(&Effect::Unsubscribe));
        assert_eq!(
            emitted(&effects),
            vec![
                &TrackingEvent::TrackingEnded,
                &TrackingEvent::TrackingStarted { mode: TrackingMode::Continuous }
            ]
        );

        assert!(c.handle_position(first, fix(1.0, 1.0)).is_empty());
        assert!(c.coordinates().is_none());
    }

    #[test]
    fn test_invalid_reading_counts_as_unavailable() {
        let mut c = controller();
        c.start(TrackingMode::Continuous);
        let effects = c.handle_position(c.generation(), fix(f64::NAN, 9.0));

        assert!(c.coordinates().is_none());
        assert_eq!(c.acquisition().last_error, Some(ErrorKind::PositionUnavailable));
        assert_eq!(retry_delay(&effects), Some(Duration::from_millis(2_000)));
    }

    #[test]
    fn test_loading_indicator_after_delay() {
        let mut c = controller();
        c.start(TrackingMode::Continuous);
        assert!(!c.loading_indicator_visible());

        c.handle_timer(c.generation(), TimerKind::LoadingIndicator);
        assert!(c.loading_indicator_visible());

        c.handle_position(c.generation(), fix(48.7691, 9.1610));
        assert!(!c.loading_indicator_visible());
    }

    #[test]
    fn test_output_queued_before_retry_teardown_is_dropped() {
        let mut c = controller();
        c.start(TrackingMode::Continuous);
        let generation = c.generation();
        c.handle_error(generation, timeout());

        assert!(c.handle_position(generation, fix(48.7691, 9.1610)).is_empty());
        assert!(c.handle_error(generation, PositionError::permission_denied()).is_empty());
        assert!(c.coordinates().is_none());
        assert!(c.retry().is_retrying);

        // Once the retry has resubscribed, output is live again.
        c.handle_timer(generation, TimerKind::Retry);
        assert!(!c.handle_position(generation, fix(48.7691, 9.1610)).is_empty());
        assert!(c.coordinates().is_some());
    }

    #[test]
    fn test_request_location_uses_configured_mode() {
        let mut c = AcquisitionController::new(
            RetryPolicy::default(),
            TrackingMode::OneShot,
            LOADING_DELAY,
        );
        let effects = c.request_location();
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Subscribe { mode: TrackingMode::OneShot, .. }
        )));
    }

    #[test]
    fn test_continuous_error_after_fix_keeps_last_coordinate() {
        let mut c = controller();
        c.start(TrackingMode::Continuous);
        let generation = c.generation();
        c.handle_position(generation, fix(48.7691, 9.1610));

        c.handle_error(generation, PositionError::unavailable("signal lost"));

        assert!(c.coordinates().is_some());
        assert!(c.retry().is_retrying);
        assert_eq!(c.acquisition().phase, AcquisitionPhase::Requesting);
    }
}
