//! Async driver for the acquisition controller.
//!
//! One tokio task owns the controller and applies every input in order, so no
//! state is shared across threads. Provider calls and timers run as child tasks
//! that report back over a channel; their handles are owned by the session and
//! aborted on stop, on terminal failure, and when the tracker is dropped.

use std::sync::Arc;
use std::time::Duration;

use fairtrack_core::config::LayeredConfig;
use fairtrack_core::models::{
    ErrorKind, PositionError, PositionOptions, PositionReading, ProximityTarget, TrackingMode,
    DEFAULT_PROXIMITY_RADIUS_METERS,
};
use fairtrack_core::ports::GeolocationProvider;
use futures::StreamExt;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;

use crate::context::ContributionContext;
use crate::controller::{AcquisitionController, Effect, Generation, TimerKind, TrackingEvent};
use crate::derive::LocationSnapshot;
use crate::policy::RetryPolicy;

const EVENT_CAPACITY: usize = 64;

/// Settings for one tracker instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSettings {
    pub policy: RetryPolicy,
    pub mode: TrackingMode,
    pub proximity_radius_m: f64,
    pub loading_indicator_delay: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            mode: TrackingMode::Continuous,
            proximity_radius_m: DEFAULT_PROXIMITY_RADIUS_METERS,
            loading_indicator_delay: Duration::from_millis(300),
        }
    }
}

impl TrackerSettings {
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self {
            policy: RetryPolicy::from_config(config),
            mode: config.tracking_mode.value,
            proximity_radius_m: config.proximity_radius_m.value,
            loading_indicator_delay: Duration::from_millis(config.loading_indicator_delay_ms.value),
        }
    }
}

/// Requests from the consumption surface
#[derive(Debug)]
pub(crate) enum Command {
    EnableTracking(Option<TrackingMode>),
    DisableTracking,
    RequestLocation,
    SetTarget(Option<ProximityTarget>),
}

/// Output of child tasks, tagged with the session that spawned them
#[derive(Debug)]
enum Signal {
    Position { generation: Generation, result: Result<PositionReading, PositionError> },
    Timer { generation: Generation, kind: TimerKind },
}

/// Handles owned by the running session
#[derive(Default)]
struct SessionResources {
    subscription: Option<JoinHandle<()>>,
    retry_timer: Option<JoinHandle<()>>,
    loading_timer: Option<JoinHandle<()>>,
}

impl SessionResources {
    fn timer_slot(&mut self, kind: TimerKind) -> &mut Option<JoinHandle<()>> {
        match kind {
            TimerKind::Retry => &mut self.retry_timer,
            TimerKind::LoadingIndicator => &mut self.loading_timer,
        }
    }

    fn set_subscription(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.subscription.replace(handle) {
            previous.abort();
        }
    }

    fn cancel_subscription(&mut self) {
        if let Some(handle) = self.subscription.take() {
            handle.abort();
        }
    }

    fn set_timer(&mut self, kind: TimerKind, handle: JoinHandle<()>) {
        if let Some(previous) = self.timer_slot(kind).replace(handle) {
            previous.abort();
        }
    }

    fn cancel_timer(&mut self, kind: TimerKind) {
        if let Some(handle) = self.timer_slot(kind).take() {
            handle.abort();
        }
    }

    fn release_all(&mut self) {
        self.cancel_subscription();
        self.cancel_timer(TimerKind::Retry);
        self.cancel_timer(TimerKind::LoadingIndicator);
    }
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// The task that owns an [`AcquisitionController`] and the session handles
pub struct LocationTracker {
    controller: AcquisitionController,
    provider: Arc<dyn GeolocationProvider>,
    target: Option<ProximityTarget>,
    tracking_enabled: bool,
    resources: SessionResources,
    signals: mpsc::UnboundedSender<Signal>,
    snapshot: watch::Sender<LocationSnapshot>,
    events: broadcast::Sender<TrackingEvent>,
}

impl LocationTracker {
    /// Spawn a tracker on the current runtime and return its consumption surface.
    ///
    /// Tracking starts disabled; the tracker stops once the context is dropped.
    pub fn spawn(
        provider: Arc<dyn GeolocationProvider>,
        settings: TrackerSettings,
    ) -> ContributionContext {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(LocationSnapshot::initial(false));
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let tracker = Self {
            controller: AcquisitionController::new(
                settings.policy,
                settings.mode,
                settings.loading_indicator_delay,
            ),
            provider,
            target: None,
            tracking_enabled: false,
            resources: SessionResources::default(),
            signals: signal_tx,
            snapshot: snapshot_tx,
            events: events_tx.clone(),
        };

        let task = tokio::spawn(tracker.run(command_rx, signal_rx));
        ContributionContext::new(command_tx, snapshot_rx, events_tx, settings, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut signals: mpsc::UnboundedReceiver<Signal>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(signal) = signals.recv() => self.handle_signal(signal),
            }
            self.publish();
        }

        tracing::debug!("Contribution context dropped, stopping location tracker");
        let effects = self.controller.stop();
        self.apply(effects);

        // Receivers cloned from the context outlive it and must not keep a stale verdict.
        self.tracking_enabled = false;
        self.publish();
    }

    fn handle_command(&mut self, command: Command) {
        let effects = match command {
            Command::EnableTracking(mode) => {
                self.tracking_enabled = true;
                let mode = mode.unwrap_or(self.controller.mode());
                self.controller.start(mode)
            }
            Command::DisableTracking => {
                self.tracking_enabled = false;
                self.controller.stop()
            }
            Command::RequestLocation => {
                self.tracking_enabled = true;
                self.controller.request_location()
            }
            Command::SetTarget(target) => {
                self.target = target;
                Vec::new()
            }
        };
        self.apply(effects);
    }

    fn handle_signal(&mut self, signal: Signal) {
        let effects = match signal {
            Signal::Position { generation, result: Ok(reading) } => {
                self.controller.handle_position(generation, reading)
            }
            Signal::Position { generation, result: Err(error) } => {
                self.controller.handle_error(generation, error)
            }
            Signal::Timer { generation, kind } => self.controller.handle_timer(generation, kind),
        };
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Subscribe { generation, mode, options } => {
                    let handle = self.spawn_subscription(generation, mode, options);
                    self.resources.set_subscription(handle);
                }
                Effect::Unsubscribe => self.resources.cancel_subscription(),
                Effect::StartTimer { generation, kind, delay } => {
                    let signals = self.signals.clone();
                    let handle = tokio::spawn(async move {
                        time::sleep(delay).await;
                        let _ = signals.send(Signal::Timer { generation, kind });
                    });
                    self.resources.set_timer(kind, handle);
                }
                Effect::CancelTimer(kind) => self.resources.cancel_timer(kind),
                Effect::Emit(event) => {
                    // No subscribers is fine.
                    let _ = self.events.send(event);
                }
            }
        }
    }

    fn spawn_subscription(
        &self,
        generation: Generation,
        mode: TrackingMode,
        options: PositionOptions,
    ) -> JoinHandle<()> {
        let provider = Arc::clone(&self.provider);
        let signals = self.signals.clone();

        tokio::spawn(async move {
            match mode {
                TrackingMode::OneShot => {
                    let result =
                        match time::timeout(options.timeout, provider.current_position(options))
                            .await
                        {
                            Ok(result) => result,
                            Err(_) => Err(PositionError::timeout(options.timeout)),
                        };
                    let _ = signals.send(Signal::Position { generation, result });
                }
                TrackingMode::Continuous => {
                    watch_positions(provider, options, generation, signals).await;
                }
            }
        })
    }

    fn publish(&self) {
        let next = LocationSnapshot::capture(
            &self.controller,
            self.target.as_ref(),
            self.tracking_enabled,
        );
        let previous = self.snapshot.borrow().status;
        if previous != next.status {
            tracing::info!(
                from = %previous,
                to = %next.status,
                distance_m = next.distance_m,
                attempt = next.attempt,
                "Location status changed"
            );
        }

        self.snapshot.send_if_modified(|current| {
            if *current != next {
                *current = next;
                true
            } else {
                false
            }
        });
    }
}

/// Forward a platform watch to the tracker.
///
/// The per-attempt deadline applies to the first fix only; after that the watch
/// runs until the platform closes it or the session drops the subscription.
async fn watch_positions(
    provider: Arc<dyn GeolocationProvider>,
    options: PositionOptions,
    generation: Generation,
    signals: mpsc::UnboundedSender<Signal>,
) {
    let mut stream = provider.watch_position(options);

    let mut next = match time::timeout(options.timeout, stream.next()).await {
        Ok(first) => first,
        Err(_) => {
            let result = Err(PositionError::timeout(options.timeout));
            let _ = signals.send(Signal::Position { generation, result });
            return;
        }
    };

    while let Some(result) = next {
        if signals.send(Signal::Position { generation, result }).is_err() {
            return;
        }
        next = stream.next().await;
    }

    let _ = signals.send(Signal::Position {
        generation,
        result: Err(PositionError::new(ErrorKind::Unknown, "Position watch closed by the platform")),
    });
}
