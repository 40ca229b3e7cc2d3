//! Consumption surface shared by the contribution form and the map view.

use fairtrack_core::models::{
    Coordinates, Fairteiler, LocationStatus, ProximityTarget, TrackingMode,
};
use fairtrack_core::{FairtrackError, Result};
use fairtrack_geo::target_for;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::controller::TrackingEvent;
use crate::derive::LocationSnapshot;
use crate::tracker::{Command, TrackerSettings};

/// Handle to a running [`LocationTracker`](crate::tracker::LocationTracker).
///
/// Reads are served from the latest published snapshot and never block. Commands
/// are queued to the tracker task and applied in order. Dropping the context
/// stops the tracker and releases every platform subscription and timer.
#[derive(Debug)]
pub struct ContributionContext {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<LocationSnapshot>,
    events: broadcast::Sender<TrackingEvent>,
    settings: TrackerSettings,
    task: JoinHandle<()>,
}

impl ContributionContext {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        snapshot: watch::Receiver<LocationSnapshot>,
        events: broadcast::Sender<TrackingEvent>,
        settings: TrackerSettings,
        task: JoinHandle<()>,
    ) -> Self {
        Self { commands, snapshot, events, settings, task }
    }

    pub fn location_status(&self) -> LocationStatus {
        self.snapshot.borrow().status
    }

    /// Latest fix, kept while a retry is in progress
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.snapshot.borrow().coordinates
    }

    /// True exactly when the status is `Verified`
    pub fn is_location_verified(&self) -> bool {
        self.snapshot.borrow().is_location_verified
    }

    pub fn snapshot(&self) -> LocationSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Independent receiver for views that re-render on every change
    pub fn snapshots(&self) -> watch::Receiver<LocationSnapshot> {
        self.snapshot.clone()
    }

    /// Restart acquisition from attempt zero
    pub fn request_location(&self) -> Result<()> {
        self.send(Command::RequestLocation)
    }

    /// Start tracking in the configured mode
    pub fn enable_tracking(&self) -> Result<()> {
        self.send(Command::EnableTracking(None))
    }

    pub fn enable_tracking_with(&self, mode: TrackingMode) -> Result<()> {
        self.send(Command::EnableTracking(Some(mode)))
    }

    pub fn disable_tracking(&self) -> Result<()> {
        self.send(Command::DisableTracking)
    }

    pub fn set_target(&self, target: Option<ProximityTarget>) -> Result<()> {
        self.send(Command::SetTarget(target))
    }

    /// Gate on a Fairteiler's stored location.
    ///
    /// A Fairteiler without usable coordinates clears the target, which keeps the
    /// form locked.
    pub fn set_fairteiler(&self, fairteiler: &Fairteiler) -> Result<()> {
        let target = target_for(fairteiler, self.settings.proximity_radius_m);
        self.set_target(target)
    }

    /// Receive tracking events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<TrackingEvent> {
        self.events.subscribe()
    }

    /// Wait until the next snapshot is published
    pub async fn changed(&mut self) -> Result<LocationSnapshot> {
        self.snapshot.changed().await.map_err(|_| FairtrackError::TrackerClosed)?;
        Ok(self.snapshot.borrow_and_update().clone())
    }

    /// Wait until a snapshot satisfies `predicate`, checking the current one first
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Result<LocationSnapshot>
    where
        F: FnMut(&LocationSnapshot) -> bool,
    {
        let snapshot = self
            .snapshot
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| FairtrackError::TrackerClosed)?;
        Ok(snapshot.clone())
    }

    /// Stop the tracker and wait for it to release its resources
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Location tracker did not shut down cleanly");
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| FairtrackError::TrackerClosed)
    }
}
