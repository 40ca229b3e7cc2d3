//! Simulate command implementation
//!
//! Replays a scenario against the real tracker on a paused clock, so a run that
//! covers a full retry chain finishes immediately and its timings are exact.
//!
//! Status rows are sampled from the snapshot channel, which keeps only the latest
//! value. A status that is replaced within the same scheduler turn (for example
//! `loading` when a fix is delivered immediately) does not get a row of its own;
//! the events column still shows every start, fix, error and end.

use crate::cli::SimulateArgs;
use crate::output::OutputWriter;
use crate::output_types::{RequestInfo, SimulateOutput, TimelineEntry, TimelineKind};
use crate::scenario::{fairteiler, Scenario, ScenarioAction};
use anyhow::{Context, Result};
use fairtrack_core::config::{ConfigSource, LayeredConfig};
use fairtrack_core::models::{Coordinates, LocationStatus};
use fairtrack_location::{
    ContributionContext, LocationSnapshot, LocationTracker, SimulatedProvider, TrackerSettings,
    TrackingEvent,
};
use std::sync::Arc;
use std::time::Duration;
use tabled::Tabled;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{self, Instant};

pub fn execute(args: SimulateArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;

    let mut settings = TrackerSettings::from_config(config);
    // An explicit --mode beats the scenario's own mode.
    if config.tracking_mode.source != ConfigSource::Cli {
        if let Some(mode) = scenario.mode {
            settings.mode = mode;
        }
    }

    tracing::info!(
        scenario = scenario.display_name(),
        mode = %settings.mode,
        steps = scenario.steps.len(),
        actions = scenario.actions.len(),
        "Running scenario"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .context("Failed to create simulation runtime")?;
    let report = runtime.block_on(run(&scenario, settings))?;

    render(report, output)
}

/// Play `scenario` to its end and collect what the tracker did
pub async fn run(scenario: &Scenario, settings: TrackerSettings) -> Result<SimulateOutput> {
    let provider = SimulatedProvider::with_steps(scenario.simulated_steps());
    let context = LocationTracker::spawn(Arc::new(provider.clone()), settings);
    let mut events = context.subscribe();
    let mut snapshots = context.snapshots();

    let mut timeline = Timeline::new(Instant::now(), &context.snapshot());
    let deadline = timeline.start + scenario.duration();
    let mut actions = scenario.actions.iter().peekable();

    context.set_target(scenario.proximity_target(settings.proximity_radius_m))?;

    loop {
        let next_action = actions.peek().map(|a| timeline.start + Duration::from_millis(a.at_ms));

        tokio::select! {
            biased;

            event = events.recv() => match event {
                Ok(event) => timeline.event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Timeline fell behind tracker events");
                }
                Err(RecvError::Closed) => break,
            },
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                timeline.snapshot(&snapshot);
            }
            _ = time::sleep_until(next_action.unwrap_or(deadline)), if next_action.is_some() => {
                if let Some(scheduled) = actions.next() {
                    timeline.action(&scheduled.action);
                    apply(&context, &scheduled.action)?;
                }
            }
            _ = time::sleep_until(deadline) => break,
        }
    }

    let final_snapshot = context.snapshot();
    context.shutdown().await;

    let requests = provider
        .requests()
        .into_iter()
        .map(|options| RequestInfo {
            enable_high_accuracy: options.enable_high_accuracy,
            timeout_ms: options.timeout.as_millis() as u64,
            maximum_age_ms: options.maximum_age.as_millis() as u64,
        })
        .collect();

    Ok(SimulateOutput {
        scenario: scenario.display_name().to_string(),
        timeline: timeline.entries,
        final_snapshot,
        requests,
    })
}

fn apply(context: &ContributionContext, action: &ScenarioAction) -> fairtrack_core::Result<()> {
    match action {
        ScenarioAction::Enable => context.enable_tracking(),
        ScenarioAction::Disable => context.disable_tracking(),
        ScenarioAction::RequestLocation => context.request_location(),
        ScenarioAction::SetTarget { latitude, longitude } => {
            context.set_fairteiler(&fairteiler(latitude, longitude))
        }
        ScenarioAction::ClearTarget => context.set_target(None),
    }
}

struct Timeline {
    start: Instant,
    entries: Vec<TimelineEntry>,
    last: Option<(LocationStatus, bool, Option<Coordinates>)>,
}

impl Timeline {
    fn new(start: Instant, initial: &LocationSnapshot) -> Self {
        Self { start, entries: Vec::new(), last: Some(Timeline::key(initial)) }
    }

    fn key(snapshot: &LocationSnapshot) -> (LocationStatus, bool, Option<Coordinates>) {
        (snapshot.status, snapshot.show_loading_indicator, snapshot.coordinates)
    }

    fn push(&mut self, kind: TimelineKind, detail: String) -> &mut TimelineEntry {
        let at_ms = self.start.elapsed().as_millis() as u64;
        self.entries.push(TimelineEntry { at_ms, kind, detail, status: None, error: None });
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    fn action(&mut self, action: &ScenarioAction) {
        self.push(TimelineKind::Action, action.to_string());
    }

    fn event(&mut self, event: &TrackingEvent) {
        match event {
            TrackingEvent::TrackingStarted { mode } => {
                self.push(TimelineKind::Event, format!("tracking started ({})", mode));
            }
            TrackingEvent::Position { coordinates } => {
                self.push(TimelineKind::Event, format!("position {}", coordinates));
            }
            TrackingEvent::Error { kind, message } => {
                self.push(TimelineKind::Event, message.clone()).error = Some(*kind);
            }
            TrackingEvent::TrackingEnded => {
                self.push(TimelineKind::Event, "tracking ended".to_string());
            }
        }
    }

    /// Record a snapshot when something a user would see has changed
    fn snapshot(&mut self, snapshot: &LocationSnapshot) {
        let key = Timeline::key(snapshot);
        if self.last == Some(key) {
            return;
        }
        self.last = Some(key);

        let mut detail = snapshot.message.clone();
        if snapshot.show_loading_indicator {
            detail.push_str(" [spinner]");
        }
        self.push(TimelineKind::Status, detail).status = Some(snapshot.status);
    }
}

fn render(report: SimulateOutput, output: &OutputWriter) -> Result<()> {
    if output.is_json() {
        return output.result(report);
    }

    output.section(format!("Scenario: {}", report.scenario));

    #[derive(Tabled)]
    struct TimelineRow {
        #[tabled(rename = "Time")]
        at: String,
        #[tabled(rename = "Kind")]
        kind: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Detail")]
        detail: String,
    }

    let rows: Vec<TimelineRow> = report
        .timeline
        .iter()
        .map(|entry| TimelineRow {
            at: format!("{:>7.3} s", entry.at_ms as f64 / 1000.0),
            kind: format!("{:?}", entry.kind).to_lowercase(),
            status: entry.status.map(|s| s.to_string()).unwrap_or_default(),
            detail: entry.detail.clone(),
        })
        .collect();
    output.table(rows);

    let snapshot = &report.final_snapshot;
    output.section("Result");
    output.kv("Status", snapshot.status);
    output.kv("Verified", snapshot.is_location_verified);
    if let Some(distance) = snapshot.distance_m {
        output.kv("Distance", format!("{:.1} m", distance));
    }
    output.kv("Message", &snapshot.message);

    let timeouts: Vec<String> = report.requests.iter().map(|r| r.timeout_ms.to_string()).collect();
    output.kv(
        "Requests",
        format!("{} (timeouts: {} ms)", report.requests.len(), timeouts.join(", ")),
    );

    if snapshot.is_location_verified {
        output.success("Contribution form unlocked");
    } else {
        output.info("Contribution form stays locked");
    }

    Ok(())
}
