//! Scenario files for `fairtrack simulate`.
//!
//! A scenario scripts what the device reports (`steps`) and what the user does
//! (`actions`). Steps are consumed in order by whatever request or watch the
//! tracker has open; `after_ms` is measured from the moment a request picks the
//! step up. Actions fire at absolute times from the start of the run.
//!
//! ```toml
//! mode = "continuous"
//!
//! [target]
//! latitude = "48.7758"
//! longitude = "9.1829"
//!
//! [[steps]]
//! after_ms = 1200
//! outcome = "fix"
//! latitude = 48.77585
//! longitude = 9.1829
//!
//! [[actions]]
//! at_ms = 0
//! action = "enable"
//! ```

use fairtrack_core::models::{Fairteiler, ProximityTarget, TrackingMode};
use fairtrack_geo::target_for;
use fairtrack_location::{SimulatedOutcome, SimulatedStep};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Virtual time kept running after the last action, enough for a full retry chain
pub const DEFAULT_TAIL_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Cannot read scenario {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse scenario {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Scenario has nothing to do: add steps or actions")]
    Empty,
}

/// Parsed scenario file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Display name, defaults to the file stem
    #[serde(default)]
    pub name: Option<String>,

    /// Tracking mode for `enable` actions; falls back to the configuration
    #[serde(default)]
    pub mode: Option<TrackingMode>,

    /// Fairteiler to gate on
    #[serde(default)]
    pub target: Option<ScenarioTarget>,

    /// Total virtual run time; defaults to the last action plus [`DEFAULT_TAIL_MS`]
    #[serde(default)]
    pub duration_ms: Option<u64>,

    #[serde(default)]
    pub steps: Vec<ScenarioStep>,

    /// Defaults to a single `enable` at 0 ms
    #[serde(default)]
    pub actions: Vec<ScheduledAction>,
}

/// Fairteiler location exactly as stored (strings, possibly malformed)
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioTarget {
    pub latitude: String,
    pub longitude: String,
    #[serde(default)]
    pub radius_m: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioStep {
    #[serde(default)]
    pub after_ms: u64,
    #[serde(flatten)]
    pub outcome: SimulatedOutcome,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledAction {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: ScenarioAction,
}

/// What the user does during the run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioAction {
    Enable,
    Disable,
    RequestLocation,
    SetTarget { latitude: String, longitude: String },
    ClearTarget,
}

impl std::fmt::Display for ScenarioAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioAction::Enable => write!(f, "enable tracking"),
            ScenarioAction::Disable => write!(f, "disable tracking"),
            ScenarioAction::RequestLocation => write!(f, "request location"),
            ScenarioAction::SetTarget { latitude, longitude } => {
                write!(f, "set target ({}, {})", latitude, longitude)
            }
            ScenarioAction::ClearTarget => write!(f, "clear target"),
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = fs::read_to_string(path)
            .map_err(|source| ScenarioError::Read { path: path.to_path_buf(), source })?;
        let mut scenario: Scenario = toml::from_str(&content)
            .map_err(|source| ScenarioError::Parse { path: path.to_path_buf(), source })?;

        if scenario.name.is_none() {
            scenario.name = path.file_stem().map(|stem| stem.to_string_lossy().into_owned());
        }
        scenario.normalize()?;
        Ok(scenario)
    }

    fn normalize(&mut self) -> Result<(), ScenarioError> {
        if self.steps.is_empty() && self.actions.is_empty() {
            return Err(ScenarioError::Empty);
        }
        if self.actions.is_empty() {
            self.actions.push(ScheduledAction { at_ms: 0, action: ScenarioAction::Enable });
        }
        // Stable, so actions at the same instant keep file order.
        self.actions.sort_by_key(|a| a.at_ms);
        Ok(())
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("scenario")
    }

    pub fn duration(&self) -> Duration {
        let ms = self.duration_ms.unwrap_or_else(|| {
            self.actions.last().map_or(0, |a| a.at_ms).saturating_add(DEFAULT_TAIL_MS)
        });
        Duration::from_millis(ms)
    }

    pub fn simulated_steps(&self) -> Vec<SimulatedStep> {
        self.steps
            .iter()
            .map(|s| SimulatedStep::new(Duration::from_millis(s.after_ms), s.outcome.clone()))
            .collect()
    }

    /// Initial target; unusable stored coordinates leave the form without one
    pub fn proximity_target(&self, default_radius_m: f64) -> Option<ProximityTarget> {
        let target = self.target.as_ref()?;
        let radius = target.radius_m.unwrap_or(default_radius_m);
        target_for(&fairteiler(&target.latitude, &target.longitude), radius)
    }
}

/// Fairteiler record for coordinates given in a scenario
pub fn fairteiler(latitude: &str, longitude: &str) -> Fairteiler {
    Fairteiler::new("scenario", "Scenario Fairteiler").with_location(latitude, longitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairtrack_core::models::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn load(content: &str) -> Result<Scenario, ScenarioError> {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        Scenario::load(file.path())
    }

    #[test]
    fn test_full_scenario() {
        let scenario = load(
            r#"
name = "walk-in"
mode = "one_shot"
duration_ms = 30000

[target]
latitude = "48.7758"
longitude = "9.1829"
radius_m = 25.0

[[steps]]
after_ms = 500
outcome = "error"
kind = "timeout"

[[steps]]
outcome = "fix"
latitude = 48.7758
longitude = 9.1829
accuracy_m = 12.0

[[actions]]
at_ms = 4000
action = "request_location"

[[actions]]
at_ms = 0
action = "enable"
"#,
        )
        .unwrap();

        assert_eq!(scenario.display_name(), "walk-in");
        assert_eq!(scenario.mode, Some(TrackingMode::OneShot));
        assert_eq!(scenario.duration(), Duration::from_secs(30));

        let steps = scenario.simulated_steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].after, Duration::from_millis(500));
        assert_eq!(steps[0].outcome, SimulatedOutcome::Error { kind: ErrorKind::Timeout });
        assert_eq!(steps[1].after, Duration::ZERO);

        // Sorted by time
        assert_eq!(scenario.actions[0].action, ScenarioAction::Enable);
        assert_eq!(scenario.actions[1].action, ScenarioAction::RequestLocation);

        let target = scenario.proximity_target(20.0).unwrap();
        assert_eq!(target.radius_meters, 25.0);
    }

    #[test]
    fn test_defaults() {
        let scenario = load(
            r#"
[[steps]]
outcome = "close"
"#,
        )
        .unwrap();

        assert_eq!(scenario.actions.len(), 1);
        assert_eq!(scenario.actions[0].action, ScenarioAction::Enable);
        assert_eq!(scenario.duration(), Duration::from_millis(DEFAULT_TAIL_MS));
        assert!(scenario.proximity_target(20.0).is_none());
        assert!(scenario.name.is_some());
    }

    #[test]
    fn test_malformed_target_is_dropped() {
        let scenario = load(
            r#"
[target]
latitude = "48,7758"
longitude = "9.1829"

[[actions]]
at_ms = 0
action = "enable"
"#,
        )
        .unwrap();

        assert!(scenario.proximity_target(20.0).is_none());
    }

    #[test]
    fn test_rejects_unknown_outcome() {
        let result = load(
            r#"
[[steps]]
outcome = "teleport"
"#,
        );
        assert!(matches!(result, Err(ScenarioError::Parse { .. })));
    }

    #[test]
    fn test_rejects_empty_scenario() {
        assert!(matches!(load("mode = \"continuous\"\n"), Err(ScenarioError::Empty)));
    }

    #[test]
    fn test_missing_file() {
        let result = Scenario::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ScenarioError::Read { .. })));
    }
}
