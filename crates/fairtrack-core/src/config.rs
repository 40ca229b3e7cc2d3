use crate::error::{FairtrackError, Result};
use crate::models::{TrackingMode, DEFAULT_MAX_ATTEMPTS, DEFAULT_PROXIMITY_RADIUS_METERS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for the location gate
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub proximity_radius_m: ConfigValue<f64>,
    pub max_attempts: ConfigValue<u32>,
    pub first_retry_delay_ms: ConfigValue<u64>,
    pub retry_delay_ms: ConfigValue<u64>,
    pub base_timeout_ms: ConfigValue<u64>,
    pub timeout_step_ms: ConfigValue<u64>,
    pub maximum_age_ms: ConfigValue<u64>,
    pub loading_indicator_delay_ms: ConfigValue<u64>,
    pub tracking_mode: ConfigValue<TrackingMode>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            proximity_radius_m: ConfigValue::new(
                DEFAULT_PROXIMITY_RADIUS_METERS,
                ConfigSource::Default,
            ),
            max_attempts: ConfigValue::new(DEFAULT_MAX_ATTEMPTS, ConfigSource::Default),
            first_retry_delay_ms: ConfigValue::new(2_000, ConfigSource::Default),
            retry_delay_ms: ConfigValue::new(5_000, ConfigSource::Default),
            base_timeout_ms: ConfigValue::new(10_000, ConfigSource::Default),
            timeout_step_ms: ConfigValue::new(5_000, ConfigSource::Default),
            maximum_age_ms: ConfigValue::new(0, ConfigSource::Default),
            loading_indicator_delay_ms: ConfigValue::new(300, ConfigSource::Default),
            tracking_mode: ConfigValue::new(TrackingMode::Continuous, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| FairtrackError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(radius) = file_config.proximity_radius_m {
            let radius = validate_radius(radius)?;
            self.proximity_radius_m.update(radius, ConfigSource::File);
        }

        if let Some(max_attempts) = file_config.max_attempts {
            let max_attempts = validate_max_attempts(max_attempts)?;
            self.max_attempts.update(max_attempts, ConfigSource::File);
        }

        if let Some(ms) = file_config.first_retry_delay_ms {
            self.first_retry_delay_ms.update(ms, ConfigSource::File);
        }

        if let Some(ms) = file_config.retry_delay_ms {
            self.retry_delay_ms.update(ms, ConfigSource::File);
        }

        if let Some(ms) = file_config.base_timeout_ms {
            self.base_timeout_ms.update(ms, ConfigSource::File);
        }

        if let Some(ms) = file_config.timeout_step_ms {
            self.timeout_step_ms.update(ms, ConfigSource::File);
        }

        if let Some(ms) = file_config.maximum_age_ms {
            self.maximum_age_ms.update(ms, ConfigSource::File);
        }

        if let Some(ms) = file_config.loading_indicator_delay_ms {
            self.loading_indicator_delay_ms.update(ms, ConfigSource::File);
        }

        if let Some(mode) = file_config.tracking_mode {
            self.tracking_mode.update(mode, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    ///
    /// Malformed values are logged and ignored.
    pub fn load_from_env(mut self) -> Self {
        // FAIRTRACK_PROXIMITY_RADIUS
        if let Ok(radius_str) = env::var("FAIRTRACK_PROXIMITY_RADIUS") {
            match parse_radius(&radius_str) {
                Ok(radius) => self.proximity_radius_m.update(radius, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid FAIRTRACK_PROXIMITY_RADIUS value '{}': expected a positive number of meters",
                    radius_str
                ),
            }
        }

        // FAIRTRACK_MAX_ATTEMPTS
        if let Ok(attempts_str) = env::var("FAIRTRACK_MAX_ATTEMPTS") {
            match attempts_str.trim().parse::<u32>() {
                Ok(n) if n >= 1 => self.max_attempts.update(n, ConfigSource::Environment),
                _ => tracing::warn!(
                    "Invalid FAIRTRACK_MAX_ATTEMPTS value '{}': expected an integer >= 1",
                    attempts_str
                ),
            }
        }

        env_millis("FAIRTRACK_FIRST_RETRY_DELAY_MS", &mut self.first_retry_delay_ms);
        env_millis("FAIRTRACK_RETRY_DELAY_MS", &mut self.retry_delay_ms);
        env_millis("FAIRTRACK_BASE_TIMEOUT_MS", &mut self.base_timeout_ms);
        env_millis("FAIRTRACK_TIMEOUT_STEP_MS", &mut self.timeout_step_ms);
        env_millis("FAIRTRACK_MAXIMUM_AGE_MS", &mut self.maximum_age_ms);
        env_millis("FAIRTRACK_LOADING_DELAY_MS", &mut self.loading_indicator_delay_ms);

        // FAIRTRACK_TRACKING_MODE
        if let Ok(mode_str) = env::var("FAIRTRACK_TRACKING_MODE") {
            match parse_tracking_mode(&mode_str) {
                Ok(mode) => self.tracking_mode.update(mode, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid FAIRTRACK_TRACKING_MODE value '{}': expected continuous or one_shot",
                    mode_str
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(radius) = overrides.proximity_radius_m {
            self.proximity_radius_m.update(radius, ConfigSource::Cli);
        }

        if let Some(max_attempts) = overrides.max_attempts {
            self.max_attempts.update(max_attempts, ConfigSource::Cli);
        }

        if let Some(mode) = overrides.tracking_mode {
            self.tracking_mode.update(mode, ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "proximity_radius_m".to_string(),
            (format!("{} m", self.proximity_radius_m.value), self.proximity_radius_m.source),
        );

        map.insert(
            "max_attempts".to_string(),
            (self.max_attempts.value.to_string(), self.max_attempts.source),
        );

        for (key, value) in [
            ("first_retry_delay_ms", &self.first_retry_delay_ms),
            ("retry_delay_ms", &self.retry_delay_ms),
            ("base_timeout_ms", &self.base_timeout_ms),
            ("timeout_step_ms", &self.timeout_step_ms),
            ("maximum_age_ms", &self.maximum_age_ms),
            ("loading_indicator_delay_ms", &self.loading_indicator_delay_ms),
        ] {
            map.insert(key.to_string(), (format!("{} ms", value.value), value.source));
        }

        map.insert(
            "tracking_mode".to_string(),
            (self.tracking_mode.value.to_string(), self.tracking_mode.source),
        );

        map
    }
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn env_millis(var: &str, target: &mut ConfigValue<u64>) {
    if let Ok(raw) = env::var(var) {
        match parse_millis(&raw) {
            Ok(ms) => target.update(ms, ConfigSource::Environment),
            Err(_) => tracing::warn!(
                "Invalid {} value '{}': expected a non-negative integer of milliseconds",
                var,
                raw
            ),
        }
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    proximity_radius_m: Option<f64>,
    max_attempts: Option<u32>,
    first_retry_delay_ms: Option<u64>,
    retry_delay_ms: Option<u64>,
    base_timeout_ms: Option<u64>,
    timeout_step_ms: Option<u64>,
    maximum_age_ms: Option<u64>,
    loading_indicator_delay_ms: Option<u64>,
    tracking_mode: Option<TrackingMode>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub proximity_radius_m: Option<f64>,
    pub max_attempts: Option<u32>,
    pub tracking_mode: Option<TrackingMode>,
}

/// Parse a proximity radius in meters
pub fn parse_radius(s: &str) -> Result<f64> {
    let radius = f64::from_str(s.trim()).map_err(|_| FairtrackError::ConfigInvalid {
        key: "proximity_radius_m".to_string(),
        reason: format!("Invalid radius: {}. Use a number of meters", s),
    })?;
    validate_radius(radius)
}

fn validate_radius(radius: f64) -> Result<f64> {
    if radius.is_finite() && radius > 0.0 {
        Ok(radius)
    } else {
        Err(FairtrackError::ConfigInvalid {
            key: "proximity_radius_m".to_string(),
            reason: format!("Radius must be a positive number of meters, got {}", radius),
        })
    }
}

fn validate_max_attempts(max_attempts: u32) -> Result<u32> {
    if max_attempts >= 1 {
        Ok(max_attempts)
    } else {
        Err(FairtrackError::ConfigInvalid {
            key: "max_attempts".to_string(),
            reason: "At least one attempt is required".to_string(),
        })
    }
}

fn parse_millis(s: &str) -> Result<u64> {
    s.trim().parse::<u64>().map_err(|_| FairtrackError::ConfigInvalid {
        key: "milliseconds".to_string(),
        reason: format!("Invalid duration: {}", s),
    })
}

/// Parse tracking mode from string
pub fn parse_tracking_mode(s: &str) -> Result<TrackingMode> {
    match s.to_lowercase().as_str() {
        "continuous" | "watch" => Ok(TrackingMode::Continuous),
        "one_shot" | "one-shot" | "oneshot" | "once" => Ok(TrackingMode::OneShot),
        _ => Err(FairtrackError::ConfigInvalid {
            key: "tracking_mode".to_string(),
            reason: format!("Invalid tracking mode: {}. Use continuous or one_shot", s),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.proximity_radius_m.value, 20.0);
        assert_eq!(config.proximity_radius_m.source, ConfigSource::Default);
        assert_eq!(config.max_attempts.value, 3);
        assert_eq!(config.first_retry_delay_ms.value, 2_000);
        assert_eq!(config.retry_delay_ms.value, 5_000);
        assert_eq!(config.tracking_mode.value, TrackingMode::Continuous);
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);
        assert_eq!(value.source, ConfigSource::Environment);

        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
proximity_radius_m = 35.5
max_attempts = 5
retry_delay_ms = 4000
tracking_mode = "one_shot"
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.proximity_radius_m.value, 35.5);
        assert_eq!(config.proximity_radius_m.source, ConfigSource::File);
        assert_eq!(config.max_attempts.value, 5);
        assert_eq!(config.retry_delay_ms.value, 4_000);
        assert_eq!(config.tracking_mode.value, TrackingMode::OneShot);
        assert_eq!(config.base_timeout_ms.source, ConfigSource::Default);
    }

    #[test]
    fn test_file_rejects_non_positive_radius() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "proximity_radius_m = -3.0").unwrap();

        let err = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap_err();
        assert!(matches!(
            err,
            FairtrackError::ConfigInvalid { ref key, .. } if key == "proximity_radius_m"
        ));
    }

    #[test]
    fn test_file_rejects_zero_attempts() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_attempts = 0").unwrap();

        assert!(LayeredConfig::with_defaults().load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();

        config.update_from_cli(CliConfigOverrides {
            proximity_radius_m: Some(50.0),
            max_attempts: None,
            tracking_mode: Some(TrackingMode::OneShot),
        });

        assert_eq!(config.proximity_radius_m.value, 50.0);
        assert_eq!(config.proximity_radius_m.source, ConfigSource::Cli);
        assert_eq!(config.tracking_mode.value, TrackingMode::OneShot);
        assert_eq!(config.max_attempts.source, ConfigSource::Default);
    }

    #[test]
    fn test_parse_radius() {
        assert_eq!(parse_radius("20").unwrap(), 20.0);
        assert_eq!(parse_radius(" 12.5 ").unwrap(), 12.5);
        assert!(parse_radius("0").is_err());
        assert!(parse_radius("NaN").is_err());
        assert!(parse_radius("far").is_err());
    }

    #[test]
    fn test_parse_tracking_mode() {
        assert_eq!(parse_tracking_mode("continuous").unwrap(), TrackingMode::Continuous);
        assert_eq!(parse_tracking_mode("WATCH").unwrap(), TrackingMode::Continuous);
        assert_eq!(parse_tracking_mode("one-shot").unwrap(), TrackingMode::OneShot);
        assert!(parse_tracking_mode("sometimes").is_err());
    }

    #[test]
    fn test_inspection_map() {
        let config = LayeredConfig::with_defaults();
        let map = config.to_inspection_map();

        assert_eq!(map.len(), 9);
        let (radius, source) = &map["proximity_radius_m"];
        assert_eq!(radius, "20 m");
        assert_eq!(*source, ConfigSource::Default);
        assert_eq!(map["first_retry_delay_ms"].0, "2000 ms");
        assert_eq!(map["tracking_mode"].0, "continuous");
    }
}
