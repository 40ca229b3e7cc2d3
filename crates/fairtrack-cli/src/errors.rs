use console::style;
use fairtrack_core::FairtrackError;
use std::fmt;
use std::path::Path;

use crate::scenario::ScenarioError;

/// Enhanced error type with suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Create error for a coordinate argument that does not parse
pub fn invalid_coordinates(input: &str, reason: impl fmt::Display) -> CliError {
    CliError::new("Invalid coordinates")
        .with_context(format!("Could not read a position from {:?}.\n\nReason: {}", input, reason))
        .with_suggestion("Pass latitude and longitude as \"lat,lng\" in decimal degrees")
        .with_suggestion("Use a dot as decimal separator: 48.7758,9.1829")
        .with_help("Run: fairtrack --help")
}

/// Create error for a Fairteiler without usable stored coordinates
pub fn invalid_target(reason: impl fmt::Display) -> CliError {
    CliError::new("Fairteiler has no usable location")
        .with_context(format!(
            "Contributions stay locked until the Fairteiler's coordinates are fixed.\n\nReason: {}",
            reason
        ))
        .with_suggestion("Check the stored latitude (-90..90) and longitude (-180..180)")
        .with_help("Run: fairtrack check --help")
}

/// Create error for missing scenario file
pub fn scenario_not_found(path: &Path) -> CliError {
    CliError::new("Scenario file not found")
        .with_context(format!("The specified scenario does not exist.\n\nPath: {}", path.display()))
        .with_suggestion("Check the file path and try again")
        .with_suggestion("Sample scenarios live in crates/fairtrack-cli/scenarios")
        .with_help("Run: fairtrack simulate --help")
}

/// Create error for a scenario that does not parse
pub fn invalid_scenario(error: &ScenarioError) -> CliError {
    CliError::new("Invalid scenario")
        .with_context(error.to_string())
        .with_suggestion("Every step needs after_ms and an outcome (fix, error or close)")
        .with_suggestion("Every action needs at_ms and an action such as enable or disable")
        .with_help("Run: fairtrack simulate --help")
}

/// Create error for invalid configuration
pub fn invalid_config(key: &str, reason: &str) -> CliError {
    CliError::new(format!("Invalid configuration: {}", key))
        .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
        .with_suggestion("Check fairtrack.toml for syntax errors")
        .with_suggestion("Or override the value: FAIRTRACK_* environment variables, CLI flags")
        .with_help("Run: fairtrack config")
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    let error = match error.downcast::<CliError>() {
        Ok(cli_error) => return cli_error,
        Err(error) => error,
    };

    for cause in error.chain() {
        if let Some(scenario) = cause.downcast_ref::<ScenarioError>() {
            return match scenario {
                ScenarioError::Read { path, .. } => scenario_not_found(path),
                _ => invalid_scenario(scenario),
            };
        }
        if let Some(FairtrackError::ConfigInvalid { key, reason }) =
            cause.downcast_ref::<FairtrackError>()
        {
            return invalid_config(key, reason);
        }
    }

    let message = error.to_string();
    if message.contains("No such file or directory") {
        CliError::new("File not found")
            .with_context(format!("Error: {:#}", error))
            .with_suggestion("Check the file path and try again")
    } else {
        CliError::new(format!("{:#}", error))
    }
}
