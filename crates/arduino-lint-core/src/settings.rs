//! # Run Settings
//!
//! Turns raw flag values and environment variables into the typed run
//! configuration, and that configuration into [`RuleModeOverrides`].
//!
//! Library Manager precedence, highest first:
//!
//! 1. `ARDUINO_LINT_LIBRARY_MANAGER_INDEXING=true`
//! 2. `--library-manager`
//! 3. the project type's default
//!
//! The environment is read through an injected lookup function so tests
//! never touch the process environment.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::project::ProjectTypeFilter;
use crate::rulemode::{
    resolve, ComplianceLevel, LibraryManagerMode, RuleModeDefaults, RuleModeOverrides, RuleModes,
};
use crate::ProjectType;

/// Environment variable that forces Library Manager indexing mode.
pub const ENV_LIBRARY_MANAGER_INDEXING: &str = "ARDUINO_LINT_LIBRARY_MANAGER_INDEXING";
/// Environment variable that sets official-project mode.
pub const ENV_OFFICIAL: &str = "ARDUINO_LINT_OFFICIAL";
/// Environment variable that sets the log level.
pub const ENV_LOG_LEVEL: &str = "ARDUINO_LINT_LOG_LEVEL";
/// Environment variable that sets the log format.
pub const ENV_LOG_FORMAT: &str = "ARDUINO_LINT_LOG_FORMAT";

/// Flag values as the command line delivered them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSettings {
    /// `--compliance` value, if given.
    pub compliance: Option<String>,
    /// `--library-manager` value, if given.
    pub library_manager: Option<String>,
    /// `--project-type` value, if given.
    pub project_type: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidEnvironmentValue {
                variable: ENV_LOG_FORMAT.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Parses a log level name. The logrus-style `warning`, `fatal` and
/// `panic` spellings are accepted alongside the tracing names.
fn parse_log_level(value: &str) -> Result<tracing::Level, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "warning" => Ok(tracing::Level::WARN),
        "fatal" | "panic" => Ok(tracing::Level::ERROR),
        other => other.parse().map_err(|_| ConfigError::InvalidEnvironmentValue {
            variable: ENV_LOG_LEVEL.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Typed run configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Selected compliance tier.
    pub compliance: Option<ComplianceLevel>,
    /// Selected Library Manager mode.
    pub library_manager: Option<LibraryManagerMode>,
    /// Value of `ARDUINO_LINT_LIBRARY_MANAGER_INDEXING`, if set.
    pub library_manager_indexing: Option<bool>,
    /// Value of `ARDUINO_LINT_OFFICIAL`, if set.
    pub official: Option<bool>,
    /// Project type filter.
    pub project_type: ProjectTypeFilter,
    /// Log level requested through the environment.
    pub log_level: Option<tracing::Level>,
    /// Log format requested through the environment.
    pub log_format: Option<LogFormat>,
}

impl Settings {
    /// Parses raw flag values and environment variables.
    ///
    /// `env` maps an environment variable name to its value, or `None` if
    /// the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first invalid flag or variable.
    pub fn from_raw<F>(raw: &RawSettings, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let compliance: Option<ComplianceLevel> = raw
            .compliance
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .transpose()?;
        let library_manager: Option<LibraryManagerMode> = raw
            .library_manager
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .transpose()?;
        let project_type = match raw.project_type.as_deref() {
            Some(s) if !s.is_empty() => s.parse()?,
            _ => ProjectTypeFilter::All,
        };

        let library_manager_indexing = env_bool(&env, ENV_LIBRARY_MANAGER_INDEXING)?;
        let official = env_bool(&env, ENV_OFFICIAL)?;
        let log_format: Option<LogFormat> = env(ENV_LOG_FORMAT).map(|s| s.parse()).transpose()?;
        let log_level = env(ENV_LOG_LEVEL)
            .filter(|s| !s.is_empty())
            .map(|s| parse_log_level(&s))
            .transpose()?;

        let settings = Self {
            compliance,
            library_manager,
            library_manager_indexing,
            official,
            project_type,
            log_level,
            log_format,
        };
        tracing::debug!(
            compliance = ?settings.compliance,
            library_manager = ?settings.library_manager,
            library_manager_indexing = ?settings.library_manager_indexing,
            official = ?settings.official,
            project_type = %settings.project_type,
            "configuration initialized"
        );
        Ok(settings)
    }

    /// Builds the rule-mode overrides for this run.
    pub fn overrides(&self) -> RuleModeOverrides {
        let mut overrides = RuleModeOverrides::new();
        if let Some(level) = self.compliance {
            overrides.set_compliance(level);
        }
        if let Some(selection) = self.library_manager {
            overrides.set_library_manager(selection);
        }
        if self.library_manager_indexing == Some(true) {
            overrides.set_library_manager_indexing();
        }
        if let Some(official) = self.official {
            overrides.set_official(official);
        }
        overrides
    }

    /// Resolves the rule-modes for a project type with the built-in defaults.
    ///
    /// # Errors
    ///
    /// See [`resolve`].
    pub fn rule_modes(&self, project_type: ProjectType) -> Result<RuleModes, ConfigError> {
        resolve(&RuleModeDefaults::default(), &self.overrides(), project_type)
    }
}

/// Parses an environment boolean: `1 t T TRUE true True` or `0 f F FALSE false False`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn env_bool<F>(env: &F, variable: &str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match env(variable) {
        None => Ok(None),
        Some(value) => parse_bool(&value)
            .map(Some)
            .ok_or(ConfigError::InvalidEnvironmentValue {
                variable: variable.to_string(),
                value,
            }),
    }
}
