//! # Rule Configuration
//!
//! Static metadata for each lint rule and the logic that decides, from the
//! resolved [`RuleModes`], whether a rule runs and at what level a failure
//! is reported.
//!
//! A rule's mode lists are checked in a fixed order:
//!
//! - enablement: any active `disable_modes` entry wins, then any active
//!   `enable_modes` entry;
//! - level: `error_modes`, then `warning_modes`, then `info_modes`.
//!
//! [`RuleMode::Default`] is always active, so it serves as the fallback
//! entry. A rule whose lists match nothing is misconfigured.

use serde::Serialize;

use crate::error::ConfigError;
use crate::project::ProjectType;
use crate::rulemode::{RuleMode, RuleModes};

/// Result of running a rule function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOutcome {
    /// The project satisfies the rule.
    Pass,
    /// The project violates the rule.
    Fail,
    /// The rule does not apply to this project.
    Skip,
    /// The rule was not run.
    NotRun,
}

/// Severity of a rule failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleLevel {
    /// Informational.
    Info,
    /// Should be fixed.
    Warning,
    /// Must be fixed.
    Error,
}

impl std::fmt::Display for RuleLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        })
    }
}

/// Static configuration of one lint rule.
#[derive(Debug, Clone)]
pub struct RuleConfiguration {
    /// Project type the rule applies to.
    pub project_type: ProjectType,
    /// Rule category (e.g. "library.properties").
    pub category: &'static str,
    /// Rule subcategory (e.g. "name field").
    pub subcategory: &'static str,
    /// Stable rule identifier (e.g. "LP001").
    pub id: &'static str,
    /// One-line summary of what the rule checks.
    pub brief: &'static str,
    /// Failure message. `{}` is replaced with the rule function's output.
    pub message_template: &'static str,
    /// Modes that disable the rule.
    pub disable_modes: &'static [RuleMode],
    /// Modes that enable the rule.
    pub enable_modes: &'static [RuleMode],
    /// Modes that report a failure as info.
    pub info_modes: &'static [RuleMode],
    /// Modes that report a failure as a warning.
    pub warning_modes: &'static [RuleMode],
    /// Modes that report a failure as an error.
    pub error_modes: &'static [RuleMode],
}

impl RuleConfiguration {
    /// Whether the rule runs under the given modes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RuleMisconfigured`] if no listed mode is active.
    pub fn is_enabled(&self, modes: &RuleModes) -> Result<bool, ConfigError> {
        if self.disable_modes.iter().any(|mode| modes.get(*mode)) {
            return Ok(false);
        }
        if self.enable_modes.iter().any(|mode| modes.get(*mode)) {
            return Ok(true);
        }
        Err(ConfigError::RuleMisconfigured(self.id.to_string()))
    }

    /// The level at which a failure of this rule is reported.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RuleMisconfigured`] if no listed mode is active.
    pub fn level(&self, modes: &RuleModes) -> Result<RuleLevel, ConfigError> {
        let lists = [
            (RuleLevel::Error, self.error_modes),
            (RuleLevel::Warning, self.warning_modes),
            (RuleLevel::Info, self.info_modes),
        ];
        lists
            .into_iter()
            .find(|(_, list)| list.iter().any(|mode| modes.get(*mode)))
            .map(|(level, _)| level)
            .ok_or_else(|| ConfigError::RuleMisconfigured(self.id.to_string()))
    }

    /// Renders the failure message for a rule function's output.
    pub fn message(&self, output: &str) -> String {
        self.message_template.replace("{}", output)
    }
}

/// What running one rule against one project produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    /// The rule identifier.
    pub id: &'static str,
    /// The outcome.
    pub outcome: RuleOutcome,
    /// Failure level; only set for [`RuleOutcome::Fail`].
    pub level: Option<RuleLevel>,
    /// Human-readable message; empty for passes and unrun rules.
    pub message: String,
}

/// Runs a rule function if the rule is enabled for the resolved modes.
///
/// The rule function receives the project data and the active rule-modes
/// and returns an outcome plus output text. On failure the output is
/// rendered through the rule's message template; on skip it is passed
/// through as the reason.
///
/// # Errors
///
/// Returns [`ConfigError::RuleMisconfigured`] if the rule's mode lists do
/// not cover the active modes.
pub fn run_rule<D, F>(
    configuration: &RuleConfiguration,
    modes: &RuleModes,
    data: &D,
    rule_function: F,
) -> Result<RuleReport, ConfigError>
where
    F: FnOnce(&D, &RuleModes) -> (RuleOutcome, String),
{
    let not_run = RuleReport {
        id: configuration.id,
        outcome: RuleOutcome::NotRun,
        level: None,
        message: String::new(),
    };

    if configuration.project_type != modes.project_type() {
        return Ok(not_run);
    }
    if !configuration.is_enabled(modes)? {
        tracing::debug!(rule = configuration.id, "rule not enabled");
        return Ok(not_run);
    }

    let (outcome, output) = rule_function(data, modes);
    tracing::debug!(rule = configuration.id, outcome = ?outcome, "rule run");

    let report = match outcome {
        RuleOutcome::Fail => RuleReport {
            id: configuration.id,
            outcome,
            level: Some(configuration.level(modes)?),
            message: configuration.message(&output),
        },
        RuleOutcome::Skip => RuleReport {
            id: configuration.id,
            outcome,
            level: None,
            message: output,
        },
        RuleOutcome::Pass | RuleOutcome::NotRun => RuleReport {
            id: configuration.id,
            outcome,
            level: None,
            message: String::new(),
        },
    };
    Ok(report)
}
