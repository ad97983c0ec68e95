//! # Error Types
//!
//! Configuration errors raised while turning user input into rule-mode
//! settings, and while evaluating rule configurations against them.
//!
//! Every variant here means the tool or its invocation is broken. Problems
//! in the project under test are never reported through these types; they
//! flow as validation results and rule outcomes instead.

use thiserror::Error;

/// Errors in run configuration or rule configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The compliance selector did not name a known tier.
    #[error("--compliance flag value {0} not valid")]
    InvalidCompliance(String),

    /// The library-manager selector did not name a known mode.
    #[error("--library-manager flag value {0} not valid")]
    InvalidLibraryManagerMode(String),

    /// The project type filter did not name a known project type.
    #[error("--project-type flag value {0} not valid")]
    InvalidProjectType(String),

    /// An environment variable held a value that is not a boolean.
    #[error("{variable} environment variable value {value} not valid")]
    InvalidEnvironmentValue {
        /// Name of the environment variable.
        variable: String,
        /// The rejected value.
        value: String,
    },

    /// More than one mode of a single-select axis was overridden to true.
    #[error("conflicting {axis} overrides: {modes}")]
    ConflictingModes {
        /// The axis name (e.g. "compliance").
        axis: &'static str,
        /// Comma-separated names of the modes that were set together.
        modes: String,
    },

    /// The compliance axis resolved with no tier enabled.
    #[error("invalid compliance configuration: no compliance tier enabled")]
    NoComplianceTier,

    /// A rule's mode lists do not cover the active rule-modes.
    #[error("rule {0} is incorrectly configured")]
    RuleMisconfigured(String),
}
