//! # arduino-lint-core: Rule-Mode Policy for Arduino Lint
//!
//! Decides which lint rules run for a project and how their failures are
//! reported. Every other crate in the workspace depends on this one; it
//! depends on nothing internal.
//!
//! ## Key Pieces
//!
//! 1. **[`ProjectType`]**: the lintable project kinds. Exhaustive `match`
//!    everywhere, so a new type forces every consumer to handle it.
//!
//! 2. **Rule-Mode Matrix** ([`rulemode`]): per-project-type defaults,
//!    run overrides, and [`resolve`], which applies single-select
//!    discipline to the compliance and Library Manager axes.
//!
//! 3. **[`Settings`]**: typed run configuration parsed from flag values and
//!    environment variables, producing the override map.
//!
//! 4. **[`RuleConfiguration`]**: per-rule enable/disable and level lists
//!    evaluated against the resolved modes, and [`run_rule`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `arduino-lint-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod project;
pub mod rule;
pub mod rulemode;
pub mod settings;

pub use error::ConfigError;
pub use project::{ProjectType, ProjectTypeFilter};
pub use rule::{run_rule, RuleConfiguration, RuleLevel, RuleOutcome, RuleReport};
pub use rulemode::{
    resolve, ComplianceLevel, LibraryManagerMode, RuleMode, RuleModeDefaults, RuleModeOverrides,
    RuleModes,
};
pub use settings::{parse_bool, LogFormat, RawSettings, Settings};
