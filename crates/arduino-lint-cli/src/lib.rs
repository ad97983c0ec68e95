//! # arduino-lint-cli: Arduino Lint Command-Line Interface
//!
//! Thin glue between command-line flags, the process environment, and the
//! library crates.
//!
//! ## Subcommands
//!
//! - `modes`: resolve and print the rule-modes for one or every project
//!   type.
//! - `validate`: validate a project file against a schema set and print
//!   the first failure.
//!
//! ## Exit Codes
//!
//! - `0`: success / document valid.
//! - `1`: the document failed validation.
//! - `2`: fatal error (bad flags, bad environment, broken schemas,
//!   unreadable input).
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; policy lives in `arduino-lint-core` and
//!   `arduino-lint-schema`.
//! - Reports go to stdout, logs to stderr.

pub mod logging;
pub mod modes;
pub mod validate;

/// Exit code for a document that failed validation.
pub const EXIT_INVALID: u8 = 1;
/// Exit code for a fatal error.
pub const EXIT_FATAL: u8 = 2;
