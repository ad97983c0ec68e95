//! # arduino-lint CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use std::process::ExitCode;

use arduino_lint_cli::logging;
use arduino_lint_cli::modes::{run_modes, ModesArgs};
use arduino_lint_cli::validate::{run_validate, ValidateArgs};
use arduino_lint_cli::EXIT_FATAL;
use arduino_lint_core::{RawSettings, Settings};
use clap::{ArgAction, Parser};

/// Arduino project linter.
///
/// Resolves the rule-modes a lint run operates under and validates project
/// metadata files against their JSON schemas.
#[derive(Parser, Debug)]
#[command(name = "arduino-lint", version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the resolved rule-modes per project type.
    Modes(ModesArgs),
    /// Validate a project file against a schema.
    Validate(ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let raw = match &cli.command {
        Commands::Modes(args) => args.raw_settings(),
        Commands::Validate(_) => RawSettings::default(),
    };
    let settings = match Settings::from_raw(&raw, |key| std::env::var(key).ok()) {
        Ok(settings) => settings,
        Err(e) => {
            logging::init_fallback();
            tracing::error!("{e}");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    if let Err(e) = logging::init(cli.verbose, &settings) {
        logging::init_fallback();
        tracing::error!("{e:#}");
        return ExitCode::from(EXIT_FATAL);
    }

    let outcome = match &cli.command {
        Commands::Modes(args) => run_modes(args, &settings),
        Commands::Validate(args) => run_validate(args),
    };

    match outcome {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_modes() {
        let cli = Cli::try_parse_from([
            "arduino-lint",
            "-vv",
            "modes",
            "--project-type",
            "library",
            "--library-manager",
            "submit",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Modes(args) = cli.command else {
            panic!("expected modes");
        };
        let raw = args.raw_settings();
        assert_eq!(raw.project_type.as_deref(), Some("library"));
        assert_eq!(raw.library_manager.as_deref(), Some("submit"));
        assert_eq!(raw.compliance, None);
    }

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from([
            "arduino-lint",
            "validate",
            "--schema-dir",
            "schemas",
            "--schema",
            "primary.json",
            "--reference",
            "a.json",
            "--reference",
            "b.json",
            "--format",
            "platform-txt",
            "platform.txt",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.references, vec!["a.json", "b.json"]);
        assert_eq!(args.file.to_str(), Some("platform.txt"));
    }

    #[test]
    fn test_validate_requires_format() {
        let parsed = Cli::try_parse_from([
            "arduino-lint",
            "validate",
            "--schema-dir",
            "schemas",
            "--schema",
            "primary.json",
            "file.txt",
        ]);
        assert!(parsed.is_err());
    }
}
