//! # Modes Subcommand
//!
//! Prints the resolved rule-mode mapping for each selected project type.
//!
//! ```bash
//! arduino-lint modes --project-type library --library-manager submit
//! ARDUINO_LINT_LIBRARY_MANAGER_INDEXING=true arduino-lint modes --format json
//! ```

use anyhow::{Context, Result};
use arduino_lint_core::{ProjectType, RawSettings, RuleModes, Settings};
use clap::{Args, ValueEnum};

/// Report format.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per project type.
    #[default]
    Text,
    /// A JSON array.
    Json,
}

/// Arguments for the modes subcommand.
#[derive(Args, Debug)]
pub struct ModesArgs {
    /// Project type: sketch, library, platform, package-index, or all.
    #[arg(long, default_value = "all")]
    pub project_type: String,

    /// Compliance tier: permissive, specification, or strict.
    #[arg(long)]
    pub compliance: Option<String>,

    /// Library Manager context: submit, update, or false.
    #[arg(long)]
    pub library_manager: Option<String>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl ModesArgs {
    /// The flag values this subcommand contributes to the run settings.
    pub fn raw_settings(&self) -> RawSettings {
        RawSettings {
            compliance: self.compliance.clone(),
            library_manager: self.library_manager.clone(),
            project_type: Some(self.project_type.clone()),
        }
    }
}

/// Execute the modes subcommand.
pub fn run_modes(args: &ModesArgs, settings: &Settings) -> Result<u8> {
    let resolved = resolve_all(settings)?;
    let report = match args.format {
        OutputFormat::Text => render_text(&resolved),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&resolved).context("cannot serialize rule-modes")?
        }
    };
    println!("{report}");
    Ok(0)
}

/// Resolves the modes of every project type the settings select.
pub fn resolve_all(settings: &Settings) -> Result<Vec<RuleModes>> {
    ProjectType::all()
        .iter()
        .filter(|project_type| settings.project_type.matches(**project_type))
        .map(|project_type| {
            settings
                .rule_modes(*project_type)
                .with_context(|| format!("cannot resolve rule-modes for {project_type}"))
        })
        .collect()
}

/// `type: mode=value ...`, one line per project type.
pub fn render_text(resolved: &[RuleModes]) -> String {
    resolved
        .iter()
        .map(|modes| {
            let values: Vec<String> = modes
                .iter()
                .map(|(mode, value)| format!("{}={value}", mode.as_str()))
                .collect();
            format!("{}: {}", modes.project_type(), values.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
