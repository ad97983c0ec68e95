//! # Validate Subcommand
//!
//! Validates one project file against a schema (plus its references) read
//! from a directory, and prints the first failure.
//!
//! ```bash
//! arduino-lint validate --schema-dir etc/schemas \
//!     --schema arduino-library-properties-schema.json \
//!     --reference general-definitions-schema.json \
//!     --reference arduino-library-properties-definitions-schema.json \
//!     --format properties library.properties
//! ```

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use arduino_lint_schema::{
    validate, DirectoryAssets, DocumentFormat, Failure, SchemaRegistry, ValidationResult,
};
use clap::{Args, ValueEnum};

use crate::EXIT_INVALID;

/// Input file format.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    /// Flat `key=value` properties (`library.properties`).
    Properties,
    /// `platform.txt`: flat except `tools.*`.
    PlatformTxt,
    /// JSON (package indexes).
    Json,
    /// YAML (sketch project files).
    Yaml,
}

impl From<FormatArg> for DocumentFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Properties => Self::Properties,
            FormatArg::PlatformTxt => Self::PlatformTxt,
            FormatArg::Json => Self::Json,
            FormatArg::Yaml => Self::Yaml,
        }
    }
}

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Directory containing the schema documents.
    #[arg(long)]
    pub schema_dir: PathBuf,

    /// Primary schema file name.
    #[arg(long)]
    pub schema: String,

    /// Referenced schema file name. Repeatable.
    #[arg(long = "reference")]
    pub references: Vec<String>,

    /// Format of the input file.
    #[arg(long, value_enum)]
    pub format: FormatArg,

    /// The file to validate.
    pub file: PathBuf,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let registry = SchemaRegistry::new(DirectoryAssets::new(&args.schema_dir));
    let references: Vec<&str> = args.references.iter().map(String::as_str).collect();
    let schema = registry
        .compile(&args.schema, &references)
        .with_context(|| format!("cannot load schema {}", args.schema))?;

    let document = DocumentFormat::from(args.format)
        .load(&args.file)
        .context("cannot load input")?;

    let result = validate(&document, &schema);
    println!("{}", render(&result));
    if result.is_success() {
        Ok(0)
    } else {
        Ok(EXIT_INVALID)
    }
}

/// `valid`, or the failure followed by any composition causes.
pub fn render(result: &ValidationResult) -> String {
    let Some(failure) = result.failure() else {
        return "valid".to_string();
    };

    let mut out = String::new();
    render_failure(&mut out, result, failure, "");
    for cause in failure.causes.iter().flat_map(Failure::iter) {
        let _ = writeln!(out, "caused by:");
        render_failure(&mut out, result, cause, "  ");
    }
    out.trim_end().to_string()
}

fn render_failure(out: &mut String, result: &ValidationResult, failure: &Failure, indent: &str) {
    let _ = writeln!(out, "{indent}instance pointer: {}", failure.instance_pointer);
    let _ = writeln!(out, "{indent}schema: {}{}", failure.schema_uri, failure.schema_pointer);
    let literal = result
        .constraint_of(failure)
        .map(ToString::to_string)
        .unwrap_or_default();
    let _ = writeln!(out, "{indent}constraint: {literal}");
    let context = failure.context.to_string();
    if !context.is_empty() {
        let _ = writeln!(out, "{indent}context: {context}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_success() {
        assert_eq!(render(&ValidationResult::default()), "valid");
    }

    #[test]
    fn test_format_mapping() {
        assert_eq!(DocumentFormat::from(FormatArg::PlatformTxt), DocumentFormat::PlatformTxt);
        assert_eq!(DocumentFormat::from(FormatArg::Yaml), DocumentFormat::Yaml);
    }
}
