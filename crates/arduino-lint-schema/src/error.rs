//! Errors raised by the schema layer.
//!
//! All of these are fatal: they mean the tool's own schema assets are
//! broken, or a rule author passed a bad pattern. A project that fails a
//! structural check is not an error; it is a failing
//! [`ValidationResult`](crate::ValidationResult).

use thiserror::Error;

/// Errors returned by schema registry, validation, and normalization.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The asset loader has no asset by this name.
    #[error("schema asset not found: {0}")]
    AssetNotFound(String),

    /// A schema asset is not valid JSON.
    #[error("schema asset {name} is not valid JSON: {reason}")]
    MalformedJson {
        /// Asset name.
        name: String,
        /// Parser message.
        reason: String,
    },

    /// A schema document does not declare `$id`.
    #[error("schema asset {0} has no $id")]
    MissingId(String),

    /// The validator could not be built from the schema.
    #[error("failed to compile schema {schema}: {reason}")]
    Compile {
        /// Primary schema name.
        schema: String,
        /// Compiler message.
        reason: String,
    },

    /// A chain of `$ref`s leads back to itself without any constraint.
    #[error("reference cycle at {uri}#{pointer}")]
    ReferenceCycle {
        /// Document URI where the cycle was detected.
        uri: String,
        /// JSON pointer within that document.
        pointer: String,
    },

    /// A diagnostic pattern is not a valid regular expression.
    #[error("invalid diagnostic pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A properties-format line has no `=`.
    #[error("invalid properties line {line}: {text:?}, should be 'key=value'")]
    MalformedProperties {
        /// One-based line number.
        line: usize,
        /// The offending line.
        text: String,
    },

    /// A project data file could not be parsed.
    #[error("failed to load document {path}: {reason}")]
    DocumentLoadError {
        /// Path or label of the document.
        path: String,
        /// Parser message.
        reason: String,
    },
}
