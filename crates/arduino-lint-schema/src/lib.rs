//! # arduino-lint-schema: Schema Policy Layer for Arduino Lint
//!
//! Wraps a JSON Schema validator with what rule functions need to turn a
//! structural failure into a specific diagnostic.
//!
//! ## Modules
//!
//! - [`asset`]: where schema documents come from ([`AssetLoader`]).
//! - [`registry`]: compiles a primary schema with its references, once per
//!   name, keeping the raw documents alongside the validator.
//! - [`validate`]: first-failure validation with composition drill-down.
//! - [`diagnostics`]: predicates and the generic matcher over a
//!   [`ValidationResult`].
//! - [`tiered`]: one schema per compliance level.
//! - [`normalize`]: project files to the JSON value model.
//!
//! ## Error Model
//!
//! [`SchemaError`] means the tool's own schemas (or a rule author's
//! pattern) are broken and the run should stop. A project that fails
//! validation is never an error; it is a failing [`ValidationResult`].
//!
//! ## Crate Policy
//!
//! - Depends only on `arduino-lint-core` internally.
//! - Never reads schemas from anywhere but an [`AssetLoader`].
//! - Never resolves a `$ref` over the network.

pub mod asset;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod normalize;
pub mod registry;
pub mod tiered;
pub mod validate;

pub use asset::{AssetLoader, DirectoryAssets, EmbeddedAssets};
pub use diagnostics::MatchPattern;
pub use document::{DocumentStore, SchemaLocation};
pub use error::SchemaError;
pub use normalize::{
    json_document, library_properties_document, platform_txt_document, properties_to_map,
    tool_names, yaml_document, DocumentFormat, Properties,
};
pub use registry::{CompiledSchema, SchemaRegistry};
pub use tiered::{TieredSchema, TieredSchemaNames, TieredValidation};
pub use validate::{validate, Failure, FailureContext, ValidationResult};
