//! # Schema Registry
//!
//! Compiles a primary schema together with the schemas it references and
//! caches the result by primary name for the life of the registry.
//!
//! ## Two-Tier Representation
//!
//! Every [`CompiledSchema`] holds both:
//!
//! - the compiled `jsonschema::Validator` used for validation, and
//! - the parsed source documents ([`DocumentStore`]), keyed by the same
//!   `$id` URIs, used to read literal constraint values back when a
//!   failure needs explaining.
//!
//! ## Reference Resolution
//!
//! Cross-document `$ref`s are resolved by URI against the documents loaded
//! for this compilation only. A `$ref` to anything else fails the
//! compilation; the validator never reaches out to the network.
//!
//! ## Caching
//!
//! The cache lock is held across compilation, so concurrent first requests
//! for the same name produce exactly one compilation and every caller gets
//! the same `Arc`. A cache hit never touches the asset loader.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use jsonschema::{Draft, Retrieve, Uri, Validator};
use parking_lot::Mutex;
use serde_json::Value;

use crate::asset::AssetLoader;
use crate::document::{canonical_uri, fragment, DocumentStore, SchemaLocation};
use crate::error::SchemaError;

/// Resolves `$ref` URIs to documents already loaded for a compilation.
struct LocalSchemaRetriever {
    documents: Arc<DocumentStore>,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        match self.documents.get(uri_str) {
            Some(value) => Ok(value.as_ref().clone()),
            None => Err(format!("schema {uri_str} is not among the loaded references").into()),
        }
    }
}

fn build_validator(schema: &Value, documents: &Arc<DocumentStore>) -> Result<Validator, String> {
    let mut opts = jsonschema::options();
    opts.with_draft(Draft::Draft7);
    opts.with_retriever(LocalSchemaRetriever {
        documents: Arc::clone(documents),
    });
    opts.build(schema).map_err(|e| e.to_string())
}

/// A primary schema compiled with its references.
pub struct CompiledSchema {
    name: String,
    id: String,
    validator: Validator,
    documents: Arc<DocumentStore>,
    branches: Mutex<HashMap<SchemaLocation, Option<Arc<Validator>>>>,
    assertions: Mutex<HashMap<SchemaLocation, Option<Arc<Validator>>>>,
}

impl CompiledSchema {
    /// The primary schema's asset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The primary schema's canonical `$id`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The compiled validator.
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// The raw documents this schema was compiled from.
    pub fn documents(&self) -> &Arc<DocumentStore> {
        &self.documents
    }

    /// The primary document's root.
    pub fn root(&self) -> SchemaLocation {
        SchemaLocation::root(self.id.clone())
    }

    /// The sub-schema at `location` as a standalone validator, compiled on
    /// first use and cached with this schema.
    ///
    /// Used to re-run one branch of a composition keyword in isolation.
    pub(crate) fn subschema_validator(&self, location: &SchemaLocation) -> Option<Arc<Validator>> {
        let mut branches = self.branches.lock();
        if let Some(cached) = branches.get(location) {
            return cached.clone();
        }
        let validator = self.build_subschema(location).map(Arc::new);
        branches.insert(location.clone(), validator.clone());
        validator
    }

    /// A validator for the single keyword at `location` (e.g.
    /// `#/definitions/name/pattern`), compiled on first use and cached.
    pub(crate) fn assertion_validator(&self, location: &SchemaLocation) -> Option<Arc<Validator>> {
        let mut assertions = self.assertions.lock();
        if let Some(cached) = assertions.get(location) {
            return cached.clone();
        }
        let validator = self.build_assertion(location).map(Arc::new);
        assertions.insert(location.clone(), validator.clone());
        validator
    }

    fn build_assertion(&self, location: &SchemaLocation) -> Option<Validator> {
        let keyword = location.pointer.last()?;
        let value = self.documents.value_at(location)?;
        let mut assertion = serde_json::Map::new();
        assertion.insert(keyword.clone(), value.clone());
        build_validator(&Value::Object(assertion), &self.documents).ok()
    }

    fn build_subschema(&self, location: &SchemaLocation) -> Option<Validator> {
        let wrapper = serde_json::json!({
            "$ref": format!("{}{}", location.uri, fragment(&location.pointer)),
        });
        match build_validator(&wrapper, &self.documents) {
            Ok(validator) => Some(validator),
            Err(reason) => {
                tracing::debug!(
                    schema = %self.name,
                    location = %location.fragment(),
                    %reason,
                    "cannot compile sub-schema"
                );
                None
            }
        }
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("documents", &self.documents.len())
            .field("branches", &self.branches.lock().len())
            .finish_non_exhaustive()
    }
}

/// Loads and compiles schemas, caching one [`CompiledSchema`] per name.
pub struct SchemaRegistry {
    loader: Box<dyn AssetLoader>,
    compiled: Mutex<HashMap<String, Arc<CompiledSchema>>>,
}

impl SchemaRegistry {
    /// Creates an empty registry reading assets from `loader`.
    pub fn new(loader: impl AssetLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            compiled: Mutex::new(HashMap::new()),
        }
    }

    /// Compiles `primary` with `references` registered for `$ref`
    /// resolution, or returns the cached result of an earlier call.
    ///
    /// The reference list of a cached name is not consulted again.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::AssetNotFound`] if any named asset is missing.
    /// - [`SchemaError::MalformedJson`] if any asset is not JSON.
    /// - [`SchemaError::MissingId`] if any document lacks a string `$id`.
    /// - [`SchemaError::ReferenceCycle`] if a `$ref` chain loops.
    /// - [`SchemaError::Compile`] if the validator cannot be built, which
    ///   includes a `$ref` to a document not in `references`.
    pub fn compile(
        &self,
        primary: &str,
        references: &[&str],
    ) -> Result<Arc<CompiledSchema>, SchemaError> {
        let mut compiled = self.compiled.lock();
        if let Some(schema) = compiled.get(primary) {
            tracing::debug!(schema = primary, "schema cache hit");
            return Ok(Arc::clone(schema));
        }

        tracing::debug!(schema = primary, references = references.len(), "compiling schema");
        let schema = Arc::new(self.build(primary, references)?);
        compiled.insert(primary.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Returns true if `name` has already been compiled.
    pub fn is_compiled(&self, name: &str) -> bool {
        self.compiled.lock().contains_key(name)
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.compiled.lock().len()
    }

    /// Returns true if nothing has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.compiled.lock().is_empty()
    }

    /// The raw document with this URI, from any compiled schema.
    pub fn raw_document(&self, uri: &str) -> Option<Arc<Value>> {
        self.compiled
            .lock()
            .values()
            .find_map(|schema| schema.documents.get(uri).cloned())
    }

    fn build(&self, primary: &str, references: &[&str]) -> Result<CompiledSchema, SchemaError> {
        let mut documents = DocumentStore::default();
        for reference in references {
            let (id, document) = self.load_document(reference)?;
            documents.insert(reference, &id, document);
        }
        let (id, root) = self.load_document(primary)?;
        documents.insert(primary, &id, Arc::clone(&root));
        documents.check_reference_cycles()?;

        let documents = Arc::new(documents);
        let validator =
            build_validator(&root, &documents).map_err(|reason| SchemaError::Compile {
                schema: primary.to_string(),
                reason,
            })?;

        Ok(CompiledSchema {
            name: primary.to_string(),
            id: canonical_uri(&id),
            validator,
            documents,
            branches: Mutex::new(HashMap::new()),
            assertions: Mutex::new(HashMap::new()),
        })
    }

    fn load_document(&self, name: &str) -> Result<(String, Arc<Value>), SchemaError> {
        let bytes = self
            .loader
            .load(name)
            .ok_or_else(|| SchemaError::AssetNotFound(name.to_string()))?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| SchemaError::MalformedJson {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let id = value
            .get("$id")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::MissingId(name.to_string()))?
            .to_string();
        Ok((id, Arc::new(value)))
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("compiled", &self.len())
            .finish_non_exhaustive()
    }
}
