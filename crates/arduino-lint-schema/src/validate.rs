//! # Validation
//!
//! Runs a [`CompiledSchema`] against a normalized document and keeps only
//! the first failure, described by:
//!
//! - the instance pointer of the offending value,
//! - the pointer of the violated keyword inside the document that holds it
//!   (after following `$ref`s) together with that document's URI,
//! - a context for compound keywords (`required`, `dependencies`,
//!   `additionalProperties`).
//!
//! ## Composition Keywords
//!
//! A failed `anyOf`/`oneOf` says nothing about *why* no branch matched.
//! Each branch is re-validated on its own and the failure that reaches
//! deepest into the instance becomes the representative (earliest branch on
//! ties). Failures of the other branches are kept as
//! [`causes`](Failure::causes) so the diagnostics matcher can still find
//! them.
//!
//! A failed `not` means its sub-schema matched. The assertions inside it
//! that hold for the instance (a `pattern`, an `enum`, ...) are attached as
//! causes, so a query can look below the inversion.

use std::fmt;
use std::sync::Arc;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use serde_json::Value;

use crate::document::{fragment, parse_pointer, DocumentStore, SchemaLocation};
use crate::registry::CompiledSchema;

/// Deepest composition nesting followed when looking for a branch failure.
const MAX_COMPOSITION_DEPTH: usize = 16;

/// Extra information attached to failures of compound keywords.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FailureContext {
    /// No extra information.
    #[default]
    None,
    /// `required`: the properties that are absent.
    Required {
        /// Pointers to the missing properties, e.g. `#/name`.
        missing: Vec<String>,
    },
    /// `dependencies`: `property` is present but what it depends on is not.
    Dependency {
        /// The property whose dependency is unmet.
        property: String,
        /// Pointers to the missing dependencies.
        missing: Vec<String>,
    },
    /// `additionalProperties: false`: properties the schema does not know.
    AdditionalProperties {
        /// Pointers to the unexpected properties.
        unexpected: Vec<String>,
    },
}

impl FailureContext {
    /// The individual items a context pattern is matched against.
    pub fn items(&self) -> &[String] {
        match self {
            Self::None => &[],
            Self::Required { missing } | Self::Dependency { missing, .. } => missing,
            Self::AdditionalProperties { unexpected } => unexpected,
        }
    }
}

impl fmt::Display for FailureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Required { missing } => write!(f, "missing: {}", missing.join(", ")),
            Self::Dependency { property, missing } => {
                write!(f, "{property} requires: {}", missing.join(", "))
            }
            Self::AdditionalProperties { unexpected } => {
                write!(f, "unexpected: {}", unexpected.join(", "))
            }
        }
    }
}

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Pointer into the instance, e.g. `#/name`.
    pub instance_pointer: String,
    /// Pointer to the violated keyword in the document at `schema_uri`,
    /// e.g. `#/definitions/nameObject/pattern`.
    pub schema_pointer: String,
    /// URI of the schema document holding the keyword.
    pub schema_uri: String,
    /// Path from the primary schema root to the keyword, `$ref`s included.
    pub keyword_path: String,
    /// Compound keyword details.
    pub context: FailureContext,
    /// Failures of composition branches not chosen as representative.
    pub causes: Vec<Failure>,
}

impl Failure {
    /// The violated keyword: the last segment of the schema pointer.
    pub fn keyword(&self) -> &str {
        self.schema_pointer
            .rsplit_once('/')
            .map_or("", |(_, keyword)| keyword)
    }

    /// This failure followed by all causes, depth-first.
    pub fn iter(&self) -> FailureIter<'_> {
        FailureIter { stack: vec![self] }
    }

    fn depth(&self) -> usize {
        self.instance_pointer.matches('/').count()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violates {}{}", self.instance_pointer, self.schema_uri, self.schema_pointer)?;
        if self.context != FailureContext::None {
            write!(f, " ({})", self.context)?;
        }
        Ok(())
    }
}

/// Depth-first iterator over a failure and its causes.
#[derive(Debug)]
pub struct FailureIter<'a> {
    stack: Vec<&'a Failure>,
}

impl<'a> Iterator for FailureIter<'a> {
    type Item = &'a Failure;

    fn next(&mut self) -> Option<Self::Item> {
        let failure = self.stack.pop()?;
        self.stack.extend(failure.causes.iter().rev());
        Some(failure)
    }
}

/// The outcome of one validation: success, or the first failure.
///
/// `ValidationResult::default()` is a success and also stands in for
/// "validation never ran".
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    failure: Option<Failure>,
    documents: Option<Arc<DocumentStore>>,
}

impl ValidationResult {
    /// A success.
    pub fn success() -> Self {
        Self::default()
    }

    /// Returns true if there is no failure.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// The first failure, if any.
    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// The raw schema documents the failure refers to.
    pub fn documents(&self) -> Option<&Arc<DocumentStore>> {
        self.documents.as_ref()
    }
}

/// Validates `document` against `schema`, keeping the first failure.
pub fn validate(document: &Value, schema: &CompiledSchema) -> ValidationResult {
    let frame = Frame {
        start: schema.root(),
        keyword_prefix: Vec::new(),
        instance_prefix: Vec::new(),
        branch: false,
    };
    let failure = first_failure(schema, schema.validator(), document, &frame, 0);
    if let Some(failure) = &failure {
        tracing::debug!(schema = schema.name(), %failure, "validation failed");
    }
    ValidationResult {
        failure,
        documents: Some(Arc::clone(schema.documents())),
    }
}

/// Where a validator's paths are anchored.
struct Frame {
    /// Schema location the validator's root corresponds to.
    start: SchemaLocation,
    /// Keyword path from the primary root to `start`.
    keyword_prefix: Vec<String>,
    /// Instance pointer of the value being validated.
    instance_prefix: Vec<String>,
    /// The validator is a `$ref` wrapper around a branch.
    branch: bool,
}

fn segments(location: &impl ToString) -> Vec<String> {
    parse_pointer(&location.to_string()).unwrap_or_default()
}

fn first_failure(
    schema: &CompiledSchema,
    validator: &Validator,
    instance: &Value,
    frame: &Frame,
    depth: usize,
) -> Option<Failure> {
    let mut errors = validator.iter_errors(instance).peekable();
    let first = errors.next()?;

    let instance_segments = segments(&first.instance_path);
    let mut schema_segments = segments(&first.schema_path);
    if frame.branch && schema_segments.first().map(String::as_str) == Some("$ref") {
        schema_segments.remove(0);
    }

    let mut full_instance = frame.instance_prefix.clone();
    full_instance.extend(instance_segments);

    let mut context = context_of(&first, &full_instance);
    if let FailureContext::Required { missing } = &mut context {
        let instance_path = first.instance_path.to_string();
        let schema_path = first.schema_path.to_string();
        while let Some(next) = errors.peek() {
            let same_node = next.instance_path.to_string() == instance_path
                && next.schema_path.to_string() == schema_path;
            match &next.kind {
                ValidationErrorKind::Required { property, .. } if same_node => {
                    missing.extend(required_pointer(property, &full_instance));
                    errors.next();
                }
                _ => break,
            }
        }
    }

    let dependency_index = schema_segments
        .iter()
        .position(|s| s == "dependencies" || s == "dependentRequired");
    let dependency = match (&context, dependency_index) {
        (FailureContext::Required { missing }, Some(index)) => Some((index, missing.clone())),
        _ => None,
    };
    if let Some((index, missing)) = dependency {
        let (property, trimmed) =
            dependency_of(schema, frame, &schema_segments, index, &first, &missing);
        schema_segments = trimmed;
        context = FailureContext::Dependency { property, missing };
    }

    let keyword = schema_segments.last().map(String::as_str);
    let negated = keyword == Some("not");
    if matches!(keyword, Some("anyOf" | "oneOf")) && depth < MAX_COMPOSITION_DEPTH {
        let branch =
            branch_failure(schema, frame, &schema_segments, &first, &full_instance, depth);
        if branch.is_some() {
            return branch;
        }
    }

    let causes = if negated {
        negation_matches(schema, frame, &schema_segments, &first.instance, &full_instance)
    } else {
        Vec::new()
    };
    let mut failure = make_failure(schema, frame, schema_segments, full_instance, context);
    failure.causes = causes;
    Some(failure)
}

fn make_failure(
    schema: &CompiledSchema,
    frame: &Frame,
    schema_segments: Vec<String>,
    instance_segments: Vec<String>,
    context: FailureContext,
) -> Failure {
    let location = schema
        .documents()
        .locate(&frame.start, &schema_segments)
        .unwrap_or_else(|| frame.start.join(schema_segments.iter().cloned()));

    let mut keyword_path = frame.keyword_prefix.clone();
    keyword_path.extend(schema_segments);

    Failure {
        instance_pointer: fragment(&instance_segments),
        schema_pointer: location.fragment(),
        schema_uri: location.uri,
        keyword_path: fragment(&keyword_path),
        context,
        causes: Vec::new(),
    }
}

fn context_of(error: &ValidationError<'_>, instance: &[String]) -> FailureContext {
    match &error.kind {
        ValidationErrorKind::Required { property, .. } => FailureContext::Required {
            missing: required_pointer(property, instance).into_iter().collect(),
        },
        ValidationErrorKind::AdditionalProperties { unexpected, .. } => {
            FailureContext::AdditionalProperties {
                unexpected: unexpected.iter().map(|name| child_pointer(instance, name)).collect(),
            }
        }
        _ => FailureContext::None,
    }
}

fn required_pointer(property: &Value, instance: &[String]) -> Option<String> {
    property.as_str().map(|name| child_pointer(instance, name))
}

fn child_pointer(instance: &[String], name: &str) -> String {
    let mut path = instance.to_vec();
    path.push(name.to_string());
    fragment(&path)
}

/// Works out which property's dependency failed and trims the schema path
/// to `.../dependencies/<property>`.
fn dependency_of(
    schema: &CompiledSchema,
    frame: &Frame,
    schema_segments: &[String],
    index: usize,
    error: &ValidationError<'_>,
    missing: &[String],
) -> (String, Vec<String>) {
    let mut trimmed = schema_segments[..=index].to_vec();

    let node = schema
        .documents()
        .locate(&frame.start, &trimmed)
        .and_then(|location| schema.documents().value_at(&location));
    let dependencies = node.and_then(Value::as_object);
    let object = error.instance.as_object();

    let named = schema_segments
        .get(index + 1)
        .filter(|key| dependencies.is_some_and(|d| d.contains_key(key.as_str())))
        .cloned();
    let property = named.or_else(|| {
        let object = object?;
        dependencies?.iter().find_map(|(key, required)| {
            let unmet = object.contains_key(key)
                && required.as_array()?.iter().filter_map(Value::as_str).any(|dependency| {
                    !object.contains_key(dependency)
                        && missing.iter().any(|m| m.ends_with(&format!("/{dependency}")))
                });
            unmet.then(|| key.clone())
        })
    });

    match property {
        Some(property) => {
            trimmed.push(property.clone());
            (property, trimmed)
        }
        None => (String::new(), schema_segments.to_vec()),
    }
}

/// The assertions inside a failed `not` that the instance satisfies.
fn negation_matches(
    schema: &CompiledSchema,
    frame: &Frame,
    schema_segments: &[String],
    instance: &Value,
    instance_segments: &[String],
) -> Vec<Failure> {
    let Some(location) = schema.documents().locate(&frame.start, schema_segments) else {
        return Vec::new();
    };
    let mut keyword_path = frame.keyword_prefix.clone();
    keyword_path.extend(schema_segments.iter().cloned());

    let mut matches = Vec::new();
    let target = Negated {
        schema,
        instance,
        instance_pointer: fragment(instance_segments),
    };
    target.collect(location, keyword_path, 0, &mut matches);
    matches
}

/// The instance value a `not` sub-schema matched.
struct Negated<'a> {
    schema: &'a CompiledSchema,
    instance: &'a Value,
    instance_pointer: String,
}

impl Negated<'_> {
    fn collect(
        &self,
        location: SchemaLocation,
        keyword_path: Vec<String>,
        depth: usize,
        out: &mut Vec<Failure>,
    ) {
        if depth > MAX_COMPOSITION_DEPTH {
            return;
        }
        let documents = self.schema.documents();
        let Some(node) = documents.value_at(&location) else {
            return;
        };
        if let Some(target) = documents.follow(node, &location.uri) {
            let mut path = keyword_path.clone();
            path.push("$ref".to_string());
            self.collect(target, path, depth + 1, out);
        }
        let Some(map) = node.as_object() else {
            return;
        };

        for (keyword, value) in map {
            if keyword == "allOf" {
                let count = value.as_array().map_or(0, Vec::len);
                for index in 0..count {
                    let mut path = keyword_path.clone();
                    path.extend(["allOf".to_string(), index.to_string()]);
                    let branch = location.join(["allOf".to_string(), index.to_string()]);
                    self.collect(branch, path, depth + 1, out);
                }
                continue;
            }
            if !applies(keyword, self.instance) {
                continue;
            }
            let held = location.join([keyword.as_str()]);
            let holds = self
                .schema
                .assertion_validator(&held)
                .is_some_and(|validator| validator.is_valid(self.instance));
            if !holds {
                continue;
            }
            let mut path = keyword_path.clone();
            path.push(keyword.clone());
            out.push(Failure {
                instance_pointer: self.instance_pointer.clone(),
                schema_pointer: held.fragment(),
                schema_uri: held.uri,
                keyword_path: fragment(&path),
                context: FailureContext::None,
                causes: Vec::new(),
            });
        }
    }
}

/// Returns true if `keyword` is an assertion that constrains `instance`'s type.
fn applies(keyword: &str, instance: &Value) -> bool {
    match keyword {
        "enum" | "const" | "type" => true,
        "pattern" | "minLength" | "maxLength" | "format" => instance.is_string(),
        "minimum" | "maximum" | "exclusiveMinimum" | "exclusiveMaximum" | "multipleOf" => {
            instance.is_number()
        }
        "required" | "minProperties" | "maxProperties" => instance.is_object(),
        "minItems" | "maxItems" | "uniqueItems" => instance.is_array(),
        _ => false,
    }
}

fn branch_failure(
    schema: &CompiledSchema,
    frame: &Frame,
    schema_segments: &[String],
    error: &ValidationError<'_>,
    instance_segments: &[String],
    depth: usize,
) -> Option<Failure> {
    let location = schema.documents().locate(&frame.start, schema_segments)?;
    let branch_count = schema.documents().value_at(&location)?.as_array()?.len();
    let sub_instance: &Value = &error.instance;

    let mut failures = Vec::new();
    for index in 0..branch_count {
        let branch_location = location.join([index.to_string()]);
        let Some(validator) = schema.subschema_validator(&branch_location) else {
            return None;
        };
        let mut keyword_prefix = frame.keyword_prefix.clone();
        keyword_prefix.extend(schema_segments.iter().cloned());
        keyword_prefix.push(index.to_string());
        let branch_frame = Frame {
            start: branch_location,
            keyword_prefix,
            instance_prefix: instance_segments.to_vec(),
            branch: true,
        };
        if let Some(failure) = first_failure(schema, &validator, sub_instance, &branch_frame, depth + 1) {
            failures.push(failure);
        }
    }

    let chosen = failures
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.depth().cmp(&b.depth()).then(ib.cmp(ia)))
        .map(|(index, _)| index)?;
    let mut representative = failures.remove(chosen);
    tracing::trace!(
        keyword = %fragment(schema_segments),
        branches = branch_count,
        chosen = %representative.keyword_path,
        "resolved composition failure"
    );
    representative.causes.extend(failures);
    Some(representative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SchemaRegistry;
    use serde_json::json;
    use std::collections::HashMap;

    const ID: &str = "https://example.com/inline.json";

    fn compile(schema: Value) -> Arc<CompiledSchema> {
        let mut assets = HashMap::new();
        assets.insert("inline.json".to_string(), schema.to_string().into_bytes());
        SchemaRegistry::new(assets).compile("inline.json", &[]).unwrap()
    }

    #[test]
    fn test_success() {
        let schema = compile(json!({"$id": ID, "type": "object"}));
        let result = validate(&json!({}), &schema);
        assert!(result.is_success());
        assert!(result.failure().is_none());
    }

    #[test]
    fn test_required_properties_are_aggregated() {
        let schema = compile(json!({"$id": ID, "required": ["a", "b"]}));
        let result = validate(&json!({}), &schema);
        let failure = result.failure().unwrap();
        assert_eq!(failure.instance_pointer, "#");
        assert_eq!(failure.schema_pointer, "#/required");
        assert_eq!(failure.keyword(), "required");
        assert_eq!(
            failure.context,
            FailureContext::Required {
                missing: vec!["#/a".to_string(), "#/b".to_string()]
            }
        );
    }

    #[test]
    fn test_nested_pointers() {
        let schema = compile(json!({
            "$id": ID,
            "properties": {"tools": {"properties": {"cmd": {"type": "string"}}}}
        }));
        let result = validate(&json!({"tools": {"cmd": 1}}), &schema);
        let failure = result.failure().unwrap();
        assert_eq!(failure.instance_pointer, "#/tools/cmd");
        assert_eq!(failure.schema_pointer, "#/properties/tools/properties/cmd/type");
        assert_eq!(failure.schema_uri, ID);
    }

    #[test]
    fn test_additional_properties_context() {
        let schema = compile(json!({
            "$id": ID,
            "properties": {"name": {}},
            "additionalProperties": false
        }));
        let result = validate(&json!({"name": 1, "nmae": 2}), &schema);
        let failure = result.failure().unwrap();
        assert_eq!(failure.keyword(), "additionalProperties");
        assert_eq!(
            failure.context,
            FailureContext::AdditionalProperties {
                unexpected: vec!["#/nmae".to_string()]
            }
        );
    }

    #[test]
    fn test_dependency_context() {
        let schema = compile(json!({
            "$id": ID,
            "dependencies": {"a": ["b"]}
        }));
        let result = validate(&json!({"a": 1}), &schema);
        let failure = result.failure().unwrap();
        assert_eq!(failure.schema_pointer, "#/dependencies/a");
        assert_eq!(
            failure.context,
            FailureContext::Dependency {
                property: "a".to_string(),
                missing: vec!["#/b".to_string()]
            }
        );
    }

    #[test]
    fn test_not_lists_matched_assertions() {
        let schema = compile(json!({
            "$id": ID,
            "properties": {"p": {"not": {"type": "string", "pattern": "^[A-Z]", "maxLength": 1}}}
        }));
        let result = validate(&json!({"p": "Abc"}), &schema);
        let failure = result.failure().unwrap();
        assert_eq!(failure.schema_pointer, "#/properties/p/not");
        let matched: Vec<&str> = failure.causes.iter().map(Failure::keyword).collect();
        assert!(matched.contains(&"pattern"), "{matched:?}");
        assert!(matched.contains(&"type"), "{matched:?}");
        assert!(!matched.contains(&"maxLength"), "{matched:?}");
        let pattern = failure.causes.iter().find(|c| c.keyword() == "pattern").unwrap();
        assert_eq!(pattern.instance_pointer, "#/p");
        assert_eq!(pattern.schema_pointer, "#/properties/p/not/pattern");
        assert_eq!(pattern.keyword_path, "#/properties/p/not/pattern");
    }

    #[test]
    fn test_any_of_picks_deepest_branch() {
        let schema = compile(json!({
            "$id": ID,
            "anyOf": [
                {"type": "string"},
                {"properties": {"x": {"minimum": 5}}}
            ]
        }));
        let result = validate(&json!({"x": 1}), &schema);
        let failure = result.failure().unwrap();
        assert_eq!(failure.instance_pointer, "#/x");
        assert_eq!(failure.schema_pointer, "#/anyOf/1/properties/x/minimum");
        assert_eq!(failure.keyword_path, "#/anyOf/1/properties/x/minimum");
        assert_eq!(failure.causes.len(), 1);
        assert_eq!(failure.causes[0].schema_pointer, "#/anyOf/0/type");
    }

    #[test]
    fn test_any_of_tie_prefers_first_branch() {
        let schema = compile(json!({
            "$id": ID,
            "oneOf": [{"enum": ["a"]}, {"pattern": "^b"}]
        }));
        let result = validate(&json!("c"), &schema);
        let failure = result.failure().unwrap();
        assert_eq!(failure.keyword(), "enum");
        let keywords: Vec<&str> = failure.iter().map(Failure::keyword).collect();
        assert_eq!(keywords, vec!["enum", "pattern"]);
    }

    #[test]
    fn test_one_of_multiple_valid_reports_composition() {
        let schema = compile(json!({
            "$id": ID,
            "oneOf": [{"type": "string"}, {"minLength": 1}]
        }));
        let result = validate(&json!("x"), &schema);
        let failure = result.failure().unwrap();
        assert_eq!(failure.schema_pointer, "#/oneOf");
        assert!(failure.causes.is_empty());
    }

    #[test]
    fn test_failure_display() {
        let failure = Failure {
            instance_pointer: "#".to_string(),
            schema_pointer: "#/required".to_string(),
            schema_uri: ID.to_string(),
            keyword_path: "#/required".to_string(),
            context: FailureContext::Required {
                missing: vec!["#/name".to_string()],
            },
            causes: Vec::new(),
        };
        assert_eq!(
            failure.to_string(),
            "# violates https://example.com/inline.json#/required (missing: #/name)"
        );
    }
}
