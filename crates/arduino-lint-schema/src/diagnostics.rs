//! # Diagnostics Query API
//!
//! Questions rule functions ask of a [`ValidationResult`]. Every query
//! treats a success (or a result that never ran) as "no violation".
//!
//! Property names are paths relative to the document root, `/`-separated
//! for nested mappings (`tools/avrdude/cmd`). A query about a property
//! looks at the representative failure and its composition causes.

use regex::Regex;
use serde_json::Value;

use crate::document::{parse_pointer, SchemaLocation};
use crate::error::SchemaError;
use crate::validate::{Failure, FailureContext, ValidationResult};

fn property_pointer(name: &str) -> String {
    format!("#/{name}")
}

impl ValidationResult {
    /// The failure and all its causes, depth-first. Empty on success.
    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.failure().into_iter().flat_map(Failure::iter)
    }

    fn property_keyword_failed(&self, name: &str, keyword: &str) -> bool {
        let pointer = property_pointer(name);
        self.failures()
            .any(|failure| failure.instance_pointer == pointer && failure.keyword() == keyword)
    }

    /// Returns true if `name` is listed as a missing required property.
    pub fn required_property_missing(&self, name: &str) -> bool {
        let pointer = property_pointer(name);
        self.failures().any(|failure| {
            failure.keyword() == "required"
                && matches!(&failure.context, FailureContext::Required { missing } if missing.contains(&pointer))
        })
    }

    /// Returns true if `name` does not match its `pattern`.
    pub fn property_pattern_mismatch(&self, name: &str) -> bool {
        self.property_keyword_failed(name, "pattern")
    }

    /// Returns true if `name` is shorter than its `minLength`.
    pub fn property_less_than_min_length(&self, name: &str) -> bool {
        self.property_keyword_failed(name, "minLength")
    }

    /// Returns true if `name` is longer than its `maxLength`.
    pub fn property_greater_than_max_length(&self, name: &str) -> bool {
        self.property_keyword_failed(name, "maxLength")
    }

    /// Returns true if `name` is not one of its `enum` values.
    pub fn property_enum_mismatch(&self, name: &str) -> bool {
        self.property_keyword_failed(name, "enum")
    }

    /// Returns true if `name` is present but a property it depends on is not.
    pub fn property_dependencies_missing(&self, name: &str) -> bool {
        let suffix = format!("/dependencies/{name}");
        self.failures().any(|failure| match &failure.context {
            FailureContext::Dependency { property, .. } => property == name,
            _ => failure.schema_pointer.ends_with(&suffix),
        })
    }

    /// Returns true if a property was rejected by `additionalProperties`.
    pub fn misspelled_optional_property_found(&self) -> bool {
        self.failures().any(|failure| {
            failure.keyword() == "additionalProperties"
                && matches!(failure.context, FailureContext::AdditionalProperties { .. })
        })
    }

    /// The literal value of the violated keyword in the raw schema
    /// document, e.g. the regex source of a failed `pattern`.
    pub fn schema_pointer_value(&self) -> Option<&Value> {
        self.constraint_of(self.failure()?)
    }

    /// The literal value of `keyword` that `name` failed, searching the
    /// failure and its causes.
    pub fn expected_constraint(&self, name: &str, keyword: &str) -> Option<&Value> {
        let pointer = property_pointer(name);
        let failure = self
            .failures()
            .find(|failure| failure.instance_pointer == pointer && failure.keyword() == keyword)?;
        self.constraint_of(failure)
    }

    /// The literal value of the keyword `failure` violated, read from the
    /// raw schema document.
    pub fn constraint_of(&self, failure: &Failure) -> Option<&Value> {
        let location = SchemaLocation {
            uri: failure.schema_uri.clone(),
            pointer: parse_pointer(&failure.schema_pointer)?,
        };
        self.documents()?.value_at(&location)
    }

    /// The general-purpose matcher. See [`MatchPattern`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidPattern`] if any pattern is not a valid
    /// regular expression.
    pub fn validation_error_match(
        &self,
        instance_pointer: &str,
        schema_pointer: &str,
        schema_pointer_value: &str,
        context: &str,
    ) -> Result<bool, SchemaError> {
        let pattern = MatchPattern::new(instance_pointer, schema_pointer, schema_pointer_value, context)?;
        Ok(pattern.matches(self))
    }
}

/// Four regular expressions matched against a failure.
///
/// - instance pointer (`#/name`),
/// - schema pointer (`#/definitions/nameObject/pattern`),
/// - the violated keyword's literal value, JSON-encoded (`"^[a-z]+$"`
///   including the quotes),
/// - each item of the failure context (`#/missingProperty`).
///
/// An empty pattern matches anything. A pattern made entirely of empty
/// expressions matches every result, success included, so "no violation of
/// this kind" and "this violation" share one call shape. Otherwise a
/// success never matches, and a failure matches if it or any of its causes
/// satisfies all four expressions.
#[derive(Debug, Clone)]
pub struct MatchPattern {
    instance_pointer: Option<Regex>,
    schema_pointer: Option<Regex>,
    schema_pointer_value: Option<Regex>,
    context: Option<Regex>,
}

fn compile(pattern: &str) -> Result<Option<Regex>, SchemaError> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Ok(Some(Regex::new(pattern)?))
}

fn is_match(regex: &Option<Regex>, text: &str) -> bool {
    regex.as_ref().map_or(true, |regex| regex.is_match(text))
}

impl MatchPattern {
    /// Compiles the four expressions.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidPattern`] for an invalid expression.
    pub fn new(
        instance_pointer: &str,
        schema_pointer: &str,
        schema_pointer_value: &str,
        context: &str,
    ) -> Result<Self, SchemaError> {
        Ok(Self {
            instance_pointer: compile(instance_pointer)?,
            schema_pointer: compile(schema_pointer)?,
            schema_pointer_value: compile(schema_pointer_value)?,
            context: compile(context)?,
        })
    }

    /// Returns true if every expression is empty.
    pub fn is_empty(&self) -> bool {
        self.instance_pointer.is_none()
            && self.schema_pointer.is_none()
            && self.schema_pointer_value.is_none()
            && self.context.is_none()
    }

    /// Matches against a validation result.
    pub fn matches(&self, result: &ValidationResult) -> bool {
        if self.is_empty() {
            return true;
        }
        let matched = result.failures().any(|failure| self.matches_failure(result, failure));
        tracing::trace!(matched, "validation error match");
        matched
    }

    fn matches_failure(&self, result: &ValidationResult, failure: &Failure) -> bool {
        if !is_match(&self.instance_pointer, &failure.instance_pointer)
            || !is_match(&self.schema_pointer, &failure.schema_pointer)
        {
            return false;
        }

        if self.schema_pointer_value.is_some() {
            let literal = result
                .constraint_of(failure)
                .map(Value::to_string)
                .unwrap_or_default();
            if !is_match(&self.schema_pointer_value, &literal) {
                return false;
            }
        }

        let items = failure.context.items();
        if items.is_empty() {
            is_match(&self.context, "")
        } else {
            items.iter().any(|item| is_match(&self.context, item))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SchemaRegistry;
    use crate::validate::validate;
    use serde_json::json;
    use std::collections::HashMap;

    fn result(document: Value) -> ValidationResult {
        let schema = json!({
            "$id": "https://example.com/diagnostics.json",
            "properties": {
                "name": {"type": "string", "pattern": "^[a-z]+$", "maxLength": 8},
                "tools": {"properties": {"cmd": {"minLength": 2}}}
            },
            "required": ["name"]
        });
        let mut assets = HashMap::new();
        assets.insert("diagnostics.json".to_string(), schema.to_string().into_bytes());
        let registry = SchemaRegistry::new(assets);
        let compiled = registry.compile("diagnostics.json", &[]).unwrap();
        validate(&document, &compiled)
    }

    #[test]
    fn test_never_ran_is_no_violation() {
        let result = ValidationResult::default();
        assert!(!result.required_property_missing("name"));
        assert!(!result.property_pattern_mismatch("name"));
        assert!(!result.misspelled_optional_property_found());
        assert!(result.schema_pointer_value().is_none());
        assert!(result.validation_error_match("", "", "", "").unwrap());
        assert!(!result.validation_error_match(".*", "", "", "").unwrap());
    }

    #[test]
    fn test_nested_property_path() {
        let result = result(json!({"name": "ok", "tools": {"cmd": "x"}}));
        assert!(result.property_less_than_min_length("tools/cmd"));
        assert!(!result.property_less_than_min_length("cmd"));
        assert_eq!(result.expected_constraint("tools/cmd", "minLength"), Some(&json!(2)));
        assert_eq!(result.expected_constraint("tools/cmd", "pattern"), None);
    }

    #[test]
    fn test_schema_pointer_value_is_literal() {
        let result = result(json!({"name": "NOPE"}));
        assert!(result.property_pattern_mismatch("name"));
        assert_eq!(result.schema_pointer_value(), Some(&json!("^[a-z]+$")));
        assert!(result
            .validation_error_match("", "", r#"^"\^\[a-z\]\+\$"$"#, "")
            .unwrap());
    }

    #[test]
    fn test_context_without_items_matches_empty_text() {
        let result = result(json!({"name": "NOPE"}));
        assert!(result.validation_error_match("", "", "", ".*").unwrap());
        assert!(!result.validation_error_match("", "", "", "foo").unwrap());
    }

    #[test]
    fn test_invalid_pattern() {
        let result = result(json!({}));
        let err = result.validation_error_match("(", "", "", "").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern(_)));
    }

    #[test]
    fn test_match_pattern_is_empty() {
        assert!(MatchPattern::new("", "", "", "").unwrap().is_empty());
        assert!(!MatchPattern::new("", "x", "", "").unwrap().is_empty());
    }
}
