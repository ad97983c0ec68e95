//! End-to-end schema compilation, validation, and diagnostics against the
//! fixtures in `tests/testdata/`.

use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arduino_lint_schema::{
    library_properties_document, validate, AssetLoader, CompiledSchema, EmbeddedAssets,
    FailureContext, Properties, SchemaError, SchemaRegistry, ValidationResult,
};
use serde_json::json;

static TESTDATA: &[(&str, &[u8])] = &[
    (
        "valid-schema.json",
        include_str!("testdata/valid-schema.json").as_bytes(),
    ),
    (
        "valid-schema-with-references.json",
        include_str!("testdata/valid-schema-with-references.json").as_bytes(),
    ),
    (
        "referenced-schema-1.json",
        include_str!("testdata/referenced-schema-1.json").as_bytes(),
    ),
    (
        "referenced-schema-2.json",
        include_str!("testdata/referenced-schema-2.json").as_bytes(),
    ),
    (
        "schema-without-id.json",
        include_str!("testdata/schema-without-id.json").as_bytes(),
    ),
    (
        "invalid-schema.json",
        include_str!("testdata/invalid-schema.json").as_bytes(),
    ),
    (
        "reference-cycle-schema.json",
        include_str!("testdata/reference-cycle-schema.json").as_bytes(),
    ),
    (
        "composition-cycle-schema.json",
        include_str!("testdata/composition-cycle-schema.json").as_bytes(),
    ),
];

const REFERENCES: &[&str] = &["referenced-schema-1.json", "referenced-schema-2.json"];

const BASE: &str =
    "https://raw.githubusercontent.com/arduino/arduino-lint/main/internal/rule/schema/testdata/input";

fn registry() -> SchemaRegistry {
    SchemaRegistry::new(EmbeddedAssets::new(TESTDATA))
}

fn schema_with_references(registry: &SchemaRegistry) -> Arc<CompiledSchema> {
    registry
        .compile("valid-schema-with-references.json", REFERENCES)
        .expect("fixture schema compiles")
}

fn valid_properties() -> Properties {
    [
        ("property1", "foo"),
        ("property2", "bar"),
        ("property3", "baz"),
        ("dependentProperty", "asdf"),
        ("dependencyProperty", "zxcv"),
    ]
    .into_iter()
    .collect()
}

fn check(properties: &Properties, schema: &CompiledSchema) -> ValidationResult {
    validate(&library_properties_document(properties), schema)
}

/// Asserts that exactly one of the property predicates holds.
fn only_predicate(result: &ValidationResult, expected: &str) {
    let predicates = [
        ("required", result.required_property_missing("property1")),
        ("pattern", result.property_pattern_mismatch("property2")),
        ("minLength", result.property_less_than_min_length("property1")),
        ("maxLength", result.property_greater_than_max_length("property1")),
        ("enum", result.property_enum_mismatch("property3")),
        ("dependencies", result.property_dependencies_missing("dependentProperty")),
        ("additionalProperties", result.misspelled_optional_property_found()),
    ];
    for (name, holds) in predicates {
        assert_eq!(holds, name == expected, "predicate {name} with expected {expected}");
    }
}

struct CountingLoader {
    inner: EmbeddedAssets,
    calls: Arc<AtomicUsize>,
}

impl AssetLoader for CountingLoader {
    fn load(&self, name: &str) -> Option<Cow<'_, [u8]>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.load(name)
    }
}

// ── Compilation ─────────────────────────────────────────────────────

#[test]
fn test_compile_failures_are_fatal() {
    let registry = registry();

    let err = registry
        .compile("valid-schema-with-references.json", &["nonexistent.json"])
        .unwrap_err();
    assert!(matches!(err, SchemaError::AssetNotFound(_)), "{err}");

    let err = registry
        .compile("valid-schema-with-references.json", &["schema-without-id.json"])
        .unwrap_err();
    assert!(matches!(err, SchemaError::MissingId(_)), "{err}");

    let err = registry.compile("invalid-schema.json", &[]).unwrap_err();
    assert!(matches!(err, SchemaError::MalformedJson { .. }), "{err}");

    let err = registry
        .compile("valid-schema-with-references.json", &[])
        .unwrap_err();
    assert!(matches!(err, SchemaError::Compile { .. }), "{err}");

    let err = registry
        .compile("reference-cycle-schema.json", &[])
        .unwrap_err();
    assert!(matches!(err, SchemaError::ReferenceCycle { .. }), "{err}");

    let err = registry
        .compile("composition-cycle-schema.json", &[])
        .unwrap_err();
    assert!(matches!(err, SchemaError::ReferenceCycle { .. }), "{err}");

    assert!(registry.is_empty());
}

#[test]
fn test_compile_succeeds() {
    let registry = registry();
    assert!(registry.compile("valid-schema.json", &[]).is_ok());
    let schema = schema_with_references(&registry);
    assert_eq!(schema.id(), format!("{BASE}/valid-schema-with-references.json"));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_compile_never_reloads() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = SchemaRegistry::new(CountingLoader {
        inner: EmbeddedAssets::new(TESTDATA),
        calls: Arc::clone(&calls),
    });

    let first = schema_with_references(&registry);
    let loads = calls.load(Ordering::SeqCst);
    assert_eq!(loads, 3);

    let second = schema_with_references(&registry);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), loads);
}

#[test]
fn test_concurrent_first_compile_happens_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = SchemaRegistry::new(CountingLoader {
        inner: EmbeddedAssets::new(TESTDATA),
        calls: Arc::clone(&calls),
    });

    let schemas: Vec<Arc<CompiledSchema>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| schema_with_references(&registry)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    for schema in &schemas[1..] {
        assert!(Arc::ptr_eq(&schemas[0], schema));
    }
}

// ── Validation ──────────────────────────────────────────────────────

#[test]
fn test_validate() {
    let registry = registry();
    let schema = registry.compile("valid-schema.json", &[]).unwrap();
    let mut properties = valid_properties();
    assert!(check(&properties, &schema).is_success());
    assert!(check(&properties, &schema_with_references(&registry)).is_success());

    properties.set("property1", "a");
    let result = check(&properties, &schema);
    let failure = result.failure().unwrap();
    assert_eq!(failure.instance_pointer, "#/property1");
    assert_eq!(failure.schema_pointer, "#/properties/property1/minLength");
    assert_eq!(failure.schema_uri, format!("{BASE}/valid-schema.json"));
}

#[test]
fn test_failure_in_referenced_schema() {
    let registry = registry();
    let mut properties = valid_properties();
    properties.set("property2", "fOo");
    let result = check(&properties, &schema_with_references(&registry));
    let failure = result.failure().unwrap();
    assert_eq!(failure.instance_pointer, "#/property2");
    assert_eq!(failure.schema_uri, format!("{BASE}/referenced-schema-1.json"));
    assert_eq!(failure.schema_pointer, "#/definitions/patternObject/pattern");
    assert!(failure.keyword_path.starts_with("#/properties/property2/"));
}

// ── Diagnostics Query API ───────────────────────────────────────────

#[test]
fn test_valid_document_trips_no_predicate() {
    let registry = registry();
    let result = check(&valid_properties(), &schema_with_references(&registry));
    only_predicate(&result, "none");
    assert!(result.validation_error_match("", "", "", "").unwrap());
    assert!(!result.validation_error_match(".*", ".*", ".*", ".*").unwrap());
}

#[test]
fn test_required_property_missing() {
    let registry = registry();
    let mut properties = valid_properties();
    properties.remove("property1");
    let result = check(&properties, &schema_with_references(&registry));
    only_predicate(&result, "required");
    assert_eq!(
        result.failure().unwrap().context,
        FailureContext::Required {
            missing: vec!["#/property1".to_string()]
        }
    );
}

#[test]
fn test_property_pattern_mismatch() {
    let registry = registry();
    let mut properties = valid_properties();
    properties.set("property2", "fOo");
    let result = check(&properties, &schema_with_references(&registry));
    only_predicate(&result, "pattern");
    assert!(!result.property_pattern_mismatch("property1"));
    assert_eq!(
        result.expected_constraint("property2", "pattern"),
        Some(&json!("^[a-z]+$"))
    );
}

#[test]
fn test_property_less_than_min_length() {
    let registry = registry();
    let mut properties = valid_properties();
    properties.set("property1", "a");
    let result = check(&properties, &schema_with_references(&registry));
    only_predicate(&result, "minLength");
}

#[test]
fn test_property_greater_than_max_length() {
    let registry = registry();
    let mut properties = valid_properties();
    properties.set("property1", "12345");
    let result = check(&properties, &schema_with_references(&registry));
    only_predicate(&result, "maxLength");
    assert_eq!(result.schema_pointer_value(), Some(&json!(4)));
}

#[test]
fn test_property_enum_mismatch() {
    let registry = registry();
    let mut properties = valid_properties();
    properties.set("property3", "invalid");
    let result = check(&properties, &schema_with_references(&registry));
    only_predicate(&result, "enum");
}

#[test]
fn test_property_dependencies_missing() {
    let registry = registry();
    let mut properties = valid_properties();
    properties.remove("dependencyProperty");
    let result = check(&properties, &schema_with_references(&registry));
    only_predicate(&result, "dependencies");
    assert!(!result.property_dependencies_missing("dependencyProperty"));
}

#[test]
fn test_misspelled_optional_property_found() {
    let registry = registry();
    let mut properties = valid_properties();
    properties.set("porperties", "foo");
    let result = check(&properties, &schema_with_references(&registry));
    only_predicate(&result, "additionalProperties");
    assert!(result
        .validation_error_match("", "/additionalProperties$", "", "^#/porperties$")
        .unwrap());
}

#[test]
fn test_validation_error_match() {
    let registry = registry();
    let schema = schema_with_references(&registry);
    let mut properties = valid_properties();
    let result = check(&properties, &schema);
    assert!(!result.validation_error_match("^#/property2$", "", "", "").unwrap());

    properties.set("property2", "fOo");
    let result = check(&properties, &schema);
    let m = |i: &str, s: &str, v: &str, c: &str| {
        result.validation_error_match(i, s, v, c).unwrap()
    };
    assert!(!m("nomatch", "nomatch", "nomatch", "nomatch"));
    assert!(!m("^#/property2$", "nomatch", "nomatch", "nomatch"));
    assert!(!m("^#/property2$", "/pattern$", "nomatch", "nomatch"));
    assert!(!m("^#/property2$", "/pattern$", r"^\^\[a-z\]\+\$$", "nomatch"));
    assert!(m("^#/property2$", "/pattern$", r#"^"\^\[a-z\]\+\$"$"#, ""));
    assert!(m("", "", "", ""));
}

#[test]
fn test_match_reaches_composition_causes() {
    let registry = registry();
    let mut properties = valid_properties();
    properties.set("property3", "bAz");
    let result = check(&properties, &schema_with_references(&registry));

    let failure = result.failure().unwrap();
    assert_eq!(failure.keyword(), "enum");
    assert_eq!(failure.causes.len(), 1);
    assert!(result
        .validation_error_match("^#/property3$", "/pattern$", "", "")
        .unwrap());
    assert!(result
        .validation_error_match("", "/upperCasePatternObject/pattern$", r#"^"\^\[A-Z\]\+\$"$"#, "")
        .unwrap());
}

#[test]
fn test_match_below_logic_inversion() {
    let registry = registry();
    let mut properties = valid_properties();
    properties.set("property4", "ABC");
    let result = check(&properties, &schema_with_references(&registry));

    let failure = result.failure().unwrap();
    assert_eq!(failure.instance_pointer, "#/property4");
    assert_eq!(failure.keyword(), "not");
    assert!(result.property_pattern_mismatch("property4"));
    assert!(result
        .validation_error_match("^#/property4$", "/pattern$", "", "")
        .unwrap());
    assert!(result
        .validation_error_match("^#/property4$", "/upperCasePatternObject/pattern$", r#"^"\^\[A-Z\]\+\$"$"#, "")
        .unwrap());

    properties.set("property4", "abc");
    assert!(check(&properties, &schema_with_references(&registry)).is_success());
}

#[test]
fn test_match_context() {
    let registry = registry();
    let mut properties = valid_properties();
    properties.remove("property1");
    let result = check(&properties, &schema_with_references(&registry));
    assert!(!result
        .validation_error_match("nomatch", "nomatch", "nomatch", "nomatch")
        .unwrap());
    assert!(result.validation_error_match("", "", "", "^#/property1$").unwrap());
    assert!(result.validation_error_match("", "/required$", "", "").unwrap());
}
