//! Compliance-tiered schema sets.
//!
//! Each data format ships three variants of its schema, one per compliance
//! level, sharing a pool of referenced schemas. A document is validated
//! against all three so rules can ask about any level.

use std::sync::Arc;

use arduino_lint_core::ComplianceLevel;
use serde_json::Value;

use crate::error::SchemaError;
use crate::registry::{CompiledSchema, SchemaRegistry};
use crate::validate::{validate, ValidationResult};

/// Asset names of the three variants of one schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieredSchemaNames {
    /// Least strict variant.
    pub permissive: &'static str,
    /// Variant matching the published specification.
    pub specification: &'static str,
    /// Variant enforcing best practices.
    pub strict: &'static str,
}

impl TieredSchemaNames {
    /// The asset name for one level.
    pub fn for_level(&self, level: ComplianceLevel) -> &'static str {
        match level {
            ComplianceLevel::Permissive => self.permissive,
            ComplianceLevel::Specification => self.specification,
            ComplianceLevel::Strict => self.strict,
        }
    }
}

/// The three compiled variants.
#[derive(Debug, Clone)]
pub struct TieredSchema {
    permissive: Arc<CompiledSchema>,
    specification: Arc<CompiledSchema>,
    strict: Arc<CompiledSchema>,
}

impl TieredSchema {
    /// Compiles all three variants with the same references.
    ///
    /// # Errors
    ///
    /// Any error from [`SchemaRegistry::compile`].
    pub fn compile(
        registry: &SchemaRegistry,
        names: &TieredSchemaNames,
        references: &[&str],
    ) -> Result<Self, SchemaError> {
        Ok(Self {
            permissive: registry.compile(names.permissive, references)?,
            specification: registry.compile(names.specification, references)?,
            strict: registry.compile(names.strict, references)?,
        })
    }

    /// The compiled variant for one level.
    pub fn for_level(&self, level: ComplianceLevel) -> &Arc<CompiledSchema> {
        match level {
            ComplianceLevel::Permissive => &self.permissive,
            ComplianceLevel::Specification => &self.specification,
            ComplianceLevel::Strict => &self.strict,
        }
    }

    /// Validates `document` against every variant.
    pub fn validate(&self, document: &Value) -> TieredValidation {
        TieredValidation {
            permissive: validate(document, &self.permissive),
            specification: validate(document, &self.specification),
            strict: validate(document, &self.strict),
        }
    }
}

/// One validation result per compliance level.
#[derive(Debug, Clone, Default)]
pub struct TieredValidation {
    permissive: ValidationResult,
    specification: ValidationResult,
    strict: ValidationResult,
}

impl TieredValidation {
    /// The result for one level.
    pub fn for_level(&self, level: ComplianceLevel) -> &ValidationResult {
        match level {
            ComplianceLevel::Permissive => &self.permissive,
            ComplianceLevel::Specification => &self.specification,
            ComplianceLevel::Strict => &self.strict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    const NAMES: TieredSchemaNames = TieredSchemaNames {
        permissive: "permissive.json",
        specification: "specification.json",
        strict: "strict.json",
    };

    fn registry() -> SchemaRegistry {
        let mut assets = HashMap::new();
        for (name, max) in [("permissive.json", 16), ("specification.json", 8), ("strict.json", 4)] {
            let schema = json!({
                "$id": format!("https://example.com/{name}"),
                "properties": {
                    "name": {"allOf": [{"$ref": "shared.json#/definitions/name"}, {"maxLength": max}]}
                }
            });
            assets.insert(name.to_string(), schema.to_string().into_bytes());
        }
        let shared = json!({
            "$id": "https://example.com/shared.json",
            "definitions": {"name": {"type": "string"}}
        });
        assets.insert("shared.json".to_string(), shared.to_string().into_bytes());
        SchemaRegistry::new(assets)
    }

    #[test]
    fn test_levels_are_validated_independently() {
        let registry = registry();
        let tiered = TieredSchema::compile(&registry, &NAMES, &["shared.json"]).unwrap();
        assert_eq!(registry.len(), 3);

        let results = tiered.validate(&json!({"name": "abcdef"}));
        assert!(results.for_level(ComplianceLevel::Permissive).is_success());
        assert!(results.for_level(ComplianceLevel::Specification).is_success());
        assert!(results
            .for_level(ComplianceLevel::Strict)
            .property_greater_than_max_length("name"));
    }

    #[test]
    fn test_for_level_names() {
        assert_eq!(NAMES.for_level(ComplianceLevel::Strict), "strict.json");
        let registry = registry();
        let tiered = TieredSchema::compile(&registry, &NAMES, &["shared.json"]).unwrap();
        assert_eq!(tiered.for_level(ComplianceLevel::Permissive).name(), "permissive.json");
    }
}
