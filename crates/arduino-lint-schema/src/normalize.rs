//! # Normalized Data Documents
//!
//! Converts project configuration files into the JSON value model the
//! schemas are written against.
//!
//! Arduino's flat `key=value` properties format allows a key to be both a
//! value and a prefix of other keys (`build.board` alongside
//! `build.board.extra`), which no JSON mapping can hold. Each file kind
//! therefore picks a depth:
//!
//! - `library.properties` stays flat: dotted keys are plain keys;
//! - `platform.txt` is flat except `tools.*`, which nests as
//!   `tools.<tool>.<group>.<rest>` so every tool's recipes can be checked;
//! - package indexes and sketch project files are JSON/YAML already.
//!
//! Unknown keys always pass through so misspelled properties can be
//! reported.

use std::path::Path;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::SchemaError;

/// An ordered key/value map in the Arduino properties format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

impl Properties {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses properties text.
    ///
    /// Lines are trimmed; blank lines and `#` comments are skipped; the key
    /// is everything before the first `=`. A repeated key keeps its first
    /// position and takes the last value.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MalformedProperties`] for a line without `=`.
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        let mut properties = Self::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                SchemaError::MalformedProperties {
                    line: index + 1,
                    text: raw.to_string(),
                }
            })?;
            properties.set(key.trim(), value.trim());
        }
        Ok(properties)
    }

    /// Reads and parses a properties file.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DocumentLoadError`] if the file cannot be read,
    /// or the error from [`Properties::parse`].
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path).map_err(|e| SchemaError::DocumentLoadError {
            path: path.display().to_string(),
            reason: format!("cannot read file: {e}"),
        })?;
        Self::parse(&text)
    }

    /// Sets a value, keeping the key's position if it already exists.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// The value of a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The distinct text before the first `.` of each key, in order.
    pub fn first_level_keys(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for key in self.keys() {
            let first = key.split_once('.').map_or(key, |(first, _)| first);
            if !seen.contains(&first) {
                seen.push(first);
            }
        }
        seen
    }

    /// Entries under `prefix.`, with the prefix removed.
    pub fn sub_tree(&self, prefix: &str) -> Properties {
        let prefix = format!("{prefix}.");
        self.iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|rest| (rest, v)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Self::new();
        for (key, value) in iter {
            properties.set(key, value);
        }
        properties
    }
}

/// Builds a mapping from dotted keys.
///
/// `levels` bounds the nesting: `1` keeps every key flat, `n` nests `n - 1`
/// times and keeps the rest of the key flat at the last level, `0` nests
/// without limit. Where a key is both a value and a prefix, the nested
/// mapping wins while nesting is still allowed.
pub fn properties_to_map(properties: &Properties, levels: usize) -> Value {
    let mut map = Map::new();
    if levels == 1 {
        for (key, value) in properties.iter() {
            map.insert(key.to_string(), Value::String(value.to_string()));
        }
        return Value::Object(map);
    }

    let next = levels.saturating_sub(1);
    for key in properties.first_level_keys() {
        let sub_tree = properties.sub_tree(key);
        let value = if sub_tree.is_empty() {
            Value::String(properties.get(key).unwrap_or_default().to_string())
        } else {
            properties_to_map(&sub_tree, next)
        };
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}

/// Normalizes `library.properties`: a flat mapping.
pub fn library_properties_document(properties: &Properties) -> Value {
    properties_to_map(properties, 1)
}

/// Normalizes `platform.txt`: flat, except `tools` nested three levels.
pub fn platform_txt_document(properties: &Properties) -> Value {
    let mut map = Map::new();
    for (key, value) in properties.iter() {
        if key.starts_with("tools.") {
            map.insert(
                "tools".to_string(),
                properties_to_map(&properties.sub_tree("tools"), 3),
            );
        } else {
            map.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    Value::Object(map)
}

/// Names of the tools configured in `platform.txt`.
pub fn tool_names(properties: &Properties) -> Vec<String> {
    properties
        .sub_tree("tools")
        .first_level_keys()
        .into_iter()
        .map(String::from)
        .collect()
}

/// Parses a JSON document.
///
/// # Errors
///
/// Returns [`SchemaError::DocumentLoadError`] naming `label`.
pub fn json_document(text: &str, label: &str) -> Result<Value, SchemaError> {
    serde_json::from_str(text).map_err(|e| SchemaError::DocumentLoadError {
        path: label.to_string(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Parses a YAML document into the JSON value model.
///
/// # Errors
///
/// Returns [`SchemaError::DocumentLoadError`] naming `label`.
pub fn yaml_document(text: &str, label: &str) -> Result<Value, SchemaError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| SchemaError::DocumentLoadError {
            path: label.to_string(),
            reason: format!("invalid YAML: {e}"),
        })?;
    yaml_to_json_value(&yaml).map_err(|reason| SchemaError::DocumentLoadError {
        path: label.to_string(),
        reason: format!("YAML-to-JSON conversion failed: {reason}"),
    })
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Tags are dropped; non-string scalar map keys are stringified.
fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(u.into()))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, String> = seq.iter().map(yaml_to_json_value).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (k, v) in mapping {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key type: {other:?}")),
                };
                map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}

/// The on-disk formats a document can be normalized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `library.properties` and similar flat properties files.
    Properties,
    /// `platform.txt`.
    PlatformTxt,
    /// JSON (package indexes).
    Json,
    /// YAML (sketch project files).
    Yaml,
}

impl DocumentFormat {
    /// Parses and normalizes `text`.
    ///
    /// # Errors
    ///
    /// Any parse error for the format, naming `label`.
    pub fn normalize(&self, text: &str, label: &str) -> Result<Value, SchemaError> {
        match self {
            Self::Properties => Ok(library_properties_document(&Properties::parse(text)?)),
            Self::PlatformTxt => Ok(platform_txt_document(&Properties::parse(text)?)),
            Self::Json => json_document(text, label),
            Self::Yaml => yaml_document(text, label),
        }
    }

    /// Reads and normalizes a file.
    ///
    /// # Errors
    ///
    /// [`SchemaError::DocumentLoadError`] if the file cannot be read, or any
    /// parse error for the format.
    pub fn load(&self, path: &Path) -> Result<Value, SchemaError> {
        let label = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| SchemaError::DocumentLoadError {
            path: label.clone(),
            reason: format!("cannot read file: {e}"),
        })?;
        self.normalize(&text, &label)
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "properties" => Ok(Self::Properties),
            "platform-txt" => Ok(Self::PlatformTxt),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(format!("unknown document format: {other}")),
        }
    }
}
