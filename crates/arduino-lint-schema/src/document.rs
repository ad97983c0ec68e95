//! # Raw Schema Documents
//!
//! The compiled validator answers "is this valid?" but does not keep the
//! literal text of every constraint, and it reports failures by keyword
//! location: the path walked from the primary schema, `$ref` hops
//! included. To explain a failure we keep the parsed documents too, keyed
//! by their `$id`, and walk them:
//!
//! - [`DocumentStore::locate`] turns a keyword location into the document
//!   that actually holds the violated keyword plus the pointer inside it;
//! - [`DocumentStore::value_at`] reads the literal value there.
//!
//! Pointers are kept as unescaped segment lists internally and rendered in
//! fragment form (`#/properties/name/pattern`) at the API boundary.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::SchemaError;

/// Upper bound on `$ref` hops while walking one location.
const MAX_REF_HOPS: usize = 64;

/// A position inside a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaLocation {
    /// Canonical URI of the document.
    pub uri: String,
    /// Unescaped pointer segments within the document.
    pub pointer: Vec<String>,
}

impl SchemaLocation {
    /// The document root.
    pub fn root(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            pointer: Vec::new(),
        }
    }

    /// This location extended by more segments.
    pub fn join<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pointer = self.pointer.clone();
        pointer.extend(segments.into_iter().map(Into::into));
        Self {
            uri: self.uri.clone(),
            pointer,
        }
    }

    /// The pointer in fragment form, e.g. `#/definitions/name`.
    pub fn fragment(&self) -> String {
        fragment(&self.pointer)
    }
}

/// Parsed schema documents indexed by `$id`.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<String, Arc<Value>>,
    names: HashMap<String, String>,
}

impl DocumentStore {
    /// Adds a document under its asset name and `$id`.
    pub fn insert(&mut self, name: &str, id: &str, document: Arc<Value>) {
        let uri = canonical_uri(id);
        self.names.insert(name.to_string(), uri.clone());
        self.documents.insert(uri, document);
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Looks a document up by URI. Any fragment is ignored.
    pub fn get(&self, uri: &str) -> Option<&Arc<Value>> {
        self.documents.get(&canonical_uri(uri))
    }

    /// The canonical URI of the document loaded from an asset name.
    pub fn uri_for_name(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    /// Iterates over `(uri, document)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Value>)> {
        self.documents.iter().map(|(uri, doc)| (uri.as_str(), doc))
    }

    /// The literal value at a location.
    pub fn value_at(&self, location: &SchemaLocation) -> Option<&Value> {
        let mut node = self.get(&location.uri)?.as_ref();
        for segment in &location.pointer {
            node = child(node, segment)?;
        }
        Some(node)
    }

    /// Resolves a `$ref` value relative to the document it appears in.
    ///
    /// Only JSON-pointer fragments are supported; anchors yield `None`.
    pub fn resolve_reference(&self, base_uri: &str, reference: &str) -> Option<SchemaLocation> {
        let (target, fragment) = reference.split_once('#').unwrap_or((reference, ""));
        let uri = if target.is_empty() {
            canonical_uri(base_uri)
        } else {
            match url::Url::parse(base_uri).and_then(|base| base.join(target)) {
                Ok(joined) => canonical_uri(joined.as_str()),
                Err(_) => canonical_uri(target),
            }
        };
        Some(SchemaLocation {
            uri,
            pointer: parse_pointer(fragment)?,
        })
    }

    /// Maps a keyword location onto the document holding the keyword.
    ///
    /// Walks `segments` starting at `start`. A `$ref` segment follows the
    /// reference explicitly; a segment missing from a node that carries a
    /// `$ref` follows it implicitly. Returns `None` if the walk leaves the
    /// known documents.
    pub fn locate(&self, start: &SchemaLocation, segments: &[String]) -> Option<SchemaLocation> {
        let mut current = start.clone();
        let mut hops = 0usize;

        for segment in segments {
            loop {
                let node = self.value_at(&current)?;
                if segment == "$ref" {
                    current = self.follow(node, &current.uri)?;
                    hops += 1;
                    break;
                }
                if child(node, segment).is_some() {
                    current.pointer.push(segment.clone());
                    break;
                }
                current = self.follow(node, &current.uri)?;
                hops += 1;
                if hops > MAX_REF_HOPS {
                    return None;
                }
            }
            if hops > MAX_REF_HOPS {
                return None;
            }
        }
        Some(current)
    }

    pub(crate) fn follow(&self, node: &Value, base_uri: &str) -> Option<SchemaLocation> {
        let reference = node.get("$ref")?.as_str()?;
        self.resolve_reference(base_uri, reference)
    }

    /// Rejects schemas that can reach themselves without descending into
    /// the instance.
    ///
    /// `$ref` and the in-place applicators (`allOf`, `anyOf`, `oneOf`,
    /// `not`, `if`/`then`/`else`, schema-valued `dependencies`) evaluate
    /// the same instance value, so a loop through them never terminates.
    /// Loops through `properties`, `items` and the like consume the
    /// instance and are ordinary recursive schemas.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ReferenceCycle`] naming a location on the loop.
    pub fn check_reference_cycles(&self) -> Result<(), SchemaError> {
        let mut visits = HashMap::new();
        for (uri, document) in self.iter() {
            let mut references = Vec::new();
            collect_references(document, &mut Vec::new(), &mut references);
            for pointer in references {
                let start = SchemaLocation {
                    uri: uri.to_string(),
                    pointer,
                };
                self.visit(start, &mut visits)?;
            }
        }
        Ok(())
    }

    fn visit(
        &self,
        location: SchemaLocation,
        visits: &mut HashMap<SchemaLocation, Visit>,
    ) -> Result<(), SchemaError> {
        match visits.get(&location) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::InProgress) => {
                return Err(SchemaError::ReferenceCycle {
                    pointer: location.fragment().trim_start_matches('#').to_string(),
                    uri: location.uri,
                });
            }
            None => {}
        }
        visits.insert(location.clone(), Visit::InProgress);
        for next in self.in_place_successors(&location) {
            self.visit(next, visits)?;
        }
        visits.insert(location, Visit::Done);
        Ok(())
    }

    /// Sub-schemas applied to the same instance value as `location`.
    fn in_place_successors(&self, location: &SchemaLocation) -> Vec<SchemaLocation> {
        let Some(node) = self.value_at(location) else {
            return Vec::new();
        };
        let mut next = Vec::new();
        if let Some(target) = self.follow(node, &location.uri) {
            next.push(target);
        }
        for keyword in ["allOf", "anyOf", "oneOf"] {
            if let Some(branches) = node.get(keyword).and_then(Value::as_array) {
                next.extend((0..branches.len()).map(|i| location.join([keyword.to_string(), i.to_string()])));
            }
        }
        for keyword in ["not", "if", "then", "else"] {
            if node.get(keyword).is_some_and(Value::is_object) {
                next.push(location.join([keyword]));
            }
        }
        if let Some(dependencies) = node.get("dependencies").and_then(Value::as_object) {
            next.extend(
                dependencies
                    .iter()
                    .filter(|(_, dependency)| dependency.is_object())
                    .map(|(name, _)| location.join(["dependencies", name.as_str()])),
            );
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

fn collect_references(node: &Value, path: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
    match node {
        Value::Object(map) => {
            if map.get("$ref").is_some_and(Value::is_string) {
                out.push(path.clone());
            }
            for (key, value) in map {
                path.push(key.clone());
                collect_references(value, path, out);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                path.push(index.to_string());
                collect_references(value, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}

/// One step down a JSON value by pointer segment.
pub(crate) fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Strips the fragment and normalizes a URI so `$id` and `$ref` spellings
/// of the same document compare equal.
pub fn canonical_uri(uri: &str) -> String {
    let base = uri.split_once('#').map_or(uri, |(base, _)| base);
    match url::Url::parse(base) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => base.to_string(),
    }
}

/// Parses a JSON pointer (`""`, `"/a/b"`, with or without a leading `#`)
/// into unescaped segments. Returns `None` for anything that is not a
/// pointer, such as a plain-name anchor.
pub fn parse_pointer(pointer: &str) -> Option<Vec<String>> {
    let pointer = pointer.strip_prefix('#').unwrap_or(pointer);
    if pointer.is_empty() {
        return Some(Vec::new());
    }
    let rest = pointer.strip_prefix('/')?;
    Some(
        rest.split('/')
            .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
            .collect(),
    )
}

/// Renders segments as a fragment pointer: `#`, `#/a`, `#/a~1b`.
pub fn fragment(segments: &[String]) -> String {
    let mut out = String::from("#");
    for segment in segments {
        out.push('/');
        out.push_str(&segment.replace('~', "~0").replace('/', "~1"));
    }
    out
}
