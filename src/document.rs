//! Document model helpers.
//!
//! Parsed YAML is held as `serde_yaml::Mapping` (insertion ordered). Paths into
//! a document are dot-separated keys, e.g. `server.tags`.

use crate::codec::CodecRegistry;
use crate::error::{MapError, Result};
use crate::materialize::Context;
use crate::value::ConfigValue;
use serde_yaml::{Mapping, Value};
use std::borrow::Cow;

/// An in-memory configuration document.
pub type Document = Mapping;

/// Parse YAML text into a document.
///
/// An empty text (or one holding only `null`) yields an empty document.
pub fn parse_document(text: &str, origin: &str) -> Result<Document> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| MapError::parse(origin, e))?;
    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(map) => Ok(map),
        _ => Err(MapError::NotAMapping {
            origin: origin.to_string(),
        }),
    }
}

/// Text form of a mapping key as used in dotted paths.
pub fn key_text(key: &Value) -> Cow<'_, str> {
    match key {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Null => Cow::Borrowed("null"),
        other => Cow::Owned(
            serde_yaml::to_string(other)
                .unwrap_or_default()
                .trim_end()
                .to_string(),
        ),
    }
}

/// Append `key` to a dotted `prefix`.
pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Follow a dotted path through nested mappings.
pub fn lookup<'a>(doc: &'a Mapping, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_mapping()?.get(segment)?;
    }
    Some(current)
}

/// Dotted paths of every non-mapping value, in document order.
///
/// Empty mappings are reported as leaves.
pub fn leaf_paths(doc: &Mapping) -> Vec<String> {
    fn walk(map: &Mapping, prefix: &str, out: &mut Vec<String>) {
        for (key, value) in map {
            let path = join_path(prefix, &key_text(key));
            match value {
                Value::Mapping(child) if !child.is_empty() => walk(child, &path, out),
                _ => out.push(path),
            }
        }
    }

    let mut out = Vec::new();
    walk(doc, "", &mut out);
    out
}

pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Ordered key/value node.
///
/// Codecs read from and write into a `Node`, and schemas that declare a
/// dynamic node slot receive the full merged document through one, so values
/// outside the typed schema can still be looked up by key or dotted path.
///
/// Nodes handed out during a read or write pass carry that pass's codecs, so
/// typed getters and [`Node::set`] honour them. Equality compares entries only.
#[derive(Debug, Clone, Default)]
pub struct Node {
    map: Mapping,
    codecs: CodecRegistry,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node view of a stored value: mappings are used as-is, anything else is
    /// wrapped as the single entry `key: value`.
    pub fn wrap(value: &Value, key: &str) -> Self {
        match value {
            Value::Mapping(map) => Self::from(map.clone()),
            other => {
                let mut map = Mapping::new();
                map.insert(Value::String(key.to_string()), other.clone());
                Self::from(map)
            }
        }
    }

    /// Use `codecs` for typed reads and writes through this node.
    pub fn with_codecs(mut self, codecs: &CodecRegistry) -> Self {
        self.codecs = codecs.clone();
        self
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Raw value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Raw value at a dotted path.
    pub fn value_at(&self, path: &str) -> Option<&Value> {
        lookup(&self.map, path)
    }

    /// Decode the value under `key`. Missing keys and nulls yield `None`.
    pub fn get<T: ConfigValue>(&self, key: &str) -> Result<Option<T>> {
        self.decode_at(self.value(key), key)
    }

    /// Decode the value at a dotted path. Missing paths and nulls yield `None`.
    pub fn get_path<T: ConfigValue>(&self, path: &str) -> Result<Option<T>> {
        self.decode_at(self.value_at(path), path)
    }

    /// Decode the value under `key`, failing when it is absent.
    pub fn require<T: ConfigValue>(&self, key: &str) -> Result<T> {
        self.get(key)?.ok_or_else(|| MapError::InvalidValue {
            path: key.to_string(),
            expected: std::any::type_name::<T>(),
            found: "nothing".to_string(),
        })
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(Value::as_str)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.value(key).and_then(Value::as_i64)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.value(key).and_then(Value::as_f64)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.value(key).and_then(Value::as_bool)
    }

    /// Nested mapping under `key` as its own node.
    pub fn child(&self, key: &str) -> Option<Node> {
        self.value(key)
            .and_then(Value::as_mapping)
            .map(|map| Node::from(map.clone()).with_codecs(&self.codecs))
    }

    /// Encode `value` and store it under `key`.
    pub fn set<T: ConfigValue>(&mut self, key: &str, value: &T) -> Result<()> {
        let encoded = Context::new(&self.codecs).encode(value)?;
        self.set_value(key, encoded);
        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: Value) {
        self.map.insert(Value::String(key.to_string()), value);
    }

    pub fn keys(&self) -> impl Iterator<Item = Cow<'_, str>> {
        self.map.keys().map(key_text)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.map
    }

    pub fn into_mapping(self) -> Mapping {
        self.map
    }

    fn decode_at<T: ConfigValue>(&self, value: Option<&Value>, path: &str) -> Result<Option<T>> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Context::new(&self.codecs).decode(value, path).map(Some),
        }
    }
}

impl From<Mapping> for Node {
    fn from(map: Mapping) -> Self {
        Self {
            map,
            codecs: CodecRegistry::default(),
        }
    }
}
