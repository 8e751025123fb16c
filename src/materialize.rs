//! Building object graphs from merged documents.

use crate::codec::{CodecRegistry, ErasedCodec};
use crate::document::{Node, join_path};
use crate::error::{MapError, Result};
use crate::schema::{ConfigSection, FieldDescriptor, Schema, schema_of};
use crate::serialize::Emitted;
use crate::value::ConfigValue;
use serde_yaml::{Mapping, Value};
use std::any::{Any, TypeId};

/// Codecs in effect for one read or write pass.
///
/// A registered codec always takes precedence over the type's own
/// [`ConfigValue`] implementation.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    codecs: &'a CodecRegistry,
}

impl<'a> Context<'a> {
    pub fn new(codecs: &'a CodecRegistry) -> Self {
        Self { codecs }
    }

    pub fn codecs(&self) -> &'a CodecRegistry {
        self.codecs
    }

    /// Decode a container element or nested value.
    pub fn decode<T: ConfigValue>(&self, value: &Value, path: &str) -> Result<T> {
        self.decode_entry(value, path, "value", None)
    }

    /// Decode `value`, wrapping non-mapping input under `wrap_key` when a
    /// codec handles `T`.
    pub(crate) fn decode_entry<T: ConfigValue>(
        &self,
        value: &Value,
        path: &str,
        wrap_key: &str,
        parent: Option<&dyn Any>,
    ) -> Result<T> {
        match self.codecs.find(TypeId::of::<T>()) {
            Some(codec) => {
                let node = Node::wrap(value, wrap_key).with_codecs(self.codecs);
                decode_with(codec, &node)
            }
            None => T::decode_in(value, path, self, parent),
        }
    }

    /// Flatten `value` into a plain document value.
    pub fn encode<T: ConfigValue>(&self, value: &T) -> Result<Value> {
        match self.codecs.find(TypeId::of::<T>()) {
            Some(codec) => {
                let mut node = Node::new().with_codecs(self.codecs);
                codec.encode_any(value, &mut node)?;
                Ok(Value::Mapping(node.into_mapping()))
            }
            None => value.encode(self),
        }
    }

    /// Flatten `value` for writing with comments.
    pub fn emit<T: ConfigValue>(&self, value: &T) -> Result<Emitted> {
        if self.codecs.find(TypeId::of::<T>()).is_some() {
            return self.encode(value).map(Emitted::Plain);
        }
        value.emit(self)
    }
}

fn decode_with<T: 'static>(codec: &dyn ErasedCodec, node: &Node) -> Result<T> {
    codec
        .decode_any(node)?
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| MapError::codec::<T>("codec produced a value of another type"))
}

/// Materialize a root object of type `S` from `doc`.
///
/// A codec registered for `S` decodes the whole document. Otherwise `S` is
/// built with its plain constructor, its node slot (if declared) receives a
/// copy of `doc`, and every non-excluded field is read in schema order.
pub fn materialize<S: ConfigSection>(doc: &Mapping, codecs: &CodecRegistry) -> Result<S> {
    let cx = Context::new(codecs);
    if let Some(codec) = codecs.find(TypeId::of::<S>()) {
        return decode_with(codec, &Node::from(doc.clone()).with_codecs(codecs));
    }

    let schema = schema_of::<S>();
    let mut target = schema.construct(None)?;
    if let Some(slot) = schema.node_slot() {
        *slot(&mut target) = Node::from(doc.clone()).with_codecs(codecs);
    }
    populate(&schema, &mut target, doc, "", &cx)?;
    Ok(target)
}

/// Materialize a nested object stored at `path`.
///
/// `parent` is the enclosing instance, handed to parent-aware constructors.
pub fn decode_object<S: ConfigSection>(
    value: &Value,
    path: &str,
    cx: &Context<'_>,
    parent: Option<&dyn Any>,
) -> Result<S> {
    let map = value
        .as_mapping()
        .ok_or_else(|| MapError::invalid(path, "mapping", value))?;
    let schema = schema_of::<S>();
    let mut target = schema.construct(parent)?;
    populate(&schema, &mut target, map, path, cx)?;
    Ok(target)
}

fn populate<S: 'static>(
    schema: &Schema<S>,
    target: &mut S,
    doc: &Mapping,
    path: &str,
    cx: &Context<'_>,
) -> Result<()> {
    for (field, binding) in schema.entries() {
        if field.excluded {
            continue;
        }
        binding.materialize(target, field, doc, path, cx)?;
    }
    Ok(())
}

/// New value for one field, or `None` to leave the field as constructed.
pub(crate) fn field_value<T: ConfigValue>(
    raw: Option<&Value>,
    field: &FieldDescriptor,
    path: &str,
    cx: &Context<'_>,
    parent: Option<&dyn Any>,
) -> Result<Option<T>> {
    let path = join_path(path, &field.key);

    if let Some(codec) = cx.codecs.find(TypeId::of::<T>()) {
        return match raw {
            Some(value) => {
                let node = Node::wrap(value, &field.key).with_codecs(cx.codecs);
                decode_with(codec, &node).map(Some)
            }
            None => Ok(None),
        };
    }

    match raw {
        None => missing(field, &path),
        Some(Value::Null) if !T::accepts_null() => missing(field, &path),
        Some(value) => cx
            .decode_entry(value, &path, &field.key, parent)
            .map(Some),
    }
}

fn missing<T: ConfigValue>(field: &FieldDescriptor, path: &str) -> Result<Option<T>> {
    if !field.shape.is_container() {
        return Ok(None);
    }
    match T::empty() {
        Some(empty) => Ok(Some(empty)),
        None => Err(MapError::UnsupportedContainer {
            path: path.to_string(),
            type_name: field.type_name,
        }),
    }
}
