//! Value mapping for field types.
//!
//! Every type that can sit in a configuration field implements [`ConfigValue`]:
//! scalars, text, containers, `Option`, `Box`, enums (via [`config_enum!`]),
//! nested sections (via [`config_section!`]) and codec-backed types (via
//! [`config_codec!`]).
//!
//! [`config_enum!`]: crate::config_enum
//! [`config_section!`]: crate::config_section
//! [`config_codec!`]: crate::config_codec

use crate::document::{Node, join_path, key_text};
use crate::error::{MapError, Result};
use crate::materialize::Context;
use crate::schema::{ConfigSection, SchemaInfo, schema_info};
use crate::serialize::Emitted;
use serde_yaml::{Mapping, Number, Value};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;

/// Kind of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Integer,
    Float,
    Text,
}

/// Declared shape of a field type.
///
/// Container shapes carry the shape of their elements (or map values) as a
/// function so that self-referential types can be described.
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    Scalar(ScalarKind),
    /// Enum mapped by variant name.
    Enum(&'static [&'static str]),
    Sequence(fn() -> Shape),
    Set(fn() -> Shape),
    Map(fn() -> Shape),
    Object(ObjectShape),
    /// Raw document value, passed through unconverted.
    Untyped,
    /// Type read and written only through a registered codec.
    Custom(&'static str),
}

impl Shape {
    /// Shape of a nested section type.
    pub fn object<S: ConfigSection>() -> Self {
        Shape::Object(ObjectShape {
            type_id: TypeId::of::<S>(),
            type_name: std::any::type_name::<S>(),
            info: schema_info::<S>,
        })
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Shape::Sequence(_) | Shape::Set(_) | Shape::Map(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Shape::Scalar(_) | Shape::Enum(_))
    }

    /// Element shape for sequences and sets, value shape for maps.
    pub fn element(&self) -> Option<Shape> {
        match self {
            Shape::Sequence(elem) | Shape::Set(elem) | Shape::Map(elem) => Some(elem()),
            _ => None,
        }
    }

    /// The section type reached through this shape, looking through any
    /// number of container layers.
    pub fn object_within(&self) -> Option<ObjectShape> {
        match self {
            Shape::Object(object) => Some(*object),
            Shape::Sequence(elem) | Shape::Set(elem) | Shape::Map(elem) => elem().object_within(),
            _ => None,
        }
    }
}

/// Identity and schema access for a nested section type.
#[derive(Debug, Clone, Copy)]
pub struct ObjectShape {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub info: fn() -> Arc<dyn SchemaInfo>,
}

/// A type that can be read from and written to a configuration document.
pub trait ConfigValue: Sized + 'static {
    fn shape() -> Shape;

    /// Build a value from its stored form. `path` is the dotted location
    /// used in error messages.
    fn decode(value: &Value, path: &str, cx: &Context<'_>) -> Result<Self>;

    /// Flatten into a plain document value.
    fn encode(&self, cx: &Context<'_>) -> Result<Value>;

    /// Decode with access to the enclosing instance.
    fn decode_in(
        value: &Value,
        path: &str,
        cx: &Context<'_>,
        _parent: Option<&dyn Any>,
    ) -> Result<Self> {
        Self::decode(value, path, cx)
    }

    /// Empty container assigned when the document has no entry for a
    /// container-shaped field.
    fn empty() -> Option<Self> {
        None
    }

    /// Whether an explicit null is decoded rather than skipped.
    fn accepts_null() -> bool {
        false
    }

    /// Flatten for writing, keeping field comments of nested sections.
    fn emit(&self, cx: &Context<'_>) -> Result<Emitted> {
        self.encode(cx).map(Emitted::Plain)
    }
}

fn number_to_i64(n: &Number) -> i64 {
    if let Some(i) = n.as_i64() {
        i
    } else if let Some(u) = n.as_u64() {
        u as i64
    } else {
        n.as_f64().unwrap_or_default() as i64
    }
}

fn integer_of(value: &Value, path: &str) -> Result<i128> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(u) => Ok(u as i128),
            None => Ok(number_to_i64(n) as i128),
        },
        Value::String(s) => {
            let text = s.trim();
            if let Ok(i) = text.parse::<i128>() {
                Ok(i)
            } else if let Ok(f) = text.parse::<f64>() {
                Ok(f as i128)
            } else {
                Err(MapError::invalid(path, "integer", value))
            }
        }
        other => Err(MapError::invalid(path, "integer", other)),
    }
}

fn float_of(value: &Value, path: &str) -> Result<f64> {
    match value {
        Value::Number(n) => Ok(n.as_f64().unwrap_or_default()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| MapError::invalid(path, "float", value)),
        other => Err(MapError::invalid(path, "float", other)),
    }
}

macro_rules! integer_value {
    ($($ty:ty),+) => {$(
        impl ConfigValue for $ty {
            fn shape() -> Shape {
                Shape::Scalar(ScalarKind::Integer)
            }

            fn decode(value: &Value, path: &str, _cx: &Context<'_>) -> Result<Self> {
                integer_of(value, path).map(|i| i as $ty)
            }

            fn encode(&self, _cx: &Context<'_>) -> Result<Value> {
                Ok(Value::Number(Number::from(*self)))
            }
        }
    )+};
}

integer_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! float_value {
    ($($ty:ty),+) => {$(
        impl ConfigValue for $ty {
            fn shape() -> Shape {
                Shape::Scalar(ScalarKind::Float)
            }

            fn decode(value: &Value, path: &str, _cx: &Context<'_>) -> Result<Self> {
                float_of(value, path).map(|f| f as $ty)
            }

            fn encode(&self, _cx: &Context<'_>) -> Result<Value> {
                Ok(Value::Number(Number::from(*self)))
            }
        }
    )+};
}

float_value!(f32, f64);

impl ConfigValue for bool {
    fn shape() -> Shape {
        Shape::Scalar(ScalarKind::Bool)
    }

    fn decode(value: &Value, path: &str, _cx: &Context<'_>) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => Ok(s.trim().eq_ignore_ascii_case("true")),
            other => Err(MapError::invalid(path, "boolean", other)),
        }
    }

    fn encode(&self, _cx: &Context<'_>) -> Result<Value> {
        Ok(Value::Bool(*self))
    }
}

impl ConfigValue for String {
    fn shape() -> Shape {
        Shape::Scalar(ScalarKind::Text)
    }

    fn decode(value: &Value, path: &str, _cx: &Context<'_>) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(MapError::invalid(path, "string", other)),
        }
    }

    fn encode(&self, _cx: &Context<'_>) -> Result<Value> {
        Ok(Value::String(self.clone()))
    }
}

impl ConfigValue for PathBuf {
    fn shape() -> Shape {
        Shape::Scalar(ScalarKind::Text)
    }

    fn decode(value: &Value, path: &str, cx: &Context<'_>) -> Result<Self> {
        String::decode(value, path, cx).map(PathBuf::from)
    }

    fn encode(&self, _cx: &Context<'_>) -> Result<Value> {
        Ok(Value::String(self.to_string_lossy().into_owned()))
    }
}

impl ConfigValue for Value {
    fn shape() -> Shape {
        Shape::Untyped
    }

    fn decode(value: &Value, _path: &str, _cx: &Context<'_>) -> Result<Self> {
        Ok(value.clone())
    }

    fn encode(&self, _cx: &Context<'_>) -> Result<Value> {
        Ok(self.clone())
    }

    fn accepts_null() -> bool {
        true
    }
}

impl ConfigValue for Mapping {
    fn shape() -> Shape {
        Shape::Map(<Value as ConfigValue>::shape)
    }

    fn decode(value: &Value, path: &str, _cx: &Context<'_>) -> Result<Self> {
        value
            .as_mapping()
            .cloned()
            .ok_or_else(|| MapError::invalid(path, "mapping", value))
    }

    fn encode(&self, _cx: &Context<'_>) -> Result<Value> {
        Ok(Value::Mapping(self.clone()))
    }

    fn empty() -> Option<Self> {
        Some(Mapping::new())
    }
}

impl ConfigValue for Node {
    fn shape() -> Shape {
        Shape::Map(<Value as ConfigValue>::shape)
    }

    fn decode(value: &Value, path: &str, cx: &Context<'_>) -> Result<Self> {
        Mapping::decode(value, path, cx).map(|map| Node::from(map).with_codecs(cx.codecs()))
    }

    fn encode(&self, _cx: &Context<'_>) -> Result<Value> {
        Ok(Value::Mapping(self.as_mapping().clone()))
    }

    fn empty() -> Option<Self> {
        Some(Node::new())
    }
}

impl<T: ConfigValue> ConfigValue for Option<T> {
    fn shape() -> Shape {
        T::shape()
    }

    fn decode(value: &Value, path: &str, cx: &Context<'_>) -> Result<Self> {
        Self::decode_in(value, path, cx, None)
    }

    fn decode_in(
        value: &Value,
        path: &str,
        cx: &Context<'_>,
        parent: Option<&dyn Any>,
    ) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => cx.decode_entry(other, path, "value", parent).map(Some),
        }
    }

    fn encode(&self, cx: &Context<'_>) -> Result<Value> {
        match self {
            Some(inner) => cx.encode(inner),
            None => Ok(Value::Null),
        }
    }

    fn empty() -> Option<Self> {
        Some(None)
    }

    fn accepts_null() -> bool {
        true
    }

    fn emit(&self, cx: &Context<'_>) -> Result<Emitted> {
        match self {
            Some(inner) => cx.emit(inner),
            None => Ok(Emitted::Plain(Value::Null)),
        }
    }
}

impl<T: ConfigValue> ConfigValue for Box<T> {
    fn shape() -> Shape {
        T::shape()
    }

    fn decode(value: &Value, path: &str, cx: &Context<'_>) -> Result<Self> {
        Self::decode_in(value, path, cx, None)
    }

    fn decode_in(
        value: &Value,
        path: &str,
        cx: &Context<'_>,
        parent: Option<&dyn Any>,
    ) -> Result<Self> {
        cx.decode_entry(value, path, "value", parent).map(Box::new)
    }

    fn encode(&self, cx: &Context<'_>) -> Result<Value> {
        cx.encode(&**self)
    }

    fn empty() -> Option<Self> {
        T::empty().map(Box::new)
    }

    fn accepts_null() -> bool {
        T::accepts_null()
    }

    fn emit(&self, cx: &Context<'_>) -> Result<Emitted> {
        cx.emit(&**self)
    }
}

fn decode_sequence<'v, T: ConfigValue>(
    value: &'v Value,
    path: &'v str,
    cx: &'v Context<'_>,
) -> Result<impl Iterator<Item = Result<T>> + 'v> {
    let items = value
        .as_sequence()
        .ok_or_else(|| MapError::invalid(path, "sequence", value))?;
    Ok(items
        .iter()
        .enumerate()
        .map(move |(i, item)| cx.decode(item, &format!("{}[{}]", path, i))))
}

fn encode_sequence<'a, T: ConfigValue + 'a>(
    items: impl Iterator<Item = &'a T>,
    cx: &Context<'_>,
) -> Result<Value> {
    items
        .map(|item| cx.encode(item))
        .collect::<Result<Vec<_>>>()
        .map(Value::Sequence)
}

impl<T: ConfigValue> ConfigValue for Vec<T> {
    fn shape() -> Shape {
        Shape::Sequence(T::shape)
    }

    fn decode(value: &Value, path: &str, cx: &Context<'_>) -> Result<Self> {
        decode_sequence(value, path, cx)?.collect()
    }

    fn encode(&self, cx: &Context<'_>) -> Result<Value> {
        encode_sequence(self.iter(), cx)
    }

    fn empty() -> Option<Self> {
        Some(Vec::new())
    }
}

impl<T: ConfigValue> ConfigValue for VecDeque<T> {
    fn shape() -> Shape {
        Shape::Sequence(T::shape)
    }

    fn decode(value: &Value, path: &str, cx: &Context<'_>) -> Result<Self> {
        decode_sequence(value, path, cx)?.collect()
    }

    fn encode(&self, cx: &Context<'_>) -> Result<Value> {
        encode_sequence(self.iter(), cx)
    }

    fn empty() -> Option<Self> {
        Some(VecDeque::new())
    }
}

impl<T: ConfigValue + Eq + Hash> ConfigValue for HashSet<T> {
    fn shape() -> Shape {
        Shape::Set(T::shape)
    }

    fn decode(value: &Value, path: &str, cx: &Context<'_>) -> Result<Self> {
        decode_sequence(value, path, cx)?.collect()
    }

    fn encode(&self, cx: &Context<'_>) -> Result<Value> {
        // Sorted by rendered text so repeated saves produce the same file.
        let mut items = self
            .iter()
            .map(|item| {
                let encoded = cx.encode(item)?;
                Ok((sort_key(&encoded), encoded))
            })
            .collect::<Result<Vec<_>>>()?;
        items.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Value::Sequence(items.into_iter().map(|(_, v)| v).collect()))
    }

    fn empty() -> Option<Self> {
        Some(HashSet::new())
    }
}

fn sort_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}

impl<T: ConfigValue + Ord> ConfigValue for BTreeSet<T> {
    fn shape() -> Shape {
        Shape::Set(T::shape)
    }

    fn decode(value: &Value, path: &str, cx: &Context<'_>) -> Result<Self> {
        decode_sequence(value, path, cx)?.collect()
    }

    fn encode(&self, cx: &Context<'_>) -> Result<Value> {
        encode_sequence(self.iter(), cx)
    }

    fn empty() -> Option<Self> {
        Some(BTreeSet::new())
    }
}

fn decode_entries<T: ConfigValue>(
    value: &Value,
    path: &str,
    cx: &Context<'_>,
) -> Result<Vec<(String, T)>> {
    let map = value
        .as_mapping()
        .ok_or_else(|| MapError::invalid(path, "mapping", value))?;
    map.iter()
        .map(|(key, item)| {
            let key = key_text(key).into_owned();
            let decoded = cx.decode(item, &join_path(path, &key))?;
            Ok((key, decoded))
        })
        .collect()
}

fn encode_entries<'a, T: ConfigValue + 'a>(
    entries: impl Iterator<Item = (&'a String, &'a T)>,
    cx: &Context<'_>,
) -> Result<Value> {
    let mut map = Mapping::new();
    for (key, item) in entries {
        map.insert(Value::String(key.clone()), cx.encode(item)?);
    }
    Ok(Value::Mapping(map))
}

impl<T: ConfigValue> ConfigValue for HashMap<String, T> {
    fn shape() -> Shape {
        Shape::Map(T::shape)
    }

    fn decode(value: &Value, path: &str, cx: &Context<'_>) -> Result<Self> {
        Ok(decode_entries(value, path, cx)?.into_iter().collect())
    }

    fn encode(&self, cx: &Context<'_>) -> Result<Value> {
        // Sorted so repeated saves produce the same file.
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        encode_entries(entries.into_iter(), cx)
    }

    fn empty() -> Option<Self> {
        Some(HashMap::new())
    }
}

impl<T: ConfigValue> ConfigValue for BTreeMap<String, T> {
    fn shape() -> Shape {
        Shape::Map(T::shape)
    }

    fn decode(value: &Value, path: &str, cx: &Context<'_>) -> Result<Self> {
        Ok(decode_entries(value, path, cx)?.into_iter().collect())
    }

    fn encode(&self, cx: &Context<'_>) -> Result<Value> {
        encode_entries(self.iter(), cx)
    }

    fn empty() -> Option<Self> {
        Some(BTreeMap::new())
    }
}

/// Map an enum to its variant names.
///
/// ```
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Level { Low, High }
/// confmap::config_enum!(Level { Low => "LOW", High => "HIGH" });
/// ```
#[macro_export]
macro_rules! config_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $crate::ConfigValue for $ty {
            fn shape() -> $crate::Shape {
                $crate::Shape::Enum(&[$($name),+])
            }

            fn decode(
                value: &$crate::Value,
                path: &str,
                _cx: &$crate::Context<'_>,
            ) -> $crate::Result<Self> {
                let text = match value {
                    $crate::Value::String(s) => s.clone(),
                    $crate::Value::Number(n) => n.to_string(),
                    $crate::Value::Bool(b) => b.to_string(),
                    _ => {
                        return Err($crate::MapError::InvalidValue {
                            path: path.to_string(),
                            expected: stringify!($ty),
                            found: format!("{:?}", value),
                        })
                    }
                };
                match text.as_str() {
                    $($name => Ok($ty::$variant),)+
                    _ => Err($crate::MapError::EnumMapping {
                        path: path.to_string(),
                        value: text,
                        type_name: stringify!($ty),
                    }),
                }
            }

            fn encode(&self, _cx: &$crate::Context<'_>) -> $crate::Result<$crate::Value> {
                let name = match self {
                    $($ty::$variant => $name,)+
                };
                Ok($crate::Value::String(name.to_string()))
            }
        }
    };
}

/// Implement [`ConfigValue`] for types that implement
/// [`ConfigSection`], so they can be nested in fields and containers.
#[macro_export]
macro_rules! config_section {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::ConfigValue for $ty {
            fn shape() -> $crate::Shape {
                $crate::Shape::object::<$ty>()
            }

            fn decode(
                value: &$crate::Value,
                path: &str,
                cx: &$crate::Context<'_>,
            ) -> $crate::Result<Self> {
                $crate::materialize::decode_object::<$ty>(value, path, cx, None)
            }

            fn decode_in(
                value: &$crate::Value,
                path: &str,
                cx: &$crate::Context<'_>,
                parent: Option<&dyn ::std::any::Any>,
            ) -> $crate::Result<Self> {
                $crate::materialize::decode_object::<$ty>(value, path, cx, parent)
            }

            fn encode(&self, cx: &$crate::Context<'_>) -> $crate::Result<$crate::Value> {
                $crate::serialize::encode_object(self, cx)
            }

            fn emit(&self, cx: &$crate::Context<'_>) -> $crate::Result<$crate::Emitted> {
                $crate::serialize::emit_object(self, cx)
            }
        }
    )+};
}

/// Implement [`ConfigValue`] for a type that is only ever read and written
/// through a [`Codec`](crate::Codec). Without a registered codec, reading
/// fails with a construction error and writing with a codec error.
#[macro_export]
macro_rules! config_codec {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::ConfigValue for $ty {
            fn shape() -> $crate::Shape {
                $crate::Shape::Custom(::std::any::type_name::<$ty>())
            }

            fn decode(
                _value: &$crate::Value,
                _path: &str,
                _cx: &$crate::Context<'_>,
            ) -> $crate::Result<Self> {
                Err($crate::MapError::Construction {
                    type_name: ::std::any::type_name::<$ty>(),
                })
            }

            fn encode(&self, _cx: &$crate::Context<'_>) -> $crate::Result<$crate::Value> {
                Err($crate::MapError::codec::<$ty>("no codec registered"))
            }
        }
    )+};
}
