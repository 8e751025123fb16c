//! Accessors that connect a field descriptor to the struct field it describes.

use super::FieldDescriptor;
use crate::error::Result;
use crate::materialize::{Context, field_value};
use crate::serialize::Emitted;
use crate::value::ConfigValue;
use serde_yaml::{Mapping, Value};
use std::any::Any;

pub(crate) trait FieldBinding<S>: Send + Sync {
    /// Read this field's entry from `doc` into `target`.
    fn materialize(
        &self,
        target: &mut S,
        field: &FieldDescriptor,
        doc: &Mapping,
        path: &str,
        cx: &Context<'_>,
    ) -> Result<()>;

    fn encode(&self, source: &S, cx: &Context<'_>) -> Result<Value>;

    fn emit(&self, source: &S, cx: &Context<'_>) -> Result<Emitted>;
}

pub(crate) struct Field<S, T> {
    pub(crate) get: fn(&S) -> &T,
    pub(crate) get_mut: fn(&mut S) -> &mut T,
}

impl<S: 'static, T: ConfigValue> FieldBinding<S> for Field<S, T> {
    fn materialize(
        &self,
        target: &mut S,
        field: &FieldDescriptor,
        doc: &Mapping,
        path: &str,
        cx: &Context<'_>,
    ) -> Result<()> {
        let raw = doc.get(field.key.as_str());
        let parent: &dyn Any = &*target;
        if let Some(value) = field_value::<T>(raw, field, path, cx, Some(parent))? {
            *(self.get_mut)(target) = value;
        }
        Ok(())
    }

    fn encode(&self, source: &S, cx: &Context<'_>) -> Result<Value> {
        cx.encode((self.get)(source))
    }

    fn emit(&self, source: &S, cx: &Context<'_>) -> Result<Emitted> {
        cx.emit((self.get)(source))
    }
}

/// A base type's field reached through the embedding struct.
pub(crate) struct Projected<S, B> {
    pub(crate) inner: Box<dyn FieldBinding<B>>,
    pub(crate) get: fn(&S) -> &B,
    pub(crate) get_mut: fn(&mut S) -> &mut B,
}

impl<S, B> FieldBinding<S> for Projected<S, B> {
    fn materialize(
        &self,
        target: &mut S,
        field: &FieldDescriptor,
        doc: &Mapping,
        path: &str,
        cx: &Context<'_>,
    ) -> Result<()> {
        self.inner
            .materialize((self.get_mut)(target), field, doc, path, cx)
    }

    fn encode(&self, source: &S, cx: &Context<'_>) -> Result<Value> {
        self.inner.encode((self.get)(source), cx)
    }

    fn emit(&self, source: &S, cx: &Context<'_>) -> Result<Emitted> {
        self.inner.emit((self.get)(source), cx)
    }
}
