//! User-supplied encodings for types the schema walker does not handle.

use crate::document::Node;
use crate::error::{MapError, Result};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Custom encoding for one target type.
///
/// A codec reads from a [`Node`] holding either the stored mapping itself or,
/// when the stored value is not a mapping, a single entry wrapping it (under
/// the field key, or under `value` for container elements).
pub trait Codec: Send + Sync + 'static {
    type Target: 'static;

    fn decode(&self, node: &Node) -> Result<Self::Target>;

    fn encode(&self, value: &Self::Target, node: &mut Node) -> Result<()>;
}

pub(crate) trait ErasedCodec: Send + Sync {
    fn target(&self) -> TypeId;
    fn target_name(&self) -> &'static str;
    fn decode_any(&self, node: &Node) -> Result<Box<dyn Any>>;
    fn encode_any(&self, value: &dyn Any, node: &mut Node) -> Result<()>;
}

impl<C: Codec> ErasedCodec for C {
    fn target(&self) -> TypeId {
        TypeId::of::<C::Target>()
    }

    fn target_name(&self) -> &'static str {
        std::any::type_name::<C::Target>()
    }

    fn decode_any(&self, node: &Node) -> Result<Box<dyn Any>> {
        Ok(Box::new(self.decode(node)?))
    }

    fn encode_any(&self, value: &dyn Any, node: &mut Node) -> Result<()> {
        let value = value
            .downcast_ref::<C::Target>()
            .ok_or_else(|| MapError::codec::<C::Target>("value has a different type"))?;
        self.encode(value, node)
    }
}

/// Ordered set of codecs, looked up by exact target type.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn ErasedCodec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a codec. The first codec registered for a type is the one used;
    /// later ones for the same type are kept but never consulted.
    pub fn register<C: Codec>(&mut self, codec: C) {
        if self.contains::<C::Target>() {
            warn!(
                target_type = std::any::type_name::<C::Target>(),
                "codec already registered for type, new one will be shadowed"
            );
        }
        self.codecs.push(Arc::new(codec));
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.find(TypeId::of::<T>()).is_some()
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    pub(crate) fn find(&self, target: TypeId) -> Option<&dyn ErasedCodec> {
        self.codecs
            .iter()
            .find(|codec| codec.target() == target)
            .map(|codec| &**codec)
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.codecs.iter().map(|codec| codec.target_name()))
            .finish()
    }
}
