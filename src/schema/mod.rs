//! Per-type field schemas.
//!
//! Rust has no runtime reflection, so each configuration type describes its
//! own fields by implementing [`ConfigSection`] with a [`SchemaBuilder`]:
//!
//! ```
//! use confmap::{ConfigSection, Schema};
//!
//! #[derive(Debug, Default)]
//! struct Server {
//!     host: String,
//!     port: u16,
//! }
//!
//! impl ConfigSection for Server {
//!     fn schema() -> Schema<Self> {
//!         Schema::<Self>::builder()
//!             .constructor(Self::default)
//!             .field("host", |s| &s.host, |s| &mut s.host)
//!             .comment("Interface to bind")
//!             .field("port", |s| &s.port, |s| &mut s.port)
//!             .build()
//!     }
//! }
//! confmap::config_section!(Server);
//! ```
//!
//! Schemas are built once per type and cached for the life of the process.

mod binding;
mod builder;
mod changeable;

pub use builder::{Case, SchemaBuilder};
pub use changeable::changeable_prefixes;

pub(crate) use binding::FieldBinding;

use crate::document::Node;
use crate::error::{MapError, Result};
use crate::value::Shape;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// A configuration type that can describe its own fields.
pub trait ConfigSection: Sized + 'static {
    fn schema() -> Schema<Self>;
}

/// Schema metadata for one field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Rust field name; shadowing between a type and the types it inherits
    /// from is decided on this name.
    pub name: &'static str,
    /// Key under which the field is stored in the document.
    pub key: String,
    pub type_name: &'static str,
    pub type_id: TypeId,
    pub shape: Shape,
    /// Skipped by materialization and serialization.
    pub excluded: bool,
    /// The subtree at this field belongs to the user; defaults never fill it.
    pub changeable: bool,
    /// Lines written as `# ...` above the entry on save.
    pub comments: Vec<String>,
    pub(crate) explicit_key: bool,
}

impl FieldDescriptor {
    /// Element shape for sequence and set fields, value shape for maps.
    pub fn element_shape(&self) -> Option<Shape> {
        self.shape.element()
    }
}

pub(crate) enum Constructor<S> {
    Plain(fn() -> S),
    WithParent {
        parent: &'static str,
        build: Box<dyn Fn(&dyn Any) -> Option<S> + Send + Sync>,
    },
}

/// Type-erased view of a schema, used when walking nested types.
pub trait SchemaInfo: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn fields(&self) -> &[FieldDescriptor];
    /// Every value of this type is user-owned.
    fn is_changeable(&self) -> bool;
}

/// The field table of a configuration type.
pub struct Schema<S> {
    pub(crate) type_name: &'static str,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) bindings: Vec<Box<dyn FieldBinding<S>>>,
    pub(crate) constructor: Option<Constructor<S>>,
    pub(crate) changeable: bool,
    pub(crate) node: Option<fn(&mut S) -> &mut Node>,
}

impl<S: 'static> Schema<S> {
    pub fn builder() -> SchemaBuilder<S> {
        SchemaBuilder::new()
    }

    /// Fields in declaration order, most-derived first.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_changeable(&self) -> bool {
        self.changeable
    }

    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&FieldDescriptor, &dyn FieldBinding<S>)> {
        self.fields
            .iter()
            .zip(self.bindings.iter().map(|b| &**b))
    }

    /// Create an instance, handing the enclosing instance to parent-aware
    /// constructors.
    pub(crate) fn construct(&self, parent: Option<&dyn Any>) -> Result<S> {
        let missing = || MapError::Construction {
            type_name: self.type_name,
        };
        match &self.constructor {
            Some(Constructor::Plain(ctor)) => Ok(ctor()),
            Some(Constructor::WithParent { parent: wanted, build }) => {
                let parent = parent.ok_or_else(missing)?;
                build(parent).ok_or_else(|| {
                    tracing::debug!(
                        type_name = self.type_name,
                        parent = wanted,
                        "enclosing instance has the wrong type"
                    );
                    missing()
                })
            }
            None => Err(missing()),
        }
    }

    pub(crate) fn node_slot(&self) -> Option<fn(&mut S) -> &mut Node> {
        self.node
    }
}

impl<S: 'static> SchemaInfo for Schema<S> {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    fn is_changeable(&self) -> bool {
        self.changeable
    }
}

type SchemaCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

fn cache() -> &'static SchemaCache {
    static CACHE: OnceLock<SchemaCache> = OnceLock::new();
    CACHE.get_or_init(Default::default)
}

/// Cached schema of `S`, built on first use.
pub fn schema_of<S: ConfigSection>() -> Arc<Schema<S>> {
    let id = TypeId::of::<S>();
    let cached = cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .cloned();
    if let Some(schema) = cached.and_then(|any| any.downcast::<Schema<S>>().ok()) {
        return schema;
    }

    // Built outside the lock: a schema may inherit from other cached types.
    let built: Arc<dyn Any + Send + Sync> = Arc::new(S::schema());
    let stored = cache()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(id)
        .or_insert(built)
        .clone();
    match stored.downcast::<Schema<S>>() {
        Ok(schema) => schema,
        Err(_) => Arc::new(S::schema()),
    }
}

pub(crate) fn schema_info<S: ConfigSection>() -> Arc<dyn SchemaInfo> {
    schema_of::<S>()
}
