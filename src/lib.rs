//! confmap: typed YAML configuration with non-destructive default merging
//!
//! Applications ship a default configuration and keep a user-edited copy on
//! disk. On every load the defaults are merged into the user's document
//! without overwriting anything the user set, then the result is mapped onto
//! a typed configuration struct. Saving writes the struct back with the
//! field comments declared in its schema.
//!
//! ```no_run
//! use confmap::{ConfigMapper, ConfigSection, Schema};
//!
//! #[derive(Debug, Default)]
//! struct Settings {
//!     name: String,
//!     workers: u32,
//! }
//!
//! impl ConfigSection for Settings {
//!     fn schema() -> Schema<Self> {
//!         Schema::<Self>::builder()
//!             .constructor(Self::default)
//!             .field("name", |s| &s.name, |s| &mut s.name)
//!             .comment("Display name")
//!             .field("workers", |s| &s.workers, |s| &mut s.workers)
//!             .build()
//!     }
//! }
//!
//! # fn main() -> confmap::Result<()> {
//! let mapper = ConfigMapper::<Settings>::open("config/settings.yml")?
//!     .defaults_from_str("name: demo\nworkers: 4\n")?;
//! let settings = mapper.build()?;
//! mapper.save(&settings)?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod codec;
pub mod document;
pub mod error;
pub mod locale;
pub mod logging;
pub mod mapper;
pub mod materialize;
pub mod merge;
pub mod schema;
pub mod serialize;
pub mod value;

pub use codec::{Codec, CodecRegistry};
pub use document::{Document, Node};
pub use error::{MapError, Result};
pub use locale::LocaleSet;
pub use mapper::ConfigMapper;
pub use materialize::Context;
pub use merge::{MergeReport, merge_defaults};
pub use schema::{
    Case, ConfigSection, FieldDescriptor, Schema, SchemaBuilder, SchemaInfo, changeable_prefixes,
    schema_of,
};
pub use serialize::{Emitted, EmittedField};
pub use serde_yaml::{Mapping, Value};
pub use value::{ConfigValue, ObjectShape, ScalarKind, Shape};
