//! Error types for mapping, merging and persisting configuration documents.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, materializing or saving a configuration.
///
/// Every failure aborts the operation that produced it; nothing is retried or
/// partially applied.
#[derive(Error, Debug)]
pub enum MapError {
    /// A configuration file could not be created, read or written.
    #[error("I/O failure on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML text could not be parsed or emitted.
    #[error("failed to parse YAML from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The document root is something other than a mapping.
    #[error("document from {origin} is not a mapping at its root")]
    NotAMapping { origin: String },

    /// The target type declares no constructor and no codec covers it.
    #[error("type {type_name} has no usable constructor and no registered codec")]
    Construction { type_name: &'static str },

    /// Stored text does not name any variant of the target enum.
    #[error("'{value}' at '{path}' is not a variant of {type_name}")]
    EnumMapping {
        path: String,
        value: String,
        type_name: &'static str,
    },

    /// A container field has no way to build an empty instance.
    #[error("container type {type_name} at '{path}' has no empty construction")]
    UnsupportedContainer {
        path: String,
        type_name: &'static str,
    },

    /// A stored value has the wrong shape for its field.
    #[error("expected {expected} at '{path}', found {found}")]
    InvalidValue {
        path: String,
        expected: &'static str,
        found: String,
    },

    /// A codec rejected its input.
    #[error("codec for {type_name} failed: {message}")]
    Codec {
        type_name: &'static str,
        message: String,
    },

    /// A locale key that was not configured.
    #[error("unknown locale: {0}")]
    UnknownLocale(String),
}

impl MapError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(origin: impl Into<String>, source: serde_yaml::Error) -> Self {
        Self::Parse {
            origin: origin.into(),
            source,
        }
    }

    /// Build a codec error for `T`.
    pub fn codec<T: ?Sized>(message: impl Into<String>) -> Self {
        Self::Codec {
            type_name: std::any::type_name::<T>(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid(path: &str, expected: &'static str, found: &serde_yaml::Value) -> Self {
        Self::InvalidValue {
            path: path.to_string(),
            expected,
            found: crate::document::describe(found).to_string(),
        }
    }
}

/// Result type alias for mapping operations.
pub type Result<T> = std::result::Result<T, MapError>;
