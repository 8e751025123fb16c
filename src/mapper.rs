//! File-backed configuration mapping.
//!
//! A [`ConfigMapper`] ties one YAML file on disk to a configuration type,
//! merges the shipped defaults into it and reads and writes typed instances.

use crate::codec::{Codec, CodecRegistry};
use crate::document::{Document, parse_document};
use crate::error::{MapError, Result};
use crate::materialize::materialize;
use crate::merge::merge_defaults;
use crate::schema::{ConfigSection, changeable_prefixes};
use crate::serialize::to_yaml;
use serde_yaml::Mapping;
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Maps the YAML file at one path to instances of `T`.
pub struct ConfigMapper<T> {
    path: PathBuf,
    defaults: Document,
    codecs: CodecRegistry,
    _target: PhantomData<fn() -> T>,
}

impl<T: ConfigSection> ConfigMapper<T> {
    /// Bind to `path`, creating the file and its parent directories if they
    /// do not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| MapError::io(parent, e))?;
        }
        if !path.exists() {
            debug!(path = %path.display(), "creating empty configuration file");
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| MapError::io(&path, e))?;

        Ok(Self {
            path,
            defaults: Mapping::new(),
            codecs: CodecRegistry::new(),
            _target: PhantomData,
        })
    }

    /// Use the YAML in `text` as the default document.
    pub fn defaults_from_str(mut self, text: &str) -> Result<Self> {
        self.defaults = parse_document(text, "defaults")?;
        Ok(self)
    }

    /// Read the default document from `reader`.
    pub fn defaults_from_reader(self, mut reader: impl Read) -> Result<Self> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| MapError::io("<defaults>", e))?;
        self.defaults_from_str(&text)
    }

    /// Read the default document from a file.
    pub fn defaults_from_path(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| MapError::io(path, e))?;
        self.defaults = parse_document(&text, &path.display().to_string())?;
        Ok(self)
    }

    pub fn defaults_document(mut self, defaults: Document) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_codec<C: Codec>(mut self, codec: C) -> Self {
        self.codecs.register(codec);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn defaults(&self) -> &Document {
        &self.defaults
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Read the file as it is on disk now.
    pub fn load_current(&self) -> Result<Document> {
        let text = fs::read_to_string(&self.path).map_err(|e| MapError::io(&self.path, e))?;
        parse_document(&text, &self.path.display().to_string())
    }

    /// User-owned paths of `T`.
    pub fn changeable_prefixes(&self) -> BTreeSet<String> {
        changeable_prefixes::<T>()
    }

    /// The on-disk document with the defaults merged in.
    pub fn merged(&self) -> Result<Document> {
        let mut current = self.load_current()?;
        self.merge_into(&mut current);
        Ok(current)
    }

    /// Load, merge and materialize an instance of `T`.
    pub fn build(&self) -> Result<T> {
        let current = self.load_current()?;
        self.materialize_document(current)
    }

    /// Merge the defaults into `current` and materialize it.
    pub fn materialize_document(&self, mut current: Document) -> Result<T> {
        self.merge_into(&mut current);
        materialize(&current, &self.codecs)
    }

    pub fn to_yaml(&self, value: &T) -> Result<String> {
        to_yaml(value, &self.codecs)
    }

    /// Write `value` to the file, replacing its contents.
    pub fn save(&self, value: &T) -> Result<()> {
        let text = self.to_yaml(value)?;
        let mut file = fs::File::create(&self.path).map_err(|e| MapError::io(&self.path, e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| MapError::io(&self.path, e))?;
        info!(path = %self.path.display(), bytes = text.len(), "configuration saved");
        Ok(())
    }

    fn merge_into(&self, current: &mut Document) {
        let report = merge_defaults(&self.defaults, current, &self.changeable_prefixes());
        if !report.is_empty() {
            debug!(
                path = %self.path.display(),
                filled = report.filled.len(),
                replaced = report.replaced_sequences.len(),
                "merged defaults into configuration"
            );
        }
    }
}

impl<T> std::fmt::Debug for ConfigMapper<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigMapper")
            .field("path", &self.path)
            .field("target", &std::any::type_name::<T>())
            .field("codecs", &self.codecs)
            .finish()
    }
}
