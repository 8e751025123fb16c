//! One configuration per locale.
//!
//! Each locale gets its own file at `<root>/<locale>/<name>.yml` and its own
//! defaults. Instances are materialized on first access and then shared.

use crate::error::{MapError, Result};
use crate::mapper::ConfigMapper;
use crate::schema::ConfigSection;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct LocaleEntry<T> {
    mapper: ConfigMapper<T>,
    loaded: Mutex<Option<Arc<T>>>,
}

impl<T: ConfigSection> LocaleEntry<T> {
    fn lock(&self) -> MutexGuard<'_, Option<Arc<T>>> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached instance, built from the file on first use.
    fn cached(&self, slot: &mut Option<Arc<T>>) -> Result<Arc<T>> {
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(self.mapper.build()?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }
}

/// Lazily loaded configurations keyed by locale.
pub struct LocaleSet<T> {
    entries: BTreeMap<String, LocaleEntry<T>>,
}

impl<T: ConfigSection> LocaleSet<T> {
    /// Open one mapper per locale. `defaults_for` returns the default YAML
    /// for a locale, or `None` to merge nothing.
    pub fn new<I, L>(
        root: impl AsRef<Path>,
        name: &str,
        locales: I,
        defaults_for: impl Fn(&str) -> Option<String>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        let root = root.as_ref();
        let mut entries = BTreeMap::new();
        for locale in locales {
            let locale = locale.into();
            let path = root.join(&locale).join(format!("{}.yml", name));
            let mut mapper = ConfigMapper::open(path)?;
            if let Some(text) = defaults_for(&locale) {
                mapper = mapper.defaults_from_str(&text)?;
            }
            entries.insert(
                locale,
                LocaleEntry {
                    mapper,
                    loaded: Mutex::new(None),
                },
            );
        }
        Ok(Self { entries })
    }

    /// Configured locales in sorted order.
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The mapper behind `locale`.
    ///
    /// Writes made directly through it bypass the cached instance; call
    /// [`LocaleSet::reload`] afterwards so later saves do not restore the
    /// older value.
    pub fn mapper(&self, locale: &str) -> Result<&ConfigMapper<T>> {
        Ok(&self.entry(locale)?.mapper)
    }

    /// The instance for `locale`, materialized at most once.
    pub fn get(&self, locale: &str) -> Result<Arc<T>> {
        let entry = self.entry(locale)?;
        let mut slot = entry.lock();
        entry.cached(&mut slot)
    }

    /// Drop the cached instance and read the file again.
    pub fn reload(&self, locale: &str) -> Result<Arc<T>> {
        let entry = self.entry(locale)?;
        let mut slot = entry.lock();
        let value = Arc::new(entry.mapper.build()?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }

    /// Cache `value` for `locale` and write it to the file.
    pub fn replace(&self, locale: &str, value: T) -> Result<Arc<T>> {
        let entry = self.entry(locale)?;
        let mut slot = entry.lock();
        let value = Arc::new(value);
        *slot = Some(Arc::clone(&value));
        entry.mapper.save(&value)?;
        Ok(value)
    }

    /// Edit the cached instance for `locale` in place and write it to the
    /// file. Handles obtained earlier from [`LocaleSet::get`] keep the old
    /// value.
    pub fn update(&self, locale: &str, edit: impl FnOnce(&mut T)) -> Result<Arc<T>>
    where
        T: Clone,
    {
        let entry = self.entry(locale)?;
        let mut slot = entry.lock();
        let mut value = entry.cached(&mut slot)?;
        edit(Arc::make_mut(&mut value));
        *slot = Some(Arc::clone(&value));
        entry.mapper.save(&value)?;
        Ok(value)
    }

    /// Write the instance currently cached for `locale` back to its file.
    pub fn save(&self, locale: &str) -> Result<()> {
        let entry = self.entry(locale)?;
        let mut slot = entry.lock();
        let value = entry.cached(&mut slot)?;
        entry.mapper.save(&value)
    }

    pub fn save_all(&self) -> Result<()> {
        for locale in self.entries.keys() {
            self.save(locale)?;
        }
        Ok(())
    }

    fn entry(&self, locale: &str) -> Result<&LocaleEntry<T>> {
        self.entries
            .get(locale)
            .ok_or_else(|| MapError::UnknownLocale(locale.to_string()))
    }
}
