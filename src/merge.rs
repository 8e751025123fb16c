//! Non-destructive merge of shipped defaults into a user document.
//!
//! Keys missing from the user document are copied from the defaults at every
//! depth. Values the user already has are never overwritten, with one
//! exception: an empty sequence adopts a non-empty default sequence. Paths
//! listed as changeable are owned by the user and are neither descended into
//! nor filled.

use crate::document::{join_path, key_text};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use tracing::debug;

/// What a merge changed in the current document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Paths of keys copied from the defaults.
    pub filled: Vec<String>,
    /// Paths of empty sequences replaced by their default.
    pub replaced_sequences: Vec<String>,
}

impl MergeReport {
    /// True when the current document was left as it was.
    pub fn is_empty(&self) -> bool {
        self.filled.is_empty() && self.replaced_sequences.is_empty()
    }
}

/// Fill `current` with everything in `defaults` it does not already have.
///
/// Changeable paths are matched by exact dotted-path equality.
pub fn merge_defaults(
    defaults: &Mapping,
    current: &mut Mapping,
    changeable: &BTreeSet<String>,
) -> MergeReport {
    let mut report = MergeReport::default();
    merge_level(defaults, current, "", changeable, &mut report);
    report
}

fn merge_level(
    defaults: &Mapping,
    current: &mut Mapping,
    prefix: &str,
    changeable: &BTreeSet<String>,
    report: &mut MergeReport,
) {
    for (key, default) in defaults {
        let path = join_path(prefix, &key_text(key));

        let Some(existing) = current.get_mut(key) else {
            debug!(path = %path, "filled from defaults");
            current.insert(key.clone(), default.clone());
            report.filled.push(path);
            continue;
        };

        match (default, existing) {
            (Value::Mapping(default), Value::Mapping(existing)) => {
                if !changeable.contains(&path) {
                    merge_level(default, existing, &path, changeable, report);
                }
            }
            (Value::Sequence(default), Value::Sequence(existing)) => {
                if existing.is_empty() && !default.is_empty() && !changeable.contains(&path) {
                    debug!(path = %path, "empty sequence replaced by defaults");
                    existing.clone_from(default);
                    report.replaced_sequences.push(path);
                }
            }
            _ => {}
        }
    }
}
