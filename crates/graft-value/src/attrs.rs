//! Attribute mappings — mappings with a fixed, declared key set.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::value::Value;

/// The declared legal key set of an [`AttrMap`].
///
/// Shared via `Arc` so every map carrying the same schema points at one
/// allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSchema {
    keys: Arc<IndexSet<String>>,
}

impl AttrSchema {
    pub fn new(keys: impl IntoIterator<Item = String>) -> AttrSchema {
        AttrSchema {
            keys: Arc::new(keys.into_iter().collect()),
        }
    }

    pub fn declares(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Validates one key against the declared set.
    pub fn check_key(&self, key: &str) -> Result<(), UndeclaredKey> {
        if self.declares(key) {
            Ok(())
        } else {
            Err(UndeclaredKey {
                key: key.to_string(),
            })
        }
    }
}

/// A key outside the declared attribute set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("key {key:?} is not in the declared attribute set")]
pub struct UndeclaredKey {
    pub key: String,
}

/// An immutable mapping whose legal keys are declared up front.
///
/// Structurally a record-like shape rather than an open mapping: every entry
/// key must appear in the schema, checked at construction. Entries for
/// declared-but-absent keys are simply missing, never defaulted.
///
/// # Example
///
/// ```
/// use graft_value::{AttrMap, AttrSchema, Value};
///
/// let schema = AttrSchema::new(["speed".to_string(), "mass".to_string()]);
/// let attrs = AttrMap::new(schema.clone(), [("speed".to_string(), Value::Int(3))]).unwrap();
/// assert_eq!(attrs.get("speed"), Some(&Value::Int(3)));
///
/// let bad = AttrMap::new(schema, [("color".to_string(), Value::Null)]);
/// assert!(bad.is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AttrMap {
    schema: AttrSchema,
    entries: IndexMap<String, Value>,
}

impl AttrMap {
    pub fn new(
        schema: AttrSchema,
        entries: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<AttrMap, UndeclaredKey> {
        let entries: IndexMap<String, Value> = entries.into_iter().collect();
        for key in entries.keys() {
            schema.check_key(key)?;
        }
        Ok(AttrMap { schema, entries })
    }

    pub fn schema(&self) -> &AttrSchema {
        &self.schema
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// A new map identical to this one except for one entry. The key must be
    /// declared.
    pub fn with_entry(&self, key: &str, value: Value) -> Result<AttrMap, UndeclaredKey> {
        self.schema.check_key(key)?;
        let mut entries = self.entries.clone();
        entries.insert(key.to_string(), value);
        Ok(AttrMap {
            schema: self.schema.clone(),
            entries,
        })
    }
}
