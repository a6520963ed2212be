//! Immutable attribute-records.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::value::Value;

/// An immutable named-field composite.
///
/// Field storage lives behind an `Arc`, so cloning a record (or a sequence of
/// records) shares storage, and a record that a merge did not touch stays
/// pointer-identical to its pre-merge self. There are no mutable setters; the
/// only way to change a field is [`Record::with_field`], which builds a new
/// record.
///
/// # Example
///
/// ```
/// use graft_value::{Record, Value};
///
/// let original = Record::new([("hp".to_string(), Value::Int(10))]);
/// let boosted = original.with_field("hp", Value::Int(12));
///
/// assert_eq!(original.field("hp"), Some(&Value::Int(10)));
/// assert_eq!(boosted.field("hp"), Some(&Value::Int(12)));
/// assert!(!original.ptr_eq(&boosted));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Arc<IndexMap<String, Value>>,
}

impl Record {
    pub fn new(fields: impl IntoIterator<Item = (String, Value)>) -> Record {
        Record {
            fields: Arc::new(fields.into_iter().collect()),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Clone-with-override: a new record identical to this one except for one
    /// field. A name not already present is added.
    pub fn with_field(&self, name: &str, value: Value) -> Record {
        let mut fields = (*self.fields).clone();
        fields.insert(name.to_string(), value);
        Record {
            fields: Arc::new(fields),
        }
    }

    /// True when both records share the same field storage. Structurally
    /// equal records built separately are *not* pointer-equal.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }
}
