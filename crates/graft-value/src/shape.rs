//! Shape classification — the merge engine's view of a slot's current value.

use crate::value::Value;

/// The five container variants a merge rule exists for.
///
/// Classification is exhaustive over `Value`: a value that fits none of the
/// variants classifies to `None`, which callers must treat as a hard failure,
/// never a silent no-op.
///
/// # Example
///
/// ```
/// use graft_value::{Shape, Value};
///
/// assert_eq!(Shape::classify(&Value::Seq(vec![])), Some(Shape::Sequence));
/// assert_eq!(Shape::classify(&Value::Int(1)), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Ordered elements, duplicates allowed.
    Sequence,
    /// Unique elements, no iteration-order contract.
    Set,
    /// Open key/value mapping.
    Mapping,
    /// Mapping with a fixed declared key set.
    AttributeMapping,
    /// Non-empty sequence whose elements are all records. Only the keyed
    /// merge applies here.
    KeyedRecordSequence,
}

impl Shape {
    /// Classifies a value, or `None` for shapes with no merge rule.
    ///
    /// A sequence counts as `KeyedRecordSequence` only when it is non-empty
    /// and *every* element is a record; mixed sequences stay plain
    /// `Sequence`. An empty sequence is always `Sequence`: there is no record
    /// to key against.
    pub fn classify(value: &Value) -> Option<Shape> {
        match value {
            Value::Seq(items) => {
                if !items.is_empty() && items.iter().all(|item| item.as_record().is_some()) {
                    Some(Shape::KeyedRecordSequence)
                } else {
                    Some(Shape::Sequence)
                }
            }
            Value::Set(_) => Some(Shape::Set),
            Value::Map(_) => Some(Shape::Mapping),
            Value::Attrs(_) => Some(Shape::AttributeMapping),
            Value::Null
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Str(_)
            | Value::Ref(_)
            | Value::Record(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Shape::Sequence => "sequence",
            Shape::Set => "set",
            Shape::Mapping => "mapping",
            Shape::AttributeMapping => "attribute mapping",
            Shape::KeyedRecordSequence => "keyed record sequence",
        }
    }
}
