//! The `Value` union — every shape a registry slot can hold.

use std::fmt;

use indexmap::IndexMap;

use crate::attrs::AttrMap;
use crate::key::Key;
use crate::record::Record;

// ── Entity references ─────────────────────────────────────────────────────

/// Opaque handle to an entity in an addressable store.
///
/// Ids are minted by the store that owns the entity; the value model only
/// carries them around. Two references are equal exactly when their ids are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

// ── Value ─────────────────────────────────────────────────────────────────

/// An immutable value in the object graph.
///
/// Slots in the registry hold exactly one `Value`. Container variants are
/// never mutated in place: merge operations read the old value and build a
/// fresh one.
///
/// # Example
///
/// ```
/// use graft_value::Value;
///
/// let seq = Value::Seq(vec![Value::Int(1), Value::Int(2)]);
/// assert_eq!(seq.kind_name(), "sequence");
/// assert_eq!(seq.summary(), "sequence(2)");
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A resolved reference to a store entity.
    Ref(EntityId),
    /// Ordered elements, duplicates allowed.
    Seq(Vec<Value>),
    /// Unique elements. Storage keeps insertion order so rebuilds are
    /// deterministic, but equality ignores order.
    Set(Vec<Value>),
    /// Open key/value mapping.
    Map(IndexMap<Key, Value>),
    /// Mapping whose legal keys are declared up front.
    Attrs(AttrMap),
    /// Immutable named-field composite.
    Record(Record),
}

impl Value {
    /// Builds a `Set` from elements, dropping duplicates while keeping the
    /// first occurrence's position.
    ///
    /// # Example
    ///
    /// ```
    /// use graft_value::Value;
    ///
    /// let set = Value::set_from(vec![Value::Int(1), Value::Int(2), Value::Int(1)]);
    /// assert_eq!(set.as_elements().unwrap().len(), 2);
    /// ```
    pub fn set_from(elements: impl IntoIterator<Item = Value>) -> Value {
        let mut out: Vec<Value> = Vec::new();
        for element in elements {
            if !out.contains(&element) {
                out.push(element);
            }
        }
        Value::Set(out)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<Key, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_attrs(&self) -> Option<&AttrMap> {
        match self {
            Value::Attrs(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Borrows the elements of either element carrier (`Seq` or `Set`).
    pub fn as_elements(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Membership test over an element carrier. Non-collection values never
    /// contain anything.
    pub fn contains_element(&self, needle: &Value) -> bool {
        self.as_elements().is_some_and(|items| items.contains(needle))
    }

    /// Static name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Ref(_) => "ref",
            Value::Seq(_) => "sequence",
            Value::Set(_) => "set",
            Value::Map(_) => "mapping",
            Value::Attrs(_) => "attribute mapping",
            Value::Record(_) => "record",
        }
    }

    /// Compact shape-and-size description for log lines.
    ///
    /// Full contents are only ever emitted through `Debug` at debug level;
    /// summaries keep warning and error lines readable.
    pub fn summary(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => format!("bool({b})"),
            Value::Int(n) => format!("int({n})"),
            Value::Float(x) => format!("float({x})"),
            Value::Str(s) => format!("str({:?})", s),
            Value::Ref(id) => id.to_string(),
            Value::Seq(items) => format!("sequence({})", items.len()),
            Value::Set(items) => format!("set({})", items.len()),
            Value::Map(entries) => format!("mapping({})", entries.len()),
            Value::Attrs(attrs) => format!("attribute mapping({})", attrs.len()),
            Value::Record(record) => format!("record({})", record.len()),
        }
    }
}

/// Set comparison ignores storage order; everything else is structural.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len() && a.iter().all(|element| b.contains(element))
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Attrs(a), Value::Attrs(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<EntityId> for Value {
    fn from(v: EntityId) -> Self {
        Value::Ref(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_from_drops_duplicates() {
        let set = Value::set_from(vec![
            Value::Str("a".into()),
            Value::Str("b".into()),
            Value::Str("a".into()),
        ]);
        assert_eq!(
            set.as_elements().unwrap(),
            &[Value::Str("a".into()), Value::Str("b".into())]
        );
    }

    #[test]
    fn set_equality_ignores_order() {
        let a = Value::Set(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::Set(vec![Value::Int(2), Value::Int(1)]);
        assert_eq!(a, b);

        let c = Value::Set(vec![Value::Int(1)]);
        assert_ne!(a, c);
    }

    #[test]
    fn sequence_equality_is_ordered() {
        let a = Value::Seq(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::Seq(vec![Value::Int(2), Value::Int(1)]);
        assert_ne!(a, b);
    }

    #[test]
    fn mixed_variants_never_equal() {
        let seq = Value::Seq(vec![Value::Int(1)]);
        let set = Value::Set(vec![Value::Int(1)]);
        assert_ne!(seq, set);
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn contains_element_only_on_carriers() {
        let seq = Value::Seq(vec![Value::Int(7)]);
        assert!(seq.contains_element(&Value::Int(7)));
        assert!(!seq.contains_element(&Value::Int(8)));
        assert!(!Value::Int(7).contains_element(&Value::Int(7)));
    }

    #[test]
    fn summaries_are_compact() {
        assert_eq!(Value::Null.summary(), "null");
        assert_eq!(Value::Seq(vec![Value::Null; 3]).summary(), "sequence(3)");
        assert_eq!(Value::Ref(EntityId(4)).summary(), "entity#4");
    }
}
