//! Mapping keys — the hashable subset of the value model.

use std::fmt;

use crate::value::{EntityId, Value};

/// A key usable in an open mapping.
///
/// Only shapes with total equality and a stable hash qualify; float and
/// container values are rejected at conversion time.
///
/// # Example
///
/// ```
/// use graft_value::{Key, Value};
///
/// let key = Key::try_from(Value::Str("speed".into())).unwrap();
/// assert_eq!(key, Key::Str("speed".into()));
/// assert!(Key::try_from(Value::Float(1.5)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Bool(bool),
    Int(i64),
    Str(String),
    Ref(EntityId),
}

impl Key {
    /// The `Value` this key stands for.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Bool(b) => Value::Bool(*b),
            Key::Int(n) => Value::Int(*n),
            Key::Str(s) => Value::Str(s.clone()),
            Key::Ref(id) => Value::Ref(*id),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Conversion fails for value shapes that cannot key a mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} values cannot be used as mapping keys")]
pub struct InvalidKey {
    pub kind: &'static str,
}

impl TryFrom<Value> for Key {
    type Error = InvalidKey;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(Key::Bool(b)),
            Value::Int(n) => Ok(Key::Int(n)),
            Value::Str(s) => Ok(Key::Str(s)),
            Value::Ref(id) => Ok(Key::Ref(id)),
            other => Err(InvalidKey {
                kind: other.kind_name(),
            }),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Bool(b) => write!(f, "{b}"),
            Key::Int(n) => write!(f, "{n}"),
            Key::Str(s) => write!(f, "{s:?}"),
            Key::Ref(id) => write!(f, "{id}"),
        }
    }
}
