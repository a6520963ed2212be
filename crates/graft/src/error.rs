//! The engine failure taxonomy.

use thiserror::Error;

/// Everything that can go wrong while locating, classifying, merging, or
/// publishing one patch.
///
/// Every variant is local to one patch (or one resolved slot of a
/// reference-attribute patch); nothing here crosses the batch boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchError {
    /// Static path syntax violation: not exactly three non-empty
    /// `:`-separated segments.
    #[error("malformed path {0:?}: want unit:entity:attribute")]
    MalformedPath(String),

    #[error("unresolved unit {0:?}")]
    UnresolvedUnit(String),

    #[error("unresolved entity {0:?}")]
    UnresolvedEntity(String),

    #[error("unresolved attribute {0:?}")]
    UnresolvedAttribute(String),

    /// Benign: a referenced entity simply does not expose the attribute.
    /// Logged as a warning and the reference skipped, never a patch failure.
    #[error("{entity} has no attribute {attribute:?}")]
    MissingAttributeOnReference { entity: String, attribute: String },

    /// The classifier found a value with no merge rule.
    #[error("no merge rule for {0}")]
    UnsupportedShape(&'static str),

    /// Keyed merge found no record or entry matching the key.
    #[error("key {0} not found")]
    KeyNotFound(String),

    /// The payload (or a keyed field) has the wrong container shape for the
    /// target.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A payload key falls outside a fixed declared attribute set.
    #[error("validation failure: {0}")]
    ValidationFailure(String),

    /// A caught panic or a store that rejected a write to a slot it just
    /// served a read for.
    #[error("internal fault: {0}")]
    Internal(String),
}

impl From<graft_value::UndeclaredKey> for PatchError {
    fn from(err: graft_value::UndeclaredKey) -> Self {
        PatchError::ValidationFailure(err.to_string())
    }
}
