//! Patch descriptors — the schema layer's requests to the engine.

use std::fmt;

use graft_value::{EntityId, Value};

/// Selects the keyed merge: find the one record (or entry) matching
/// `key_ref` and append the payload to its `value_field`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyLookup {
    /// The key to search for. Against a record sequence this is a membership
    /// test inside each record's `key_field`; against an attribute mapping
    /// it is the entry key itself.
    pub key_ref: Value,
    pub key_field: String,
    pub value_field: String,
}

/// Where a patch lands.
///
/// `key_lookup` only exists on the reference-attribute variant, so a static
/// path carrying one is unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchTarget {
    /// A `unit:entity:attribute` address into the store, parsed at locate
    /// time.
    Static { path: String },
    /// Already-resolved entity references plus an attribute to patch on each.
    ReferenceAttr {
        refs: Vec<EntityId>,
        attribute: String,
        key_lookup: Option<KeyLookup>,
    },
}

impl fmt::Display for PatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchTarget::Static { path } => write!(f, "static {path:?}"),
            PatchTarget::ReferenceAttr {
                refs,
                attribute,
                key_lookup,
            } => {
                write!(f, "{} reference(s) at attr {attribute:?}", refs.len())?;
                if let Some(key) = key_lookup {
                    write!(f, " keyed by {}", key.key_ref.summary())?;
                }
                Ok(())
            }
        }
    }
}

/// One requested change: a target and a payload to merge into whatever
/// immutable value currently lives there. Immutable once constructed;
/// consumed exactly once by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchDescriptor {
    pub target: PatchTarget,
    pub payload: Value,
}

impl PatchDescriptor {
    pub fn static_path(path: impl Into<String>, payload: Value) -> PatchDescriptor {
        PatchDescriptor {
            target: PatchTarget::Static { path: path.into() },
            payload,
        }
    }

    pub fn reference_attr(
        refs: Vec<EntityId>,
        attribute: impl Into<String>,
        payload: Value,
    ) -> PatchDescriptor {
        PatchDescriptor {
            target: PatchTarget::ReferenceAttr {
                refs,
                attribute: attribute.into(),
                key_lookup: None,
            },
            payload,
        }
    }

    pub fn keyed(
        refs: Vec<EntityId>,
        attribute: impl Into<String>,
        key_lookup: KeyLookup,
        payload: Value,
    ) -> PatchDescriptor {
        PatchDescriptor {
            target: PatchTarget::ReferenceAttr {
                refs,
                attribute: attribute.into(),
                key_lookup: Some(key_lookup),
            },
            payload,
        }
    }

    pub fn key_lookup(&self) -> Option<&KeyLookup> {
        match &self.target {
            PatchTarget::ReferenceAttr { key_lookup, .. } => key_lookup.as_ref(),
            PatchTarget::Static { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_target_kind() {
        let patch = PatchDescriptor::static_path("a:B:c", Value::Seq(vec![]));
        assert_eq!(patch.target.to_string(), "static \"a:B:c\"");

        let keyed = PatchDescriptor::keyed(
            vec![EntityId(1), EntityId(2)],
            "slots",
            KeyLookup {
                key_ref: Value::Int(7),
                key_field: "keys".into(),
                value_field: "values".into(),
            },
            Value::Seq(vec![]),
        );
        assert_eq!(
            keyed.target.to_string(),
            "2 reference(s) at attr \"slots\" keyed by int(7)"
        );
    }

    #[test]
    fn key_lookup_only_on_reference_targets() {
        let patch = PatchDescriptor::static_path("a:B:c", Value::Null);
        assert!(patch.key_lookup().is_none());
    }
}
