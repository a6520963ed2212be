//! Target location — turning path descriptions into writable slots.

use std::fmt;

use graft_value::EntityId;
use tracing::warn;

use crate::error::PatchError;
use crate::store::Store;

/// A parsed `unit:entity:attribute` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPath {
    pub unit: String,
    pub entity: String,
    pub attribute: String,
}

impl StaticPath {
    /// Splits on `:` into exactly three non-empty segments.
    ///
    /// `:` is the sole separator, a stable contract with the schema layer;
    /// a unit name may itself contain dots (`a.b:C:D`).
    pub fn parse(path: &str) -> Result<StaticPath, PatchError> {
        let segments: Vec<&str> = path.split(':').collect();
        match segments.as_slice() {
            [unit, entity, attribute]
                if !unit.is_empty() && !entity.is_empty() && !attribute.is_empty() =>
            {
                Ok(StaticPath {
                    unit: unit.to_string(),
                    entity: entity.to_string(),
                    attribute: attribute.to_string(),
                })
            }
            _ => Err(PatchError::MalformedPath(path.to_string())),
        }
    }
}

impl fmt::Display for StaticPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.unit, self.entity, self.attribute)
    }
}

/// A resolved, writable slot: an entity plus the attribute to rewrite.
///
/// Computed fresh per patch and never cached across patches; an earlier
/// patch in the batch may have rewritten the slot already.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLocation {
    pub entity: EntityId,
    pub attribute: String,
}

impl TargetLocation {
    /// `label.attribute` form for log lines and reports.
    pub fn describe<S: Store + ?Sized>(&self, store: &S) -> String {
        format!("{}.{}", store.entity_label(self.entity), self.attribute)
    }
}

/// Resolves a static path to its single slot. Each step has its own failure:
/// unknown unit, unknown entity, then an entity without the attribute.
pub fn resolve_static<S: Store + ?Sized>(
    store: &S,
    path: &StaticPath,
) -> Result<TargetLocation, PatchError> {
    let unit = store
        .unit(&path.unit)
        .ok_or_else(|| PatchError::UnresolvedUnit(path.unit.clone()))?;
    let entity = store
        .member(unit, &path.entity)
        .ok_or_else(|| PatchError::UnresolvedEntity(path.entity.clone()))?;
    if store.attribute(entity, &path.attribute).is_none() {
        return Err(PatchError::UnresolvedAttribute(path.attribute.clone()));
    }
    Ok(TargetLocation {
        entity,
        attribute: path.attribute.clone(),
    })
}

/// Resolves a reference-attribute target: one slot per reference that
/// exposes the attribute.
///
/// A reference without the attribute is an expected tunable-schema
/// situation (a capability not present on every entity class), so it is
/// warned about and skipped, never an error. The result may be empty.
pub fn resolve_reference_attr<S: Store + ?Sized>(
    store: &S,
    refs: &[EntityId],
    attribute: &str,
) -> Vec<TargetLocation> {
    let mut slots = Vec::with_capacity(refs.len());
    for &entity in refs {
        if store.attribute(entity, attribute).is_none() {
            let reason = PatchError::MissingAttributeOnReference {
                entity: store.entity_label(entity),
                attribute: attribute.to_string(),
            };
            warn!(reason = %reason, "skipping reference");
            continue;
        }
        slots.push(TargetLocation {
            entity,
            attribute: attribute.to_string(),
        });
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use graft_value::Value;

    fn registry_with_slot() -> (Registry, EntityId) {
        let mut registry = Registry::new();
        let unit = registry.add_unit("a.b");
        let entity = registry.add_entity(unit, "C").unwrap();
        registry
            .set_attribute(entity, "D", Value::Seq(vec![]))
            .unwrap();
        (registry, entity)
    }

    #[test]
    fn parse_accepts_exactly_three_segments() {
        let path = StaticPath::parse("a.b:C:D").unwrap();
        assert_eq!(path.unit, "a.b");
        assert_eq!(path.entity, "C");
        assert_eq!(path.attribute, "D");
    }

    #[test]
    fn parse_rejects_wrong_segment_counts() {
        for bad in ["a:b", "a:b:c:d", "", "a"] {
            assert_eq!(
                StaticPath::parse(bad),
                Err(PatchError::MalformedPath(bad.to_string()))
            );
        }
    }

    #[test]
    fn parse_rejects_empty_segments() {
        assert!(matches!(
            StaticPath::parse("a::c"),
            Err(PatchError::MalformedPath(_))
        ));
        assert!(matches!(
            StaticPath::parse(":b:c"),
            Err(PatchError::MalformedPath(_))
        ));
    }

    #[test]
    fn static_resolution_walks_unit_entity_attribute() {
        let (registry, entity) = registry_with_slot();
        let slot = resolve_static(&registry, &StaticPath::parse("a.b:C:D").unwrap()).unwrap();
        assert_eq!(slot.entity, entity);
        assert_eq!(slot.attribute, "D");
    }

    #[test]
    fn each_resolution_step_fails_distinctly() {
        let (registry, _) = registry_with_slot();
        assert_eq!(
            resolve_static(&registry, &StaticPath::parse("nope:C:D").unwrap()),
            Err(PatchError::UnresolvedUnit("nope".into()))
        );
        assert_eq!(
            resolve_static(&registry, &StaticPath::parse("a.b:Nope:D").unwrap()),
            Err(PatchError::UnresolvedEntity("Nope".into()))
        );
        assert_eq!(
            resolve_static(&registry, &StaticPath::parse("a.b:C:nope").unwrap()),
            Err(PatchError::UnresolvedAttribute("nope".into()))
        );
    }

    #[test]
    fn references_without_the_attribute_are_skipped() {
        let (mut registry, with_attr) = registry_with_slot();
        let unit = registry.add_unit("a.b");
        let without_attr = registry.add_entity(unit, "Bare").unwrap();

        let slots = resolve_reference_attr(&registry, &[with_attr, without_attr], "D");
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].entity, with_attr);
    }

    #[test]
    fn all_references_missing_yields_zero_slots() {
        let (registry, entity) = registry_with_slot();
        assert!(resolve_reference_attr(&registry, &[entity], "absent").is_empty());
    }
}
