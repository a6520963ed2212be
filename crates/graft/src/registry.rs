//! In-memory `Store` implementation.
//!
//! The concrete registry used by the CLI and by tests: named units holding
//! named entities, each entity an attribute map. Ids are minted on insert
//! and stay stable for the registry's lifetime.

use indexmap::IndexMap;

use graft_value::{EntityId, Value};

use crate::store::{Store, StoreError, UnitId};

#[derive(Debug, Default)]
struct UnitData {
    members: IndexMap<String, EntityId>,
}

#[derive(Debug)]
struct EntityData {
    label: String,
    attrs: IndexMap<String, Value>,
}

/// An in-memory unit/entity/attribute registry.
///
/// # Example
///
/// ```
/// use graft::{Registry, Store};
/// use graft_value::Value;
///
/// let mut registry = Registry::new();
/// let unit = registry.add_unit("combat");
/// let entity = registry.add_entity(unit, "Sword").unwrap();
/// registry.set_attribute(entity, "tags", Value::Seq(vec![])).unwrap();
///
/// assert_eq!(registry.member(unit, "Sword"), Some(entity));
/// assert_eq!(registry.attribute(entity, "tags"), Some(&Value::Seq(vec![])));
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    units: IndexMap<String, UnitData>,
    entities: Vec<EntityData>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Get-or-create a unit by name.
    pub fn add_unit(&mut self, name: &str) -> UnitId {
        let index = match self.units.get_index_of(name) {
            Some(index) => index,
            None => {
                self.units.insert(name.to_string(), UnitData::default());
                self.units.len() - 1
            }
        };
        UnitId(index as u64)
    }

    /// Get-or-create an entity as a member of a unit. Labels are
    /// `unit:entity`, matching the static-path prefix that reaches them.
    /// A `UnitId` this registry never minted is rejected.
    pub fn add_entity(&mut self, unit: UnitId, name: &str) -> Result<EntityId, StoreError> {
        let unit_name = self
            .units
            .get_index(unit.0 as usize)
            .map(|(unit_name, _)| unit_name.clone())
            .ok_or(StoreError::UnknownUnit(unit))?;
        if let Some(existing) = self.units[unit.0 as usize].members.get(name) {
            return Ok(*existing);
        }
        let id = EntityId(self.entities.len() as u64);
        self.entities.push(EntityData {
            label: format!("{unit_name}:{name}"),
            attrs: IndexMap::new(),
        });
        self.units[unit.0 as usize]
            .members
            .insert(name.to_string(), id);
        Ok(id)
    }

    pub fn units(&self) -> impl Iterator<Item = (&str, UnitId)> {
        self.units
            .keys()
            .enumerate()
            .map(|(index, name)| (name.as_str(), UnitId(index as u64)))
    }

    pub fn members(&self, unit: UnitId) -> impl Iterator<Item = (&str, EntityId)> {
        self.units
            .get_index(unit.0 as usize)
            .into_iter()
            .flat_map(|(_, data)| data.members.iter())
            .map(|(name, id)| (name.as_str(), *id))
    }

    pub fn attributes(&self, entity: EntityId) -> impl Iterator<Item = (&str, &Value)> {
        self.entities
            .get(entity.0 as usize)
            .into_iter()
            .flat_map(|data| data.attrs.iter())
            .map(|(name, value)| (name.as_str(), value))
    }
}

impl Store for Registry {
    fn unit(&self, name: &str) -> Option<UnitId> {
        self.units.get_index_of(name).map(|index| UnitId(index as u64))
    }

    fn member(&self, unit: UnitId, name: &str) -> Option<EntityId> {
        self.units
            .get_index(unit.0 as usize)
            .and_then(|(_, data)| data.members.get(name))
            .copied()
    }

    fn attribute(&self, entity: EntityId, name: &str) -> Option<&Value> {
        self.entities
            .get(entity.0 as usize)
            .and_then(|data| data.attrs.get(name))
    }

    fn set_attribute(
        &mut self,
        entity: EntityId,
        name: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        let data = self
            .entities
            .get_mut(entity.0 as usize)
            .ok_or(StoreError::UnknownEntity(entity))?;
        data.attrs.insert(name.to_string(), value);
        Ok(())
    }

    fn entity_label(&self, entity: EntityId) -> String {
        self.entities
            .get(entity.0 as usize)
            .map(|data| data.label.clone())
            .unwrap_or_else(|| entity.to_string())
    }
}
