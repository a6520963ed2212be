//! The addressable-store boundary.

use std::fmt;

use graft_value::{EntityId, Value};
use thiserror::Error;

/// Opaque handle to a named unit in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
}

/// The engine's view of the object graph: named units containing named
/// entities, each entity owning named attribute slots.
///
/// Injected into the engine rather than reached through global state, so
/// tests run against an in-memory store. Writes must be visible to
/// subsequent reads within the same batch.
pub trait Store {
    fn unit(&self, name: &str) -> Option<UnitId>;

    fn member(&self, unit: UnitId, name: &str) -> Option<EntityId>;

    /// The current value of an attribute slot, or `None` when the entity
    /// does not expose it.
    fn attribute(&self, entity: EntityId, name: &str) -> Option<&Value>;

    /// Replaces a slot's value. The store owns the old value; the engine
    /// never writes partially.
    fn set_attribute(
        &mut self,
        entity: EntityId,
        name: &str,
        value: Value,
    ) -> Result<(), StoreError>;

    /// Human-readable name for an entity, used in log lines and reports.
    fn entity_label(&self, entity: EntityId) -> String;
}
