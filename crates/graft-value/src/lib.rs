//! Immutable value model for graft.
//!
//! This crate holds the data the patch engine operates on: the [`Value`]
//! union over every shape a registry slot can hold, hashable mapping
//! [`Key`]s, immutable attribute [`Record`]s rebuilt via clone-with-override,
//! schema-constrained [`AttrMap`]s, and the [`Shape`] classifier that decides
//! which merge rule applies to a slot's current value.
//!
//! # Example
//!
//! ```
//! use graft_value::{Shape, Value};
//!
//! let slot = Value::Seq(vec![Value::Int(1), Value::Int(2)]);
//! assert_eq!(Shape::classify(&slot), Some(Shape::Sequence));
//! assert_eq!(slot.summary(), "sequence(2)");
//! ```

pub mod attrs;
pub mod key;
pub mod record;
pub mod shape;
pub mod value;

pub use attrs::{AttrMap, AttrSchema, UndeclaredKey};
pub use key::{InvalidKey, Key};
pub use record::Record;
pub use shape::Shape;
pub use value::{EntityId, Value};
