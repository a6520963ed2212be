//! graft — patch resolution & merge engine for immutable value registries.
//!
//! Applies batches of declarative, additive patches to an object graph of
//! immutable containers. Each patch names a target slot and a payload; the
//! engine resolves the slot, classifies the current value's runtime shape,
//! merges "old value plus payload" into a fresh value, and publishes it
//! back, with per-patch failure isolation across the batch.
//!
//! # Example
//!
//! ```
//! use graft::{apply_batch, PatchDescriptor, Registry, Store};
//! use graft_value::Value;
//!
//! let mut registry = Registry::new();
//! let unit = registry.add_unit("game.traits");
//! let brave = registry.add_entity(unit, "Brave").unwrap();
//! registry
//!     .set_attribute(brave, "buffs", Value::Seq(vec![Value::Int(1)]))
//!     .unwrap();
//!
//! let batch = [PatchDescriptor::static_path(
//!     "game.traits:Brave:buffs",
//!     Value::Seq(vec![Value::Int(2)]),
//! )];
//! let report = apply_batch(&mut registry, &batch);
//!
//! assert!(report.is_clean());
//! assert_eq!(
//!     registry.attribute(brave, "buffs"),
//!     Some(&Value::Seq(vec![Value::Int(1), Value::Int(2)])),
//! );
//! ```

pub mod apply;
pub mod decl;
pub mod descriptor;
pub mod error;
pub mod locate;
pub mod merge;
pub mod registry;
pub mod store;

pub use apply::{apply_batch, BatchReport, PatchReport, PatchStatus, SlotOutcome};
pub use descriptor::{KeyLookup, PatchDescriptor, PatchTarget};
pub use error::PatchError;
pub use locate::{StaticPath, TargetLocation};
pub use merge::{merge_keyed, merge_value};
pub use registry::Registry;
pub use store::{Store, StoreError, UnitId};
