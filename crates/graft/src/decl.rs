//! JSON codec for the declaration boundary.
//!
//! The schema layer hands the engine batches of descriptors; this module is
//! the concrete wire form. JSON scalars and arrays map onto the value model
//! directly, and tagged objects cover the shapes JSON has no native spelling
//! for: `{"$ref": "unit:entity"}`, `{"$set": [...]}`,
//! `{"$map": [[key, value], ...]}`, `{"$record": {...}}`, and
//! `{"$attrs": {...}, "$schema": [...]}`.
//!
//! Decode errors are schema-boundary errors (`DeclError`), kept apart from
//! the engine's per-patch taxonomy.

use serde_json::{json, Value as Json};
use thiserror::Error;

use graft_value::{AttrMap, AttrSchema, Key, Record, Value};

use crate::apply::BatchReport;
use crate::descriptor::{KeyLookup, PatchDescriptor, PatchTarget};
use crate::registry::Registry;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeclError {
    #[error("invalid declaration: {0}")]
    Invalid(String),
    #[error("unknown reference {0:?}")]
    UnknownReference(String),
}

fn invalid(message: impl Into<String>) -> DeclError {
    DeclError::Invalid(message.into())
}

// ── References ────────────────────────────────────────────────────────────

/// Resolves a `unit:entity` reference string against the store. Reference
/// resolution is the schema layer's duty, so it happens at decode time, not
/// inside the engine.
fn resolve_ref<S: Store + ?Sized>(store: &S, text: &str) -> Result<Value, DeclError> {
    let (unit_name, entity_name) = text
        .split_once(':')
        .filter(|(unit, entity)| !unit.is_empty() && !entity.is_empty() && !entity.contains(':'))
        .ok_or_else(|| invalid(format!("reference {text:?}: want unit:entity")))?;
    let unit = store
        .unit(unit_name)
        .ok_or_else(|| DeclError::UnknownReference(text.to_string()))?;
    let entity = store
        .member(unit, entity_name)
        .ok_or_else(|| DeclError::UnknownReference(text.to_string()))?;
    Ok(Value::Ref(entity))
}

// ── Value decoding ────────────────────────────────────────────────────────

pub fn decode_value<S: Store + ?Sized>(store: &S, json: &Json) -> Result<Value, DeclError> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else {
                n.as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| invalid(format!("unrepresentable number {n}")))
            }
        }
        Json::String(s) => Ok(Value::Str(s.clone())),
        Json::Array(items) => {
            let decoded = items
                .iter()
                .map(|item| decode_value(store, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Seq(decoded))
        }
        Json::Object(map) => decode_object(store, map),
    }
}

fn decode_object<S: Store + ?Sized>(
    store: &S,
    map: &serde_json::Map<String, Json>,
) -> Result<Value, DeclError> {
    if let Some(reference) = map.get("$ref") {
        let text = reference
            .as_str()
            .ok_or_else(|| invalid("$ref must be a string"))?;
        return resolve_ref(store, text);
    }
    if let Some(items) = map.get("$set") {
        let items = items
            .as_array()
            .ok_or_else(|| invalid("$set must be an array"))?;
        let decoded = items
            .iter()
            .map(|item| decode_value(store, item))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Value::set_from(decoded));
    }
    if let Some(pairs) = map.get("$map") {
        let pairs = pairs
            .as_array()
            .ok_or_else(|| invalid("$map must be an array of [key, value] pairs"))?;
        let mut entries = indexmap::IndexMap::new();
        for pair in pairs {
            let pair = pair
                .as_array()
                .filter(|pair| pair.len() == 2)
                .ok_or_else(|| invalid("$map entries must be [key, value] pairs"))?;
            let key = Key::try_from(decode_value(store, &pair[0])?)
                .map_err(|err| invalid(err.to_string()))?;
            entries.insert(key, decode_value(store, &pair[1])?);
        }
        return Ok(Value::Map(entries));
    }
    if let Some(fields) = map.get("$record") {
        let fields = fields
            .as_object()
            .ok_or_else(|| invalid("$record must be an object"))?;
        let decoded = fields
            .iter()
            .map(|(name, value)| Ok((name.clone(), decode_value(store, value)?)))
            .collect::<Result<Vec<_>, DeclError>>()?;
        return Ok(Value::Record(Record::new(decoded)));
    }
    if let Some(entries) = map.get("$attrs") {
        let entries = entries
            .as_object()
            .ok_or_else(|| invalid("$attrs must be an object"))?;
        let declared = map
            .get("$schema")
            .and_then(Json::as_array)
            .ok_or_else(|| invalid("$attrs needs a $schema key array"))?;
        let keys = declared
            .iter()
            .map(|key| {
                key.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid("$schema keys must be strings"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let schema = AttrSchema::new(keys);
        let decoded = entries
            .iter()
            .map(|(name, value)| Ok((name.clone(), decode_value(store, value)?)))
            .collect::<Result<Vec<_>, DeclError>>()?;
        let attrs = AttrMap::new(schema, decoded).map_err(|err| invalid(err.to_string()))?;
        return Ok(Value::Attrs(attrs));
    }
    if let Some(key) = map.keys().find(|key| key.starts_with('$')) {
        return Err(invalid(format!("unknown tag {key:?}")));
    }
    // Untagged objects are open mappings with string keys.
    let mut entries = indexmap::IndexMap::new();
    for (name, value) in map {
        entries.insert(Key::Str(name.clone()), decode_value(store, value)?);
    }
    Ok(Value::Map(entries))
}

// ── Value encoding ────────────────────────────────────────────────────────

pub fn encode_value<S: Store + ?Sized>(store: &S, value: &Value) -> Result<Json, DeclError> {
    match value {
        Value::Null => Ok(Json::Null),
        Value::Bool(b) => Ok(json!(b)),
        Value::Int(n) => Ok(json!(n)),
        Value::Float(x) => serde_json::Number::from_f64(*x)
            .map(Json::Number)
            .ok_or_else(|| invalid(format!("unrepresentable float {x}"))),
        Value::Str(s) => Ok(json!(s)),
        Value::Ref(id) => Ok(json!({ "$ref": store.entity_label(*id) })),
        Value::Seq(items) => encode_elements(store, items).map(Json::Array),
        Value::Set(items) => Ok(json!({ "$set": encode_elements(store, items)? })),
        Value::Map(entries) => {
            // A plain-object spelling is only safe when no key could be
            // mistaken for a tag on decode; `$`-prefixed string keys go
            // through `$map` pairs like non-string keys.
            let plain = entries
                .keys()
                .all(|key| key.as_str().is_some_and(|name| !name.starts_with('$')));
            if plain {
                let mut map = serde_json::Map::new();
                for (key, value) in entries {
                    let name = key.as_str().unwrap_or_default();
                    map.insert(name.to_string(), encode_value(store, value)?);
                }
                Ok(Json::Object(map))
            } else {
                let pairs = entries
                    .iter()
                    .map(|(key, value)| {
                        Ok(Json::Array(vec![
                            encode_value(store, &key.to_value())?,
                            encode_value(store, value)?,
                        ]))
                    })
                    .collect::<Result<Vec<_>, DeclError>>()?;
                Ok(json!({ "$map": pairs }))
            }
        }
        Value::Attrs(attrs) => {
            let mut entries = serde_json::Map::new();
            for (name, value) in attrs.iter() {
                entries.insert(name.to_string(), encode_value(store, value)?);
            }
            let schema: Vec<&str> = attrs.schema().keys().collect();
            Ok(json!({ "$attrs": entries, "$schema": schema }))
        }
        Value::Record(record) => {
            let mut fields = serde_json::Map::new();
            for (name, value) in record.iter() {
                fields.insert(name.to_string(), encode_value(store, value)?);
            }
            Ok(json!({ "$record": fields }))
        }
    }
}

fn encode_elements<S: Store + ?Sized>(
    store: &S,
    items: &[Value],
) -> Result<Vec<Json>, DeclError> {
    items.iter().map(|item| encode_value(store, item)).collect()
}

// ── Batch decoding ────────────────────────────────────────────────────────

/// Decodes a batch: an array of descriptor objects, either
/// `{"target": "u:e:a", "items": ...}` or
/// `{"refs": [...], "attribute": "...", "items": ..., "key"?: {...}}`.
/// A missing `items` key decodes as a `Null` payload, which the engine
/// skips.
pub fn decode_batch<S: Store + ?Sized>(
    store: &S,
    json: &Json,
) -> Result<Vec<PatchDescriptor>, DeclError> {
    let entries = json
        .as_array()
        .ok_or_else(|| invalid("batch must be an array"))?;
    entries
        .iter()
        .map(|entry| decode_descriptor(store, entry))
        .collect()
}

fn decode_descriptor<S: Store + ?Sized>(
    store: &S,
    json: &Json,
) -> Result<PatchDescriptor, DeclError> {
    let map = json
        .as_object()
        .ok_or_else(|| invalid("descriptor must be an object"))?;
    let payload = match map.get("items") {
        Some(items) => decode_value(store, items)?,
        None => Value::Null,
    };

    if let Some(target) = map.get("target") {
        let path = target
            .as_str()
            .ok_or_else(|| invalid("target must be a string"))?;
        if map.contains_key("key") {
            return Err(invalid("key lookups need a refs target, not a static path"));
        }
        return Ok(PatchDescriptor::static_path(path, payload));
    }

    let refs = map
        .get("refs")
        .and_then(Json::as_array)
        .ok_or_else(|| invalid("descriptor needs a target path or a refs array"))?;
    let refs = refs
        .iter()
        .map(|reference| {
            let text = reference
                .as_str()
                .ok_or_else(|| invalid("refs must be unit:entity strings"))?;
            match resolve_ref(store, text)? {
                Value::Ref(id) => Ok(id),
                _ => Err(invalid("unreachable: resolve_ref yields refs")),
            }
        })
        .collect::<Result<Vec<_>, DeclError>>()?;
    let attribute = map
        .get("attribute")
        .and_then(Json::as_str)
        .ok_or_else(|| invalid("refs descriptor needs an attribute name"))?;

    let key_lookup = match map.get("key") {
        None => None,
        Some(key) => {
            let key = key
                .as_object()
                .ok_or_else(|| invalid("key must be an object"))?;
            let key_ref = key
                .get("ref")
                .ok_or_else(|| invalid("key needs a ref"))
                .and_then(|reference| decode_value(store, reference))?;
            let field = |name: &str| {
                key.get(name)
                    .and_then(Json::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| invalid(format!("key needs a {name} string")))
            };
            Some(KeyLookup {
                key_ref,
                key_field: field("key_field")?,
                value_field: field("value_field")?,
            })
        }
    };

    Ok(PatchDescriptor {
        target: PatchTarget::ReferenceAttr {
            refs,
            attribute: attribute.to_string(),
            key_lookup,
        },
        payload,
    })
}

// ── Registry seeding ──────────────────────────────────────────────────────

/// Decodes a registry seed: `{"units": {unit: {entity: {attr: value}}}}`.
///
/// Units and entities are created in a first pass so attribute values may
/// `$ref` any entity in the seed, forward references included.
pub fn decode_registry(json: &Json) -> Result<Registry, DeclError> {
    let units = json
        .get("units")
        .and_then(Json::as_object)
        .ok_or_else(|| invalid("seed must have a units object"))?;

    let mut registry = Registry::new();
    for (unit_name, members) in units {
        let members = members
            .as_object()
            .ok_or_else(|| invalid(format!("unit {unit_name:?} must be an object")))?;
        let unit = registry.add_unit(unit_name);
        for entity_name in members.keys() {
            registry
                .add_entity(unit, entity_name)
                .map_err(|err| invalid(err.to_string()))?;
        }
    }

    for (unit_name, members) in units {
        let unit = registry
            .unit(unit_name)
            .ok_or_else(|| invalid("unreachable: unit created above"))?;
        let members = members
            .as_object()
            .ok_or_else(|| invalid("unreachable: checked above"))?;
        for (entity_name, attrs) in members {
            let entity = registry
                .member(unit, entity_name)
                .ok_or_else(|| invalid("unreachable: entity created above"))?;
            let attrs = attrs
                .as_object()
                .ok_or_else(|| invalid(format!("entity {entity_name:?} must be an object")))?;
            for (attr_name, value) in attrs {
                let decoded = decode_value(&registry, value)?;
                registry
                    .set_attribute(entity, attr_name, decoded)
                    .map_err(|err| invalid(err.to_string()))?;
            }
        }
    }
    Ok(registry)
}

pub fn encode_registry(registry: &Registry) -> Result<Json, DeclError> {
    let mut units = serde_json::Map::new();
    for (unit_name, unit) in registry.units() {
        let mut members = serde_json::Map::new();
        for (entity_name, entity) in registry.members(unit) {
            let mut attrs = serde_json::Map::new();
            for (attr_name, value) in registry.attributes(entity) {
                attrs.insert(attr_name.to_string(), encode_value(registry, value)?);
            }
            members.insert(entity_name.to_string(), Json::Object(attrs));
        }
        units.insert(unit_name.to_string(), Json::Object(members));
    }
    Ok(json!({ "units": units }))
}

// ── Report encoding ───────────────────────────────────────────────────────

pub fn encode_report(report: &BatchReport) -> Json {
    let patches: Vec<Json> = report
        .patches
        .iter()
        .map(|patch| {
            let slots: Vec<Json> = patch
                .slots
                .iter()
                .map(|slot| {
                    let mut entry = serde_json::Map::new();
                    entry.insert("target".into(), json!(slot.target));
                    if let Some(err) = &slot.error {
                        entry.insert("error".into(), json!(err.to_string()));
                    }
                    Json::Object(entry)
                })
                .collect();
            let mut entry = serde_json::Map::new();
            entry.insert("index".into(), json!(patch.index));
            entry.insert("target".into(), json!(patch.target));
            entry.insert("status".into(), json!(patch.status.as_str()));
            entry.insert("slots".into(), Json::Array(slots));
            if let Some(err) = &patch.error {
                entry.insert("error".into(), json!(err.to_string()));
            }
            Json::Object(entry)
        })
        .collect();
    json!({
        "patches": patches,
        "applied": report.applied_count(),
        "skipped": report.skipped_count(),
        "failed": report.failed_count(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────
