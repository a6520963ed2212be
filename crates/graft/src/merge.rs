//! Shape-dispatched merge algorithms.
//!
//! Every function here reads the current value and builds a new one; nothing
//! is mutated in place. Dispatch follows the *runtime* shape of the current
//! value (`Shape::classify`), not a declared type — the engine never knows
//! the target's type in advance.

use indexmap::IndexMap;

use graft_value::{Key, Shape, Value};

use crate::descriptor::KeyLookup;
use crate::error::PatchError;

// ── Payload coercion ──────────────────────────────────────────────────────

/// Elements of either element carrier, or `TypeMismatch`. Both `Seq` and
/// `Set` payloads feed element merges; sets iterate in insertion order so
/// the appended result is deterministic.
fn payload_elements<'a>(payload: &'a Value, target: &str) -> Result<&'a [Value], PatchError> {
    payload.as_elements().ok_or_else(|| {
        PatchError::TypeMismatch(format!(
            "{target} target needs an element payload, got {}",
            payload.kind_name()
        ))
    })
}

/// Entries of either entry carrier (`Map` or `Attrs`), or `TypeMismatch`.
fn payload_entries(payload: &Value, target: &str) -> Result<Vec<(Key, Value)>, PatchError> {
    match payload {
        Value::Map(entries) => Ok(entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()),
        Value::Attrs(attrs) => Ok(attrs
            .iter()
            .map(|(key, value)| (Key::Str(key.to_string()), value.clone()))
            .collect()),
        other => Err(PatchError::TypeMismatch(format!(
            "{target} target needs an entry payload, got {}",
            other.kind_name()
        ))),
    }
}

// ── Top-level merge ───────────────────────────────────────────────────────

/// Merges a payload directly into the current value.
///
/// Used by every static-path patch and by reference-attribute patches with
/// no key lookup. `KeyedRecordSequence` has no top-level rule: only the
/// keyed merge may touch it.
pub fn merge_value(current: &Value, payload: &Value) -> Result<Value, PatchError> {
    match Shape::classify(current) {
        Some(Shape::Sequence) => merge_sequence(current, payload),
        Some(Shape::Set) => merge_set(current, payload),
        Some(Shape::Mapping) => merge_mapping(current, payload),
        Some(Shape::AttributeMapping) => merge_attr_mapping(current, payload),
        Some(Shape::KeyedRecordSequence) => {
            Err(PatchError::UnsupportedShape(Shape::KeyedRecordSequence.name()))
        }
        None => Err(PatchError::UnsupportedShape(current.kind_name())),
    }
}

/// Append-only, order-preserving; duplicates are never deduplicated.
fn merge_sequence(current: &Value, payload: &Value) -> Result<Value, PatchError> {
    let new_items = payload_elements(payload, "sequence")?;
    let existing = current.as_elements().unwrap_or_default();
    let mut merged = Vec::with_capacity(existing.len() + new_items.len());
    merged.extend(existing.iter().cloned());
    merged.extend(new_items.iter().cloned());
    Ok(Value::Seq(merged))
}

/// Mathematical union; duplicates collapse, first occurrence keeps its
/// storage position.
fn merge_set(current: &Value, payload: &Value) -> Result<Value, PatchError> {
    let new_items = payload_elements(payload, "set")?;
    let existing = current.as_elements().unwrap_or_default();
    Ok(Value::set_from(
        existing.iter().chain(new_items.iter()).cloned(),
    ))
}

/// Overlay; the payload wins key collisions.
fn merge_mapping(current: &Value, payload: &Value) -> Result<Value, PatchError> {
    let new_entries = payload_entries(payload, "mapping")?;
    let mut merged: IndexMap<Key, Value> = match current.as_map() {
        Some(entries) => entries.clone(),
        None => IndexMap::new(),
    };
    for (key, value) in new_entries {
        merged.insert(key, value);
    }
    Ok(Value::Map(merged))
}

/// Overlay with the same collision rule as `merge_mapping`, then validation
/// against the declared attribute set: a payload key outside it is a
/// `ValidationFailure`, never a silent drop.
fn merge_attr_mapping(current: &Value, payload: &Value) -> Result<Value, PatchError> {
    let attrs = match current.as_attrs() {
        Some(attrs) => attrs,
        None => return Err(PatchError::UnsupportedShape(current.kind_name())),
    };
    let new_entries = payload_entries(payload, "attribute mapping")?;
    let mut merged = attrs.clone();
    for (key, value) in new_entries {
        let name = key.as_str().ok_or_else(|| {
            PatchError::ValidationFailure(format!(
                "attribute mapping keys are names, got {key}"
            ))
        })?;
        merged = merged.with_entry(name, value)?;
    }
    Ok(Value::Attrs(merged))
}

// ── Keyed merge ───────────────────────────────────────────────────────────

/// Finds the one record (or entry) matching the lookup key and appends the
/// payload to its value field.
///
/// The current value must classify as `KeyedRecordSequence` or
/// `AttributeMapping`; anything else has no keyed rule.
pub fn merge_keyed(
    current: &Value,
    payload: &Value,
    key: &KeyLookup,
) -> Result<Value, PatchError> {
    match Shape::classify(current) {
        Some(Shape::KeyedRecordSequence) => merge_keyed_records(current, payload, key),
        Some(Shape::AttributeMapping) => merge_keyed_attrs(current, payload, key),
        Some(other) => Err(PatchError::UnsupportedShape(other.name())),
        None => Err(PatchError::UnsupportedShape(current.kind_name())),
    }
}

/// Scan for the first record whose key field *contains* `key_ref`
/// (membership, not equality — the field is itself a collection of keys).
/// Records lacking the field, or holding a non-collection there, simply do
/// not match. With duplicate keys only the first match is updated; later
/// duplicates are never touched.
fn merge_keyed_records(
    current: &Value,
    payload: &Value,
    key: &KeyLookup,
) -> Result<Value, PatchError> {
    let new_items = payload_elements(payload, "keyed record")?;
    let items = match current.as_seq() {
        Some(items) => items,
        None => return Err(PatchError::UnsupportedShape(current.kind_name())),
    };
    for (index, item) in items.iter().enumerate() {
        let record = match item.as_record() {
            Some(record) => record,
            None => continue,
        };
        let matched = record
            .field(&key.key_field)
            .is_some_and(|field| field.contains_element(&key.key_ref));
        if !matched {
            continue;
        }
        let existing = record.field(&key.value_field).ok_or_else(|| {
            PatchError::TypeMismatch(format!(
                "matched record has no field {:?}",
                key.value_field
            ))
        })?;
        let existing_items = existing.as_seq().ok_or_else(|| {
            PatchError::TypeMismatch(format!(
                "record field {:?} is {}, want sequence",
                key.value_field,
                existing.kind_name()
            ))
        })?;
        let mut appended = Vec::with_capacity(existing_items.len() + new_items.len());
        appended.extend(existing_items.iter().cloned());
        appended.extend(new_items.iter().cloned());
        let updated = record.with_field(&key.value_field, Value::Seq(appended));

        // Rebuild the sequence with only this element replaced; untouched
        // records keep sharing their field storage.
        let mut merged: Vec<Value> = items.to_vec();
        merged[index] = Value::Record(updated);
        return Ok(Value::Seq(merged));
    }
    Err(PatchError::KeyNotFound(key.key_ref.summary()))
}

/// Attribute mapping treated as an open dict: `key_ref` is the entry key,
/// and its value must already be a sequence to append to.
fn merge_keyed_attrs(
    current: &Value,
    payload: &Value,
    key: &KeyLookup,
) -> Result<Value, PatchError> {
    let new_items = payload_elements(payload, "keyed attribute")?;
    let attrs = match current.as_attrs() {
        Some(attrs) => attrs,
        None => return Err(PatchError::UnsupportedShape(current.kind_name())),
    };
    let name = match &key.key_ref {
        Value::Str(name) => name.as_str(),
        other => {
            return Err(PatchError::TypeMismatch(format!(
                "attribute mapping keys are names, got {}",
                other.kind_name()
            )))
        }
    };
    let existing = attrs
        .get(name)
        .ok_or_else(|| PatchError::KeyNotFound(key.key_ref.summary()))?;
    let existing_items = existing.as_seq().ok_or_else(|| {
        PatchError::TypeMismatch(format!(
            "entry {name:?} is {}, want sequence",
            existing.kind_name()
        ))
    })?;
    let mut appended = Vec::with_capacity(existing_items.len() + new_items.len());
    appended.extend(existing_items.iter().cloned());
    appended.extend(new_items.iter().cloned());
    Ok(Value::Attrs(attrs.with_entry(name, Value::Seq(appended))?))
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use graft_value::{AttrMap, AttrSchema, Record};

    fn seq(items: &[i64]) -> Value {
        Value::Seq(items.iter().map(|n| Value::Int(*n)).collect())
    }

    fn lookup(key_ref: Value) -> KeyLookup {
        KeyLookup {
            key_ref,
            key_field: "keys".into(),
            value_field: "values".into(),
        }
    }

    fn keyed_record(keys: &[i64], values: &[i64]) -> Value {
        Value::Record(Record::new([
            ("keys".to_string(), seq(keys)),
            ("values".to_string(), seq(values)),
        ]))
    }

    #[test]
    fn sequence_merge_appends_in_order() {
        let merged = merge_value(&seq(&[1, 2]), &seq(&[3])).unwrap();
        assert_eq!(merged, seq(&[1, 2, 3]));
    }

    #[test]
    fn sequence_merge_keeps_duplicates() {
        let merged = merge_value(&seq(&[1]), &seq(&[1, 1])).unwrap();
        assert_eq!(merged, seq(&[1, 1, 1]));
    }

    #[test]
    fn empty_sequence_takes_the_payload() {
        let merged = merge_value(&Value::Seq(vec![]), &seq(&[4, 5])).unwrap();
        assert_eq!(merged, seq(&[4, 5]));
    }

    #[test]
    fn set_payload_feeds_a_sequence_target() {
        let payload = Value::set_from(vec![Value::Int(3), Value::Int(4)]);
        let merged = merge_value(&seq(&[1]), &payload).unwrap();
        assert_eq!(merged, seq(&[1, 3, 4]));
    }

    #[test]
    fn set_merge_is_a_union() {
        let current = Value::set_from(vec![Value::Int(1), Value::Int(2)]);
        let merged = merge_value(&current, &seq(&[2, 3])).unwrap();
        assert_eq!(
            merged,
            Value::set_from(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn set_merge_is_idempotent() {
        let current = Value::set_from(vec![Value::Int(1)]);
        let once = merge_value(&current, &seq(&[2])).unwrap();
        let twice = merge_value(&once, &seq(&[2])).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn mapping_merge_overlays_payload_wins() {
        let mut current = IndexMap::new();
        current.insert(Key::Str("X".into()), Value::Int(1));
        current.insert(Key::Str("Y".into()), Value::Int(2));
        let mut payload = IndexMap::new();
        payload.insert(Key::Str("Y".into()), Value::Int(9));
        payload.insert(Key::Str("Z".into()), Value::Int(3));

        let merged = merge_value(&Value::Map(current), &Value::Map(payload)).unwrap();
        let merged = merged.as_map().unwrap();
        assert_eq!(merged.get(&Key::Str("X".into())), Some(&Value::Int(1)));
        assert_eq!(merged.get(&Key::Str("Y".into())), Some(&Value::Int(9)));
        assert_eq!(merged.get(&Key::Str("Z".into())), Some(&Value::Int(3)));
    }

    #[test]
    fn attr_mapping_rejects_undeclared_payload_keys() {
        let schema = AttrSchema::new(["a".to_string()]);
        let current = Value::Attrs(AttrMap::new(schema, []).unwrap());
        let mut payload = IndexMap::new();
        payload.insert(Key::Str("z".into()), Value::Int(1));

        let err = merge_value(&current, &Value::Map(payload)).unwrap_err();
        assert!(matches!(err, PatchError::ValidationFailure(_)));
    }

    #[test]
    fn attr_mapping_overlay_within_the_schema() {
        let schema = AttrSchema::new(["a".to_string(), "b".to_string()]);
        let current =
            Value::Attrs(AttrMap::new(schema, [("a".to_string(), Value::Int(1))]).unwrap());
        let mut payload = IndexMap::new();
        payload.insert(Key::Str("a".into()), Value::Int(9));
        payload.insert(Key::Str("b".into()), Value::Int(2));

        let merged = merge_value(&current, &Value::Map(payload)).unwrap();
        let attrs = merged.as_attrs().unwrap();
        assert_eq!(attrs.get("a"), Some(&Value::Int(9)));
        assert_eq!(attrs.get("b"), Some(&Value::Int(2)));
    }

    #[test]
    fn scalars_have_no_merge_rule() {
        let err = merge_value(&Value::Int(5), &seq(&[1])).unwrap_err();
        assert_eq!(err, PatchError::UnsupportedShape("int"));
    }

    #[test]
    fn record_sequences_reject_top_level_merges() {
        let current = Value::Seq(vec![keyed_record(&[1], &[])]);
        let err = merge_value(&current, &seq(&[1])).unwrap_err();
        assert_eq!(err, PatchError::UnsupportedShape("keyed record sequence"));
    }

    #[test]
    fn wrong_payload_shape_is_a_type_mismatch() {
        let err = merge_value(&seq(&[1]), &Value::Int(2)).unwrap_err();
        assert!(matches!(err, PatchError::TypeMismatch(_)));
        let err = merge_value(&Value::Map(IndexMap::new()), &seq(&[1])).unwrap_err();
        assert!(matches!(err, PatchError::TypeMismatch(_)));
    }

    #[test]
    fn keyed_merge_touches_exactly_one_record() {
        let current = Value::Seq(vec![
            keyed_record(&[1], &[10]),
            keyed_record(&[2], &[20]),
            keyed_record(&[3], &[30]),
        ]);
        let merged = merge_keyed(&current, &seq(&[99]), &lookup(Value::Int(2))).unwrap();
        let items = merged.as_seq().unwrap();
        assert_eq!(items.len(), 3);

        let before = current.as_seq().unwrap();
        assert!(items[0].as_record().unwrap().ptr_eq(before[0].as_record().unwrap()));
        assert!(items[2].as_record().unwrap().ptr_eq(before[2].as_record().unwrap()));
        assert_eq!(
            items[1].as_record().unwrap().field("values"),
            Some(&seq(&[20, 99]))
        );
    }

    #[test]
    fn duplicate_keys_update_only_the_first_match() {
        let current = Value::Seq(vec![keyed_record(&[7], &[1]), keyed_record(&[7], &[2])]);
        let merged = merge_keyed(&current, &seq(&[9]), &lookup(Value::Int(7))).unwrap();
        let items = merged.as_seq().unwrap();
        assert_eq!(
            items[0].as_record().unwrap().field("values"),
            Some(&seq(&[1, 9]))
        );
        assert_eq!(
            items[1].as_record().unwrap().field("values"),
            Some(&seq(&[2]))
        );
    }

    #[test]
    fn no_matching_record_is_key_not_found() {
        let current = Value::Seq(vec![keyed_record(&[1], &[])]);
        let err = merge_keyed(&current, &seq(&[9]), &lookup(Value::Int(5))).unwrap_err();
        assert_eq!(err, PatchError::KeyNotFound("int(5)".into()));
    }

    #[test]
    fn records_without_the_key_field_do_not_match() {
        let bare = Value::Record(Record::new([("values".to_string(), seq(&[]))]));
        let current = Value::Seq(vec![bare, keyed_record(&[5], &[1])]);
        let merged = merge_keyed(&current, &seq(&[2]), &lookup(Value::Int(5))).unwrap();
        assert_eq!(
            merged.as_seq().unwrap()[1].as_record().unwrap().field("values"),
            Some(&seq(&[1, 2]))
        );
    }

    #[test]
    fn matched_record_with_non_sequence_value_field_is_a_mismatch() {
        let record = Value::Record(Record::new([
            ("keys".to_string(), seq(&[1])),
            ("values".to_string(), Value::Int(0)),
        ]));
        let current = Value::Seq(vec![record]);
        let err = merge_keyed(&current, &seq(&[9]), &lookup(Value::Int(1))).unwrap_err();
        assert!(matches!(err, PatchError::TypeMismatch(_)));
    }

    #[test]
    fn keyed_attr_merge_appends_to_the_entry() {
        let schema = AttrSchema::new(["slots".to_string()]);
        let current =
            Value::Attrs(AttrMap::new(schema, [("slots".to_string(), seq(&[1]))]).unwrap());
        let key = KeyLookup {
            key_ref: Value::Str("slots".into()),
            key_field: String::new(),
            value_field: String::new(),
        };
        let merged = merge_keyed(&current, &seq(&[2]), &key).unwrap();
        assert_eq!(merged.as_attrs().unwrap().get("slots"), Some(&seq(&[1, 2])));
    }

    #[test]
    fn keyed_attr_merge_failure_modes() {
        let schema = AttrSchema::new(["a".to_string(), "b".to_string()]);
        let current = Value::Attrs(
            AttrMap::new(schema, [("a".to_string(), Value::Int(1))]).unwrap(),
        );
        let key = |name: &str| KeyLookup {
            key_ref: Value::Str(name.into()),
            key_field: String::new(),
            value_field: String::new(),
        };
        // Absent key.
        assert!(matches!(
            merge_keyed(&current, &seq(&[1]), &key("b")),
            Err(PatchError::KeyNotFound(_))
        ));
        // Present but not a sequence.
        assert!(matches!(
            merge_keyed(&current, &seq(&[1]), &key("a")),
            Err(PatchError::TypeMismatch(_))
        ));
    }

    #[test]
    fn keyed_merge_rejects_other_shapes() {
        let err = merge_keyed(&seq(&[1]), &seq(&[2]), &lookup(Value::Int(1))).unwrap_err();
        assert_eq!(err, PatchError::UnsupportedShape("sequence"));
        let err = merge_keyed(&Value::Null, &seq(&[2]), &lookup(Value::Int(1))).unwrap_err();
        assert_eq!(err, PatchError::UnsupportedShape("null"));
    }
}
