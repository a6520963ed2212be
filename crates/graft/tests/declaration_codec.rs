//! The declaration boundary end to end: JSON seed + JSON batch → apply →
//! JSON registry, the same flow the `graft-apply` binary drives.

use graft::{apply_batch, decl, PatchStatus, Registry, Store};
use serde_json::json;

fn seed() -> Registry {
    decl::decode_registry(&json!({
        "units": {
            "game.traits": {
                "Brave": {
                    "buffs": [1, 2],
                    "tags": { "$set": ["hero"] },
                    "tuning": { "speed": 3 },
                },
                "Calm": {
                    "buffs": [7],
                },
            },
            "game.interactions": {
                "Greet": {
                    "slots": [
                        { "$record": { "keys": [10], "values": ["wave"] } },
                        { "$record": { "keys": [11], "values": [] } },
                    ],
                },
            },
        }
    }))
    .unwrap()
}

#[test]
fn decoded_batch_applies_against_the_decoded_seed() {
    let mut registry = seed();
    let batch = decl::decode_batch(
        &registry,
        &json!([
            { "target": "game.traits:Brave:buffs", "items": [3] },
            { "target": "game.traits:Brave:tags", "items": { "$set": ["hero", "bold"] } },
            { "target": "game.traits:Brave:tuning", "items": { "speed": 9, "mass": 1 } },
            {
                "refs": ["game.traits:Brave", "game.traits:Calm"],
                "attribute": "buffs",
                "items": [4],
            },
            {
                "refs": ["game.interactions:Greet"],
                "attribute": "slots",
                "items": ["bow"],
                "key": { "ref": 10, "key_field": "keys", "value_field": "values" },
            },
        ]),
    )
    .unwrap();

    let report = apply_batch(&mut registry, &batch);
    assert!(report.is_clean(), "{report:?}");

    let patched = decl::encode_registry(&registry).unwrap();
    assert_eq!(
        patched["units"]["game.traits"]["Brave"]["buffs"],
        json!([1, 2, 3, 4])
    );
    assert_eq!(patched["units"]["game.traits"]["Calm"]["buffs"], json!([7, 4]));
    assert_eq!(
        patched["units"]["game.traits"]["Brave"]["tags"],
        json!({ "$set": ["hero", "bold"] })
    );
    assert_eq!(
        patched["units"]["game.traits"]["Brave"]["tuning"],
        json!({ "speed": 9, "mass": 1 })
    );
    assert_eq!(
        patched["units"]["game.interactions"]["Greet"]["slots"][0],
        json!({ "$record": { "keys": [10], "values": ["wave", "bow"] } })
    );
}

#[test]
fn report_encoding_carries_per_patch_outcomes() {
    let mut registry = seed();
    let batch = decl::decode_batch(
        &registry,
        &json!([
            { "target": "game.traits:Brave:buffs", "items": [3] },
            { "target": "game.traits:Brave:buffs" },
            { "target": "gone:Missing:attr", "items": [1] },
        ]),
    )
    .unwrap();

    let report = apply_batch(&mut registry, &batch);
    let encoded = decl::encode_report(&report);

    assert_eq!(encoded["applied"], json!(1));
    assert_eq!(encoded["skipped"], json!(1));
    assert_eq!(encoded["failed"], json!(1));
    assert_eq!(encoded["patches"][0]["status"], json!("applied"));
    assert_eq!(
        encoded["patches"][0]["slots"][0]["target"],
        json!("game.traits:Brave.buffs")
    );
    assert_eq!(encoded["patches"][2]["status"], json!("failed"));
    assert!(encoded["patches"][2]["error"]
        .as_str()
        .unwrap()
        .contains("unresolved unit"));
}

#[test]
fn reference_attr_patch_skipping_every_entity_is_reported_as_skipped() {
    let mut registry = seed();
    let batch = decl::decode_batch(
        &registry,
        &json!([{
            "refs": ["game.traits:Brave"],
            "attribute": "nonexistent",
            "items": [1],
        }]),
    )
    .unwrap();

    let report = apply_batch(&mut registry, &batch);
    assert_eq!(report.patches[0].status, PatchStatus::SkippedWarning);
}

#[test]
fn malformed_batches_fail_at_decode_not_apply() {
    let registry = seed();
    for bad in [
        json!({ "not": "an array" }),
        json!([{ "items": [1] }]),
        json!([{ "refs": ["no-colon"], "attribute": "a", "items": [] }]),
        json!([{ "refs": ["game.traits:Nobody"], "attribute": "a", "items": [] }]),
    ] {
        assert!(decl::decode_batch(&registry, &bad).is_err(), "{bad}");
    }
}

#[test]
fn seed_attributes_may_reference_entities_across_units() {
    let registry = decl::decode_registry(&json!({
        "units": {
            "a": { "First": { "other": { "$ref": "b:Second" } } },
            "b": { "Second": {} },
        }
    }))
    .unwrap();
    let unit_b = registry.unit("b").unwrap();
    let second = registry.member(unit_b, "Second").unwrap();
    let unit_a = registry.unit("a").unwrap();
    let first = registry.member(unit_a, "First").unwrap();
    assert_eq!(
        registry.attribute(first, "other"),
        Some(&graft_value::Value::Ref(second))
    );
}
