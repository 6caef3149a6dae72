//! Integration tests for enum-keyed tables.

use cfgtree_core::access::MemoryAccess;
use cfgtree_core::impl_table_key_from_str;
use cfgtree_core::loader::LoadError;
use cfgtree_core::shape::Shape;
use cfgtree_core::table::{CodecError, Table, decode, encode};
use cfgtree_core::tree::TableTree;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
enum Element {
    Fire,
    Water,
    Earth,
}

impl_table_key_from_str!(Element);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Affinity {
    strong_against: Vec<String>,
    damage_bonus: f32,
}

#[test]
fn enum_keyed_table_round_trips() {
    let table = Table::from_rows([
        (Element::Fire, 1.5f64),
        (Element::Water, 0.5),
    ])
    .unwrap();
    let back: Table<Element, f64> = decode(&encode(&table).unwrap()).unwrap();
    assert_eq!(back, table);
}

#[test]
fn enum_keys_load_through_tree() {
    let access = MemoryAccess::new("cfg").with_file(
        "elements/affinity.json",
        r#"{
            "Fire": {"strong_against": ["Earth"], "damage_bonus": 0.25},
            "Water": {"strong_against": ["Fire"], "damage_bonus": 0.5}
        }"#,
    );
    let elements = Shape::builder()
        .table::<Element, Affinity>("affinity")
        .build()
        .unwrap();
    let shape = Shape::builder().namespace("elements", elements).build().unwrap();

    let tree = TableTree::load(&access, shape).unwrap();
    let affinity = tree.lookup::<Element, Affinity>("elements.affinity").unwrap();
    assert_eq!(affinity.get(&Element::Water).unwrap().strong_against, ["Fire"]);
    assert!(!affinity.contains_key(&Element::Earth));
}

#[test]
fn unknown_enum_tag_is_key_error() {
    let access = MemoryAccess::new("cfg").with_file("affinity.json", r#"{"Air": null}"#);
    let shape = Shape::builder()
        .table::<Element, Option<Affinity>>("affinity")
        .build()
        .unwrap();

    let err = TableTree::load(&access, shape).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        LoadError::Codec(CodecError::KeyDecode { raw, key_type: "Element" }) if raw == "Air"
    ));
}
