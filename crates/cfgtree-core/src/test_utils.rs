//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use serde::{Deserialize, Serialize};

use crate::access::MemoryAccess;
use crate::shape::Shape;

// ===========================================================================
// Row types
// ===========================================================================

/// A typical configuration row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub price: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A second row type, so sibling tables differ in `V`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upgrade {
    pub item: i32,
    pub level: u8,
}

pub fn item(name: &str, price: u32) -> Item {
    Item {
        name: name.to_string(),
        price,
        tags: Vec::new(),
    }
}

// ===========================================================================
// Two-level scenario
// ===========================================================================

/// Root table `a` plus namespace `ns` holding tables `a` and `a2`.
pub fn scenario_shape() -> Shape {
    let ns = Shape::builder()
        .table::<i32, Item>("a")
        .table::<i32, Upgrade>("a2")
        .build()
        .expect("ns shape is valid");
    Shape::builder()
        .table::<i32, Item>("a")
        .namespace("ns", ns)
        .build()
        .expect("root shape is valid")
}

pub const SCENARIO_ROOT_A: &str = r#"{
    "1": {"name": "sword", "price": 10, "tags": ["weapon"]},
    "2": {"name": "shield", "price": 7}
}"#;

pub const SCENARIO_NS_A: &str = r#"{"3": {"name": "potion", "price": 2}}"#;

pub const SCENARIO_NS_A2: &str = r#"{"1": {"item": 1, "level": 2}}"#;

/// In-memory files matching [`scenario_shape`], rooted at `data`.
pub fn scenario_access() -> MemoryAccess {
    MemoryAccess::new("data")
        .with_file("a.json", SCENARIO_ROOT_A)
        .with_file("ns/a.json", SCENARIO_NS_A)
        .with_file("ns/a2.json", SCENARIO_NS_A2)
}

/// JSON text for a table of `rows` generated items keyed `0..rows`.
pub fn generated_items(rows: usize) -> String {
    let body = (0..rows)
        .map(|i| {
            format!(
                r#""{i}": {{"name": "item_{i}", "price": {}, "tags": ["t{}"]}}"#,
                i % 1000,
                i % 7
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{body}}}")
}
