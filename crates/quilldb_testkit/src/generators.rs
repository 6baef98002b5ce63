//! Property-based test generators using proptest.
//!
//! Provides strategies for generating keys, storable values and records.

use proptest::prelude::*;
use quilldb_codec::{Key, Record, Value};
use std::collections::BTreeMap;

/// Strategy for generating field names.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}").expect("Invalid regex")
}

/// Strategy for generating primary keys of every scalar kind.
pub fn key_strategy() -> impl Strategy<Value = Key> {
    prop_oneof![
        any::<bool>().prop_map(Key::Bool),
        any::<i64>().prop_map(Key::Integer),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Key::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Key::Bytes),
    ]
}

/// Strategy for the keys most easily mistaken for "no key": `0`, `""` and
/// `false`.
pub fn falsy_key_strategy() -> impl Strategy<Value = Key> {
    prop_oneof![
        Just(Key::Integer(0)),
        Just(Key::Text(String::new())),
        Just(Key::Bool(false)),
    ]
}

/// Strategy for generating storable values, nested up to three levels.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[a-zA-Z0-9 ]{0,24}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(field_name_strategy(), inner, 0..4)
                .prop_map(Value::Map),
        ]
    })
}

/// Strategy for generating storable records.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    prop::collection::btree_map(field_name_strategy(), value_strategy(), 0..6)
        .prop_map(|fields: BTreeMap<String, Value>| Record::from(fields))
}

/// Strategy for generating person names of one to three words.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[A-Z][a-z]{1,8}", 1..=3).prop_map(|words| words.join(" "))
}
