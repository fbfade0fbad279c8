// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn is_truthy_matches_js_like_coercion() {
    assert!(!Value::Null.is_truthy());
    assert!(!Value::Int(0).is_truthy());
    assert!(Value::Int(5).is_truthy());
    assert!(!Value::String(String::new()).is_truthy());
    assert!(Value::String("x".into()).is_truthy());
}

#[test]
fn get_reads_map_field() {
    let mut m = BTreeMap::new();
    m.insert("v".to_string(), Value::Int(10));
    let ctx = Value::Map(m);
    assert_eq!(ctx.get("v"), Some(&Value::Int(10)));
    assert_eq!(ctx.get("missing"), None);
}

#[test]
fn from_json_converts_nested_structures() {
    let json = serde_json::json!({"a": 1, "b": [true, "x"]});
    let v: Value = json.into();
    let m = v.as_map().unwrap();
    assert_eq!(m.get("a"), Some(&Value::Int(1)));
    assert_eq!(m.get("b"), Some(&Value::List(vec![Value::Bool(true), Value::String("x".into())])));
}

#[test]
fn roundtrips_through_serde_json() {
    let v = Value::Map(BTreeMap::from([
        ("n".to_string(), Value::Int(42)),
        ("s".to_string(), Value::String("hi".into())),
    ]));
    let json = serde_json::to_string(&v).unwrap();
    let back: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v, back);
}
