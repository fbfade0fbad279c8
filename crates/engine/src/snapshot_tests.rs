// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use harel_core::StatePath;

fn load(json: &str) -> Machine {
    harel_spec::load(json).unwrap()
}

#[test]
fn snapshot_reports_active_leaf_and_meta() {
    let m = load(
        r#"{
            "id": "m",
            "initial": "a",
            "meta": {"owner": "team-x"},
            "states": { "a": {"tags": ["hot"], "description": "first state"} }
        }"#,
    );
    let mut config = Configuration::empty();
    config.insert(StatePath::new("m"));
    config.insert(StatePath::new("m.a"));
    let snapshot = StateSnapshot::capture(&m, &config, &BTreeMap::new(), false);

    assert_eq!(snapshot.status, Status::Active);
    assert_eq!(snapshot.current_state, "m.a");
    assert_eq!(snapshot.meta.get("m").unwrap().get("owner"), Some(&Value::String("team-x".to_string())));
    assert!(snapshot.tags.contains("hot"));
    assert_eq!(snapshot.description.as_deref(), Some("first state"));
}

#[test]
fn done_snapshot_carries_final_output() {
    let m = load(r#"{"id":"m","initial":"a","states":{"a":{},"b":{"type":"final","output":{"ok":true}}}}"#);
    let mut config = Configuration::empty();
    config.insert(StatePath::new("m"));
    config.insert(StatePath::new("m.b"));
    let snapshot = StateSnapshot::capture(&m, &config, &BTreeMap::new(), true);

    assert_eq!(snapshot.status, Status::Done);
    assert_eq!(snapshot.output, Some(Value::Map(BTreeMap::from([("ok".to_string(), Value::Bool(true))]))));
}

#[test]
fn parallel_configuration_joins_leaves_with_bar() {
    let m = load(
        r#"{
            "id": "m",
            "type": "parallel",
            "states": {
                "p1": {"initial": "a", "states": {"a": {}}},
                "p2": {"initial": "b", "states": {"b": {}}}
            }
        }"#,
    );
    let mut config = Configuration::empty();
    for p in ["m", "m.p1", "m.p1.a", "m.p2", "m.p2.b"] {
        config.insert(StatePath::new(p));
    }
    let snapshot = StateSnapshot::capture(&m, &config, &BTreeMap::new(), false);
    assert_eq!(snapshot.current_state, "m.p1.a|m.p2.b");
}
