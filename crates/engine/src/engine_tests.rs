// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use harel_core::FakeClock;
use tokio::sync::mpsc;

fn load(json: &str) -> Machine {
    harel_spec::load(json).unwrap()
}

fn new_engine(machine: Machine, registry: Registry) -> (MachineEngine<FakeClock>, FakeClock, mpsc::Receiver<ServiceOutcome>) {
    let clock = FakeClock::new();
    let (tx, rx) = mpsc::channel(16);
    (MachineEngine::new(machine, registry, clock.clone(), tx, 10_000), clock, rx)
}

#[test]
fn start_enters_initial_leaf() {
    let m = load(r#"{"id":"m","initial":"idle","states":{"idle":{},"running":{}}}"#);
    let (mut engine, _clock, _rx) = new_engine(m, Registry::new());
    engine.start().unwrap();
    assert!(engine.configuration().contains(&StatePath::new("m.idle")));
}

#[test]
fn send_follows_a_matching_on_transition() {
    let m = load(r#"{"id":"m","initial":"idle","states":{"idle":{"on":{"GO":"running"}},"running":{}}}"#);
    let (mut engine, _clock, _rx) = new_engine(m, Registry::new());
    engine.start().unwrap();
    let outcome = engine.send("GO", Value::Null).unwrap();
    assert!(outcome.changed);
    assert!(engine.configuration().contains(&StatePath::new("m.running")));
    assert!(!engine.configuration().contains(&StatePath::new("m.idle")));
}

#[test]
fn always_transition_with_guard_fires_on_entry() {
    let m = load(
        r#"{
            "id": "m",
            "initial": "checking",
            "context": {"v": 10},
            "states": {
                "checking": { "always": [{"target": "hi", "cond": "big"}, {"target": "lo"}] },
                "hi": {},
                "lo": {}
            }
        }"#,
    );
    let registry = Registry::new().guard("big", |ctx, _data| Ok(ctx.get("v").and_then(Value::as_int).unwrap_or(0) > 5));
    let (mut engine, _clock, _rx) = new_engine(m, registry);
    engine.start().unwrap();
    assert!(engine.configuration().contains(&StatePath::new("m.hi")));
}

#[test]
fn after_timer_fires_and_transitions() {
    let m = load(
        r#"{"id":"m","initial":"waiting","states":{"waiting":{"after":{"100":"timed_out"}},"timed_out":{}}}"#,
    );
    let (mut engine, clock, _rx) = new_engine(m, Registry::new());
    engine.start().unwrap();
    let deadline = engine.next_timer_deadline().unwrap();
    clock.set(deadline);

    engine.fire_timer("after(100,m.waiting)".to_string(), StatePath::new("m.waiting")).unwrap();
    assert!(engine.configuration().contains(&StatePath::new("m.timed_out")));
}

#[test]
fn event_cancels_pending_after_timer() {
    let m = load(
        r#"{
            "id": "m",
            "initial": "waiting",
            "states": {
                "waiting": { "after": {"100": "timed_out"}, "on": {"CANCEL": "cancelled"} },
                "timed_out": {},
                "cancelled": {}
            }
        }"#,
    );
    let (mut engine, _clock, _rx) = new_engine(m, Registry::new());
    engine.start().unwrap();
    assert!(engine.next_timer_deadline().is_some());
    engine.send("CANCEL", Value::Null).unwrap();
    assert!(engine.configuration().contains(&StatePath::new("m.cancelled")));
    assert!(engine.next_timer_deadline().is_none(), "timer must be cancelled on exit");
}

#[test]
fn parallel_on_done_fires_once_every_region_reaches_final() {
    let m = load(
        r#"{
            "id": "m",
            "initial": "working",
            "states": {
                "working": {
                    "type": "parallel",
                    "onDone": "complete",
                    "states": {
                        "a": {"initial": "running", "states": {"running": {"on": {"FINISH_A": "done_a"}}, "done_a": {"type": "final"}}},
                        "b": {"initial": "running", "states": {"running": {"on": {"FINISH_B": "done_b"}}, "done_b": {"type": "final"}}}
                    }
                },
                "complete": {}
            }
        }"#,
    );
    let (mut engine, _clock, _rx) = new_engine(m, Registry::new());
    engine.start().unwrap();
    engine.send("FINISH_A", Value::Null).unwrap();
    assert!(!engine.configuration().contains(&StatePath::new("m.complete")));
    engine.send("FINISH_B", Value::Null).unwrap();
    assert!(engine.configuration().contains(&StatePath::new("m.complete")));
}

#[test]
fn deep_history_restores_nested_leaf() {
    let m = load(
        r#"{
            "id": "m",
            "initial": "a",
            "on": {"TO_B": "b", "BACK": "#m.a.hist"},
            "states": {
                "a": {
                    "initial": "a1",
                    "states": {
                        "a1": {"on": {"NEXT": "a2"}},
                        "a2": {},
                        "hist": {"type": "history", "history": "deep", "target": "a1"}
                    }
                },
                "b": {}
            }
        }"#,
    );
    let (mut engine, _clock, _rx) = new_engine(m, Registry::new());
    engine.start().unwrap();
    engine.send("NEXT", Value::Null).unwrap();
    assert!(engine.configuration().contains(&StatePath::new("m.a.a2")));
    engine.send("TO_B", Value::Null).unwrap();
    assert!(engine.configuration().contains(&StatePath::new("m.b")));
    engine.send("BACK", Value::Null).unwrap();
    assert!(engine.configuration().contains(&StatePath::new("m.a.a2")), "deep history should restore a2, not the default a1");
}

#[test]
fn unmatched_event_is_reported_but_not_fatal() {
    let m = load(r#"{"id":"m","initial":"idle","states":{"idle":{"on":{"GO":"running"}},"running":{}}}"#);
    let (mut engine, _clock, _rx) = new_engine(m, Registry::new());
    engine.start().unwrap();
    let outcome = engine.send("NOPE", Value::Null).unwrap();
    assert!(!outcome.matched);
    assert!(!outcome.changed);
    assert!(engine.configuration().contains(&StatePath::new("m.idle")));
}

#[test]
fn internal_self_transition_on_an_atomic_state_does_not_fire_exit_or_entry() {
    let m = load(
        r#"{
            "id": "counter",
            "initial": "running",
            "context": {"entries": 0, "exits": 0},
            "states": {
                "running": {
                    "entry": ["bump_entries"],
                    "exit": ["bump_exits"],
                    "on": {"TICK": {"target": "running", "internal": true}}
                }
            }
        }"#,
    );
    let registry = Registry::new()
        .action("bump_entries", |ctx, _event, _data| {
            let n = ctx.get("entries").and_then(Value::as_int).unwrap_or(0);
            ctx.insert("entries".to_string(), Value::Int(n + 1));
            Ok(())
        })
        .action("bump_exits", |ctx, _event, _data| {
            let n = ctx.get("exits").and_then(Value::as_int).unwrap_or(0);
            ctx.insert("exits".to_string(), Value::Int(n + 1));
            Ok(())
        });
    let (mut engine, _clock, _rx) = new_engine(m, registry);
    engine.start().unwrap();
    assert_eq!(engine.context().get("entries"), Some(&Value::Int(1)));

    engine.send("TICK", Value::Null).unwrap();
    engine.send("TICK", Value::Null).unwrap();

    assert_eq!(engine.context().get("entries"), Some(&Value::Int(1)), "internal self-transition must not re-run entry");
    assert_eq!(engine.context().get("exits"), Some(&Value::Int(0)), "internal self-transition must not run exit");
}

#[test]
fn internal_self_transition_does_not_re_arm_its_own_after_timer() {
    let m = load(
        r#"{
            "id": "m",
            "initial": "waiting",
            "states": {
                "waiting": { "after": {"100": "timed_out"}, "on": {"PING": {"target": "waiting", "internal": true}} },
                "timed_out": {}
            }
        }"#,
    );
    let (mut engine, clock, _rx) = new_engine(m, Registry::new());
    engine.start().unwrap();
    let original_deadline = engine.next_timer_deadline().unwrap();

    clock.advance(std::time::Duration::from_millis(50));
    engine.send("PING", Value::Null).unwrap();

    assert_eq!(
        engine.next_timer_deadline(),
        Some(original_deadline),
        "an internal self-transition must not cancel and re-arm the source's after timer"
    );
}

#[test]
fn stale_timer_popped_in_the_same_batch_as_its_exited_ancestor_is_discarded() {
    let m = load(
        r#"{
            "id": "m",
            "initial": "p",
            "states": {
                "p": {
                    "after": {"100": "p_timed_out"},
                    "initial": "a",
                    "states": {
                        "a": { "after": {"100": "a_timed_out"} }
                    }
                },
                "p_timed_out": {},
                "a_timed_out": {}
            }
        }"#,
    );
    let (mut engine, clock, _rx) = new_engine(m, Registry::new());
    engine.start().unwrap();
    let deadline = engine.next_timer_deadline().unwrap();
    clock.set(deadline);

    // Both "p" and "a" have a 100ms timer due at the same instant. "p"'s
    // timer is declared first and exits "a" along with it; "a"'s
    // already-popped timer must be discarded rather than fired against a
    // state that is no longer active.
    engine.fire_due_timers().unwrap();
    assert!(engine.configuration().contains(&StatePath::new("m.p_timed_out")));
    assert!(!engine.configuration().contains(&StatePath::new("m.a_timed_out")));
}

#[test]
fn unknown_guard_falls_back_to_the_unguarded_candidate() {
    let m = load(
        r#"{"id":"m","initial":"a","states":{"a":{"always":[{"target":"b","cond":"missing"},{"target":"c"}]},"b":{},"c":{}}}"#,
    );
    let (mut engine, _clock, _rx) = new_engine(m, Registry::new());
    engine.start().unwrap();
    assert!(engine.configuration().contains(&StatePath::new("m.c")));
}
