// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use harel_core::FakeClock;
use harel_engine::{Registry, RunnerConfig};

fn load(json: &str) -> harel_spec::Machine {
    harel_spec::load(json).unwrap()
}

#[tokio::test]
async fn routes_a_send_to_a_registered_target() {
    let m = load(r#"{"id":"pinger","initial":"idle","states":{"idle":{"on":{"PING":"pinged"}},"pinged":{}}}"#);
    let (handle, join) = harel_engine::spawn(m, Registry::new(), FakeClock::new(), RunnerConfig::default());

    let orchestrator = Orchestrator::new(RoutingMode::Strict, OverflowPolicy::Reject, 16);
    orchestrator.register("pinger", handle.clone()).unwrap();

    orchestrator.route("pinger", "PING", Value::Null).unwrap();
    orchestrator.flush("pinger").await.unwrap();
    tokio::task::yield_now().await;

    let snapshot = handle.ask().await.unwrap();
    assert_eq!(snapshot.current_state, "pinger.pinged");

    orchestrator.shutdown().await;
    join.await.unwrap();
}

#[tokio::test]
async fn strict_routing_rejects_unknown_targets() {
    let orchestrator = Orchestrator::new(RoutingMode::Strict, OverflowPolicy::Reject, 16);
    let result = orchestrator.route("nobody", "X", Value::Null);
    assert!(matches!(result, Err(OrchestratorError::UnknownTarget(_))));
}

#[tokio::test]
async fn best_effort_routing_drops_unknown_targets_silently() {
    let orchestrator = Orchestrator::new(RoutingMode::BestEffort, OverflowPolicy::Reject, 16);
    let result = orchestrator.route("nobody", "X", Value::Null);
    assert!(result.is_ok());
}

#[tokio::test]
async fn double_registration_is_rejected() {
    let m = load(r#"{"id":"m","initial":"a","states":{"a":{}}}"#);
    let (handle, join) = harel_engine::spawn(m, Registry::new(), FakeClock::new(), RunnerConfig::default());
    let orchestrator = Orchestrator::new(RoutingMode::Strict, OverflowPolicy::Reject, 16);
    orchestrator.register("m", handle.clone()).unwrap();
    assert!(matches!(orchestrator.register("m", handle.clone()), Err(OrchestratorError::AlreadyRegistered(_))));
    orchestrator.shutdown().await;
    join.await.unwrap();
}

#[tokio::test]
async fn overflow_reject_policy_surfaces_queue_full() {
    let m = load(r#"{"id":"m","initial":"a","states":{"a":{}}}"#);
    let (handle, join) = harel_engine::spawn(m, Registry::new(), FakeClock::new(), RunnerConfig::default());
    let orchestrator = Orchestrator::new(RoutingMode::Strict, OverflowPolicy::Reject, 2);
    orchestrator.register("m", handle.clone()).unwrap();

    orchestrator.route("m", "A", Value::Null).unwrap();
    orchestrator.route("m", "B", Value::Null).unwrap();
    let result = orchestrator.route("m", "C", Value::Null);
    assert!(matches!(result, Err(OrchestratorError::QueueFull { .. })));

    orchestrator.shutdown().await;
    join.await.unwrap();
}

#[tokio::test]
async fn overflow_drop_oldest_policy_evicts_the_front_entry() {
    let m = load(r#"{"id":"m","initial":"a","states":{"a":{"on":{"B":"b"}},"b":{"on":{"C":"c"}},"c":{}}}"#);
    let (handle, join) = harel_engine::spawn(m, Registry::new(), FakeClock::new(), RunnerConfig::default());
    let orchestrator = Orchestrator::new(RoutingMode::Strict, OverflowPolicy::DropOldest, 2);
    orchestrator.register("m", handle.clone()).unwrap();

    orchestrator.route("m", "A", Value::Null).unwrap(); // will be evicted
    orchestrator.route("m", "B", Value::Null).unwrap();
    orchestrator.route("m", "C", Value::Null).unwrap();
    orchestrator.flush("m").await.unwrap();
    tokio::task::yield_now().await;

    let snapshot = handle.ask().await.unwrap();
    assert_eq!(snapshot.current_state, "m.c", "A should have been evicted, leaving B then C to apply");

    orchestrator.shutdown().await;
    join.await.unwrap();
}
