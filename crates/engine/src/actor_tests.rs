// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::RunnerConfig;
use harel_core::FakeClock;
use harel_spec::Machine;

fn load(json: &str) -> Machine {
    harel_spec::load(json).unwrap()
}

#[tokio::test]
async fn send_and_wait_reports_the_resulting_configuration() {
    let m = load(r#"{"id":"m","initial":"idle","states":{"idle":{"on":{"GO":"running"}},"running":{}}}"#);
    let (handle, join) = spawn(m, Registry::new(), FakeClock::new(), RunnerConfig::default());

    let outcome = handle.send_and_wait("GO", Value::Null).await.unwrap();
    assert!(outcome.changed);

    let snapshot = handle.ask().await.unwrap();
    assert_eq!(snapshot.current_state, "m.running");

    handle.stop().await;
    join.await.unwrap();
}

#[tokio::test]
async fn fire_and_forget_send_does_not_block_on_reply() {
    let m = load(r#"{"id":"m","initial":"idle","states":{"idle":{"on":{"GO":"running"}},"running":{}}}"#);
    let (handle, join) = spawn(m, Registry::new(), FakeClock::new(), RunnerConfig::default());

    handle.send("GO", Value::Null).await.unwrap();
    // give the actor a turn to process before asking
    tokio::task::yield_now().await;
    let snapshot = handle.ask().await.unwrap();
    assert_eq!(snapshot.current_state, "m.running");

    handle.stop().await;
    join.await.unwrap();
}

#[tokio::test]
async fn stop_terminates_the_actor_task() {
    let m = load(r#"{"id":"m","initial":"idle","states":{"idle":{}}}"#);
    let (handle, join) = spawn(m, Registry::new(), FakeClock::new(), RunnerConfig::default());
    handle.stop().await;
    join.await.unwrap();
    assert!(handle.send("ANYTHING", Value::Null).await.is_err());
}

#[tokio::test]
async fn reentrant_send_from_within_the_same_actor_is_rejected() {
    let m = load(r#"{"id":"m","initial":"idle","states":{"idle":{}}}"#);
    let (handle, join) = spawn(m, Registry::new(), FakeClock::new(), RunnerConfig::default());

    let inner = handle.clone();
    let result = CURRENT_ACTOR.scope("m".to_string(), async move { inner.send("X", Value::Null).await }).await;
    assert!(matches!(result, Err(RuntimeError::ReentrantSend { .. })));

    handle.stop().await;
    join.await.unwrap();
}

#[tokio::test]
async fn one_hundred_concurrent_sends_are_serialized_through_the_mailbox() {
    let m = load(
        r#"{
            "id": "counter",
            "initial": "running",
            "context": {"count": 0},
            "states": {
                "running": { "on": { "INCREMENT": { "target": "running", "internal": true, "actions": ["increment_count"] } } }
            }
        }"#,
    );
    let registry = Registry::new().action("increment_count", |ctx, _event, _data| {
        let current = ctx.get("count").and_then(Value::as_int).unwrap_or(0);
        ctx.insert("count".to_string(), Value::Int(current + 1));
        Ok(())
    });
    let (handle, join) = spawn(m, registry, FakeClock::new(), RunnerConfig::default());

    let sends: Vec<_> = (0..100)
        .map(|_| {
            let handle = handle.clone();
            async move { handle.send_and_wait("INCREMENT", Value::Null).await }
        })
        .collect();
    let results = futures_join_all(sends).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let snapshot = handle.ask().await.unwrap();
    assert_eq!(snapshot.context.get("count"), Some(&Value::Int(100)));

    handle.stop().await;
    join.await.unwrap();
}

/// Minimal stand-in for `futures::future::join_all` (no `futures` dependency
/// in this crate's stack) — drives a fixed batch of futures concurrently on
/// the current task set via `tokio::spawn`.
async fn futures_join_all<F>(futures: Vec<F>) -> Vec<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    let handles: Vec<_> = futures.into_iter().map(tokio::spawn).collect();
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results
}
