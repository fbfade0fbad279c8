// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Event Bus Orchestrator: the process-wide registry of machine actors.
//!
//! Routes `send` deliveries between actors, enforces the registry's
//! back-pressure policy, and hosts the deferred-send buffer a macrostep's
//! `send { to: Some(_) }` actions land in — flushed only once that
//! macrostep has fully settled, so an action can never reenter a machine
//! still mid-step.

mod error;

pub use error::OrchestratorError;

use harel_core::Value;
use harel_engine::{ActorHandle, OverflowPolicy, RoutingMode, StepOutcome};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// One undelivered `send` awaiting the next flush.
struct Pending {
    event: String,
    data: Value,
}

/// Owns the id → actor mapping and the per-target deferred-send buffers.
///
/// The registry itself (`actors`) and the deferred buffers are each behind
/// their own `parking_lot::Mutex`, matching the teacher's convention of
/// keeping lock scopes narrow around plain in-memory maps rather than
/// wrapping the whole orchestrator in one lock.
pub struct Orchestrator {
    actors: Mutex<HashMap<String, ActorHandle>>,
    deferred: Mutex<HashMap<String, VecDeque<Pending>>>,
    routing_mode: RoutingMode,
    overflow_policy: OverflowPolicy,
    mailbox_capacity: usize,
}

impl Orchestrator {
    pub fn new(routing_mode: RoutingMode, overflow_policy: OverflowPolicy, mailbox_capacity: usize) -> Self {
        Self {
            actors: Mutex::new(HashMap::new()),
            deferred: Mutex::new(HashMap::new()),
            routing_mode,
            overflow_policy,
            mailbox_capacity,
        }
    }

    /// Registers a running actor under `id`. Registration is exclusive:
    /// a second registration under the same id is an error.
    pub fn register(&self, id: impl Into<String>, handle: ActorHandle) -> Result<(), OrchestratorError> {
        let id = id.into();
        let mut actors = self.actors.lock();
        if actors.contains_key(&id) {
            return Err(OrchestratorError::AlreadyRegistered(id));
        }
        actors.insert(id, handle);
        Ok(())
    }

    pub fn unregister(&self, id: &str) {
        self.actors.lock().remove(id);
        self.deferred.lock().remove(id);
    }

    /// Enqueues `event` for `target` in its deferred-send buffer. Honors
    /// the configured `RoutingMode` for unknown targets and `OverflowPolicy`
    /// when the buffer is at `mailbox_capacity`.
    pub fn route(&self, target: &str, event: impl Into<String>, data: Value) -> Result<(), OrchestratorError> {
        if !self.actors.lock().contains_key(target) {
            return match self.routing_mode {
                RoutingMode::Strict => Err(OrchestratorError::UnknownTarget(target.to_string())),
                RoutingMode::BestEffort => {
                    tracing::warn!(target, "best-effort route to unknown target dropped");
                    Ok(())
                }
            };
        }

        let mut deferred = self.deferred.lock();
        let queue = deferred.entry(target.to_string()).or_default();
        if queue.len() >= self.mailbox_capacity {
            match self.overflow_policy {
                OverflowPolicy::Reject => return Err(OrchestratorError::QueueFull { machine: target.to_string() }),
                OverflowPolicy::DropOldest => {
                    queue.pop_front();
                    tracing::warn!(target, "mailbox buffer full, dropped oldest pending send");
                }
            }
        }
        queue.push_back(Pending { event: event.into(), data });
        Ok(())
    }

    /// Delivers every pending send buffered for `target` since the last
    /// flush, in FIFO order.
    pub async fn flush(&self, target: &str) -> Result<(), OrchestratorError> {
        let pending: Vec<Pending> = {
            let mut deferred = self.deferred.lock();
            deferred.get_mut(target).map(std::mem::take).unwrap_or_default().into_iter().collect()
        };
        let handle = self.actors.lock().get(target).cloned();
        let Some(handle) = handle else {
            return Err(OrchestratorError::UnknownTarget(target.to_string()));
        };
        for item in pending {
            handle.send(item.event, item.data).await?;
        }
        Ok(())
    }

    pub async fn flush_all(&self) -> Result<(), OrchestratorError> {
        let targets: Vec<String> = self.deferred.lock().keys().cloned().collect();
        for target in targets {
            self.flush(&target).await?;
        }
        Ok(())
    }

    /// Sends `event` to `target` and waits for the resulting macrostep,
    /// then routes and flushes any `outbound` messages it produced — the
    /// "flushed atomically at macrostep completion" rule, applied one hop
    /// at a time so a chain of `send`s settles before this call returns.
    pub async fn dispatch(&self, target: &str, event: impl Into<String>, data: Value) -> Result<StepOutcome, OrchestratorError> {
        let handle = self.actors.lock().get(target).cloned().ok_or_else(|| OrchestratorError::UnknownTarget(target.to_string()))?;
        let outcome = handle.send_and_wait(event, data).await?;
        for message in &outcome.outbound {
            self.route(&message.to, message.event.clone(), message.data.clone())?;
        }
        for message in &outcome.outbound {
            self.flush(&message.to).await?;
        }
        Ok(outcome)
    }

    /// Drains every buffered deferred send to its target, then stops every
    /// registered actor and drops the registry. A single target's drain
    /// failing (mailbox gone, target never actually registered) is logged
    /// and skipped rather than aborting the rest of the shutdown.
    pub async fn shutdown(&self) {
        let targets: Vec<String> = self.deferred.lock().keys().cloned().collect();
        for target in targets {
            if let Err(err) = self.flush(&target).await {
                tracing::warn!(target, error = %err, "failed to drain deferred sends during shutdown");
            }
        }
        let handles: Vec<ActorHandle> = self.actors.lock().drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.stop().await;
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
