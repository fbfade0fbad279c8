// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine Actor: a single-threaded mailbox driving one statechart.
//!
//! Each actor owns a dedicated `tokio::task`; its `MachineEngine` is never
//! shared behind a lock. Cross-actor communication happens only through
//! `mpsc` mailboxes, matching the cooperative-scheduling model: suspension
//! points occur only between macrosteps, while awaiting an invoked
//! service's outcome, or while awaiting a mailbox enqueue.

use crate::config::RunnerConfig;
use crate::engine::{MachineEngine, StepOutcome};
use crate::error::RuntimeError;
use crate::registry::Registry;
use crate::service::ServiceOutcome;
use crate::snapshot::StateSnapshot;
use harel_core::{Clock, Value};
use harel_spec::Machine;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

tokio::task_local! {
    /// Set for the lifetime of one actor's processing future. Lets
    /// [`ActorHandle::send`] detect a same-actor reentrant call — an action
    /// that synchronously sends back to the machine it is running under,
    /// which would otherwise deadlock the actor waiting on itself.
    static CURRENT_ACTOR: String;
}

enum Command {
    Send { event: String, data: Value, reply: Option<oneshot::Sender<Result<StepOutcome, RuntimeError>>> },
    Ask(oneshot::Sender<StateSnapshot>),
    Stop,
}

/// A cheaply-cloneable reference to a running machine actor.
#[derive(Clone)]
pub struct ActorHandle {
    id: String,
    tx: mpsc::Sender<Command>,
}

impl ActorHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fire-and-forget send: enqueues on the mailbox and returns once
    /// accepted, without waiting for the macrostep to settle.
    pub async fn send(&self, event: impl Into<String>, data: Value) -> Result<(), RuntimeError> {
        if self.is_reentrant() {
            return Err(RuntimeError::ReentrantSend { machine: self.id.clone() });
        }
        self.tx
            .send(Command::Send { event: event.into(), data, reply: None })
            .await
            .map_err(|_| RuntimeError::MachineDone(self.id.clone()))
    }

    /// Like [`send`](Self::send) but waits for the triggered macrostep to
    /// reach quiescence and returns what changed.
    pub async fn send_and_wait(&self, event: impl Into<String>, data: Value) -> Result<StepOutcome, RuntimeError> {
        if self.is_reentrant() {
            return Err(RuntimeError::ReentrantSend { machine: self.id.clone() });
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Send { event: event.into(), data, reply: Some(reply_tx) })
            .await
            .map_err(|_| RuntimeError::MachineDone(self.id.clone()))?;
        reply_rx.await.map_err(|_| RuntimeError::MachineDone(self.id.clone()))?
    }

    pub async fn ask(&self) -> Result<StateSnapshot, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(Command::Ask(tx)).await.map_err(|_| RuntimeError::MachineDone(self.id.clone()))?;
        rx.await.map_err(|_| RuntimeError::MachineDone(self.id.clone()))
    }

    pub async fn stop(&self) {
        let _ = self.tx.send(Command::Stop).await;
    }

    fn is_reentrant(&self) -> bool {
        CURRENT_ACTOR.try_with(|current| current == &self.id).unwrap_or(false)
    }
}

/// Spawns `machine` as its own task and returns a handle plus the task's
/// `JoinHandle` (for awaiting clean shutdown in tests and the CLI).
pub fn spawn<C>(machine: Machine, registry: Registry, clock: C, config: RunnerConfig) -> (ActorHandle, JoinHandle<()>)
where
    C: Clock + 'static,
{
    let id = machine.id.clone();
    let handle_id = id.clone();
    let (tx, rx) = mpsc::channel(config.mailbox_capacity);
    let (outcomes_tx, outcomes_rx) = mpsc::channel(config.mailbox_capacity);
    let mut engine = MachineEngine::new(machine, registry, clock, outcomes_tx, config.max_microsteps);

    let join = tokio::spawn(CURRENT_ACTOR.scope(id.clone(), async move {
        if let Err(err) = engine.start() {
            tracing::error!(machine = %id, error = %err, "machine failed to start");
            return;
        }
        run_loop(&id, &mut engine, rx, outcomes_rx).await;
    }));

    (ActorHandle { id: handle_id, tx }, join)
}

async fn run_loop<C: Clock>(
    id: &str,
    engine: &mut MachineEngine<C>,
    mut rx: mpsc::Receiver<Command>,
    mut outcomes_rx: mpsc::Receiver<ServiceOutcome>,
) {
    loop {
        if engine.is_done() {
            // Drain remaining Ask requests with a final snapshot, then exit;
            // further Send requests get MachineDone via the closed channel.
            while let Ok(cmd) = rx.try_recv() {
                if let Command::Ask(tx) = cmd {
                    let _ = tx.send(snapshot(engine));
                }
            }
            break;
        }

        let sleep = match engine.next_timer_deadline() {
            Some(deadline) => tokio::time::sleep(deadline.saturating_duration_since(std::time::Instant::now())),
            None => tokio::time::sleep(std::time::Duration::from_secs(60 * 60 * 24)),
        };
        tokio::pin!(sleep);

        tokio::select! {
            biased;

            cmd = rx.recv() => {
                match cmd {
                    None | Some(Command::Stop) => break,
                    Some(Command::Ask(tx)) => {
                        let _ = tx.send(snapshot(engine));
                    }
                    Some(Command::Send { event, data, reply }) => {
                        let result = engine.send(event, data);
                        log_outcome(id, &result);
                        let fatal = matches!(&result, Err(err) if err.is_fatal());
                        if let Some(reply) = reply {
                            let _ = reply.send(result);
                        }
                        if fatal {
                            break;
                        }
                    }
                }
            }

            Some(outcome) = outcomes_rx.recv() => {
                let result = engine.deliver_service_outcome(outcome);
                log_outcome(id, &result);
                if matches!(&result, Err(err) if err.is_fatal()) {
                    break;
                }
            }

            _ = &mut sleep, if engine.next_timer_deadline().is_some() => {
                let result = engine.fire_due_timers();
                log_outcome(id, &result);
                if matches!(&result, Err(err) if err.is_fatal()) {
                    break;
                }
            }
        }
    }
}

fn snapshot<C: Clock>(engine: &MachineEngine<C>) -> StateSnapshot {
    StateSnapshot::capture(engine.machine(), engine.configuration(), engine.context(), engine.is_done())
}

fn log_outcome(id: &str, result: &Result<StepOutcome, RuntimeError>) {
    match result {
        Ok(outcome) if !outcome.matched && !outcome.changed => {
            tracing::debug!(machine = %id, "event did not match any transition");
        }
        Ok(_) => {}
        Err(err) if err.is_fatal() => {
            tracing::error!(machine = %id, error = %err, "fatal error, stopping actor");
        }
        Err(err) => {
            tracing::warn!(machine = %id, error = %err, "recoverable error");
        }
    }
}

#[cfg(test)]
#[path = "actor_tests.rs"]
mod tests;
