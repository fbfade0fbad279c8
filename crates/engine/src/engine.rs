// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution Engine: the SCXML-style microstep/macrostep interpreter.
//!
//! One [`MachineEngine`] owns exactly one machine's configuration, context,
//! timers, and invoked services. It is synchronous and side-effecting
//! (timers are armed in-process, services are spawned as tokio tasks) but
//! never awaits — the owning actor drives it from its mailbox loop.

use crate::configuration::Configuration;
use crate::error::RuntimeError;
use crate::history::HistoryMemory;
use crate::registry::Registry;
use crate::resolver;
use crate::scheduler::Scheduler;
use crate::service::{self, ServiceOutcome};
use harel_core::{Clock, StatePath, Value};
use harel_spec::{ActionRef, AssignValue, Machine, StateKind, StateNode, TransitionDef};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct QueueItem {
    event: String,
    data: Value,
    /// Set when this item came from a fired `after` timer rather than an
    /// externally sent or raised event — routes dispatch through
    /// [`resolver::resolve_after`] instead of the normal `on` lookup.
    after_source: Option<StatePath>,
}

/// A message this machine asked to send to another machine (`send` action
/// with a `to` target). The owning actor/orchestrator is responsible for
/// delivery; the engine itself never reaches across machine boundaries.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub to: String,
    pub event: String,
    pub data: Value,
}

/// What changed as a result of one [`MachineEngine::send`]/`start`/`fire_timer` call.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub changed: bool,
    pub done: bool,
    pub outbound: Vec<OutboundMessage>,
    /// Whether the event that triggered this step (as opposed to any
    /// `raise`d/`always` follow-ups) matched a transition anywhere in the
    /// active configuration. `RoutingMode::Strict` surfaces `false` here as
    /// `RuntimeError::UnknownEvent`.
    pub matched: bool,
}

pub struct MachineEngine<C: Clock> {
    machine: Machine,
    registry: Registry,
    clock: C,
    config: Configuration,
    context: BTreeMap<String, Value>,
    history: HistoryMemory,
    scheduler: Scheduler,
    tokens: std::collections::HashMap<String, CancellationToken>,
    outcomes_tx: mpsc::Sender<ServiceOutcome>,
    queue: VecDeque<QueueItem>,
    max_microsteps: usize,
    done: bool,
}

impl<C: Clock> MachineEngine<C> {
    pub fn new(
        machine: Machine,
        registry: Registry,
        clock: C,
        outcomes_tx: mpsc::Sender<ServiceOutcome>,
        max_microsteps: usize,
    ) -> Self {
        let context = machine.context.clone();
        Self {
            machine,
            registry,
            clock,
            config: Configuration::empty(),
            context,
            history: HistoryMemory::new(),
            scheduler: Scheduler::new(),
            tokens: std::collections::HashMap::new(),
            outcomes_tx,
            queue: VecDeque::new(),
            max_microsteps,
            done: false,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn context(&self) -> &BTreeMap<String, Value> {
        &self.context
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn next_timer_deadline(&self) -> Option<std::time::Instant> {
        self.scheduler.next_deadline()
    }

    /// Enters the initial configuration and runs to quiescence. Entry
    /// action failures here are fatal (spec: repeated `ActionError` in the
    /// initial state's `entry` terminates the machine).
    pub fn start(&mut self) -> Result<StepOutcome, RuntimeError> {
        let root_path = self.machine.root.path.clone();
        let entry_set = Configuration::expand_entry_set(&self.machine, &root_path, self.history.as_map());
        let mut outcome = StepOutcome::default();
        for path in &entry_set {
            let Some(node) = self.machine.find(path) else { continue };
            for action in &node.entry {
                self.run_action(action, "", &Value::Null, path, &mut outcome).map_err(|err| {
                    RuntimeError::InitialEntryFailed { machine: self.machine.id.clone(), message: err.to_string() }
                })?;
            }
            self.arm_after_and_invoke(node, path);
            self.config.insert(path.clone());
            if matches!(node.kind, StateKind::Final { .. }) {
                self.on_final_entered(path);
            }
        }
        self.run_to_quiescence(&mut outcome)?;
        Ok(outcome)
    }

    pub fn send(&mut self, event: impl Into<String>, data: Value) -> Result<StepOutcome, RuntimeError> {
        if self.done {
            return Err(RuntimeError::MachineDone(self.machine.id.clone()));
        }
        self.queue.push_back(QueueItem { event: event.into(), data, after_source: None });
        let mut outcome = StepOutcome::default();
        self.run_to_quiescence(&mut outcome)?;
        Ok(outcome)
    }

    /// Delivers a fired `after` timer, identified by its synthetic event id
    /// and the state path that armed it.
    pub fn fire_timer(&mut self, id: String, source: StatePath) -> Result<StepOutcome, RuntimeError> {
        if self.done {
            return Err(RuntimeError::MachineDone(self.machine.id.clone()));
        }
        self.queue.push_back(QueueItem { event: id, data: Value::Null, after_source: Some(source) });
        let mut outcome = StepOutcome::default();
        self.run_to_quiescence(&mut outcome)?;
        Ok(outcome)
    }

    /// Delivers the outcome of a completed/failed invoked service.
    pub fn deliver_service_outcome(&mut self, outcome: ServiceOutcome) -> Result<StepOutcome, RuntimeError> {
        self.send(outcome.event, outcome.data)
    }

    /// Fires every timer whose deadline has passed as of `self.clock.now()`
    /// and runs to quiescence. A no-op (empty, unchanged outcome) if none
    /// are due yet; the caller is expected to have waited for
    /// [`Self::next_timer_deadline`] first.
    pub fn fire_due_timers(&mut self) -> Result<StepOutcome, RuntimeError> {
        if self.done {
            return Err(RuntimeError::MachineDone(self.machine.id.clone()));
        }
        let now = self.clock.now();
        for timer in self.scheduler.fired_timers(now) {
            self.queue.push_back(QueueItem { event: timer.id, data: Value::Null, after_source: Some(timer.source) });
        }
        let mut outcome = StepOutcome::default();
        self.run_to_quiescence(&mut outcome)?;
        Ok(outcome)
    }

    fn run_to_quiescence(&mut self, outcome: &mut StepOutcome) -> Result<(), RuntimeError> {
        let mut microsteps = 0usize;
        let mut first = true;
        loop {
            let transitions = if let Some(item) = self.queue.pop_front() {
                let found = if let Some(source) = &item.after_source {
                    resolver::resolve_after(&self.machine, &self.config, source, &item.event, &self.context, &self.registry)
                        .into_iter()
                        .collect::<Vec<_>>()
                } else {
                    resolver::resolve(&self.machine, &self.config, &item.event, &item.data, &self.context, &self.registry)
                };
                if first {
                    outcome.matched = !found.is_empty();
                    first = false;
                }
                found.into_iter().map(|t| (t, item.data.clone())).collect::<Vec<_>>()
            } else {
                first = false;
                let always = resolver::resolve_always(&self.machine, &self.config, &self.context, &self.registry);
                if always.is_empty() {
                    break;
                }
                always.into_iter().map(|t| (t, Value::Null)).collect()
            };

            if transitions.is_empty() {
                continue;
            }

            microsteps += 1;
            if microsteps > self.max_microsteps {
                let event = transitions.first().map(|(t, _)| t.event.clone()).unwrap_or_default();
                return Err(RuntimeError::MicrostepBudgetExceeded {
                    machine: self.machine.id.clone(),
                    event,
                    budget: self.max_microsteps,
                });
            }

            for (def, data) in &transitions {
                self.apply_transition(def, data, outcome);
            }
        }

        outcome.done = self.region_complete(&self.machine.root);
        self.done = outcome.done;
        Ok(())
    }

    fn apply_transition(&mut self, def: &TransitionDef, data: &Value, outcome: &mut StepOutcome) {
        if def.is_targetless() {
            self.run_actions(&def.actions, &def.event, data, &def.source, outcome);
            return;
        }

        let domain = transition_domain(&def.source, &def.targets, def.internal, &self.machine);

        let mut exit_set: Vec<StatePath> =
            self.config.iter().filter(|p| domain.contains(p) && p.as_str() != domain.as_str()).cloned().collect();
        exit_set.sort_by_key(|p| std::cmp::Reverse(p.depth()));

        self.record_history(&exit_set);

        for path in &exit_set {
            self.run_exit(path, data, outcome);
            self.config.remove(path);
        }

        self.run_actions(&def.actions, &def.event, data, &def.source, outcome);

        let mut entry_set: Vec<StatePath> = Vec::new();
        for target in &def.targets {
            // A target equal to the domain is the internal-self-transition
            // case: the state never exited, so it must not be re-entered.
            if target.as_str() == domain.as_str() {
                continue;
            }
            for p in ancestors_between(&domain, target) {
                if !entry_set.contains(&p) {
                    entry_set.push(p);
                }
            }
            for p in Configuration::expand_entry_set(&self.machine, target, self.history.as_map()) {
                if !entry_set.contains(&p) {
                    entry_set.push(p);
                }
            }
        }

        for path in &entry_set {
            self.config.insert(path.clone());
            let Some(node) = self.machine.find(path) else { continue };
            self.run_actions(&node.entry, "", data, path, outcome);
            self.arm_after_and_invoke(node, path);
            if matches!(node.kind, StateKind::Final { .. }) {
                self.on_final_entered(path);
            }
        }

        outcome.changed = true;
    }

    fn record_history(&mut self, exit_set: &[StatePath]) {
        for path in exit_set {
            let Some(node) = self.machine.find(path) else { continue };
            let StateKind::Compound { children, .. } = &node.kind else { continue };
            for child in children {
                if !matches!(child.kind, StateKind::History { .. }) {
                    continue;
                }
                let remembered: Vec<StatePath> =
                    self.config.iter().filter(|c| path.contains(c) && c.as_str() != path.as_str()).cloned().collect();
                if !remembered.is_empty() {
                    self.history.record(child.path.clone(), remembered);
                }
            }
        }
    }

    fn run_exit(&mut self, path: &StatePath, data: &Value, outcome: &mut StepOutcome) {
        self.scheduler.cancel_from(path);
        let Some(node) = self.machine.find(path) else { return };
        if let Some(invoke) = &node.invoke {
            if let Some(token) = self.tokens.remove(&invoke.id) {
                token.cancel();
            }
        }
        self.run_actions(&node.exit, "", data, path, outcome);
    }

    fn arm_after_and_invoke(&mut self, node: &StateNode, path: &StatePath) {
        for (ms, def) in &node.after {
            self.scheduler.set_timer(def.event.clone(), path.clone(), Duration::from_millis(*ms), self.clock.now());
        }
        if let Some(invoke) = &node.invoke {
            let token = CancellationToken::new();
            service::spawn(
                invoke.src.clone(),
                invoke.id.clone(),
                self.context.clone(),
                Value::Null,
                &self.registry,
                token.clone(),
                self.outcomes_tx.clone(),
            );
            self.tokens.insert(invoke.id.clone(), token);
        }
    }

    /// True once `node` has reached its own completion: a `final` state is
    /// trivially done, a compound is done once its active child is `final`,
    /// and a parallel is done once every region is.
    fn region_complete(&self, node: &StateNode) -> bool {
        match &node.kind {
            StateKind::Final { .. } => true,
            StateKind::Compound { children, .. } => {
                children.iter().any(|c| self.config.contains(&c.path) && matches!(c.kind, StateKind::Final { .. }))
            }
            StateKind::Parallel { regions } => regions.iter().all(|r| self.region_complete(r)),
            StateKind::Atomic | StateKind::History { .. } => false,
        }
    }

    fn on_final_entered(&mut self, final_path: &StatePath) {
        let Some(parent_path) = final_path.parent() else { return };
        let output = self.machine.find(final_path).and_then(|n| n.output.clone()).unwrap_or(Value::Null);
        self.queue.push_back(QueueItem {
            event: format!("done.state.{parent_path}"),
            data: output,
            after_source: None,
        });

        let mut region_path = parent_path;
        loop {
            let Some(gp_path) = region_path.parent() else { break };
            let Some(gp_node) = self.machine.find(&gp_path) else { break };
            let StateKind::Parallel { regions } = &gp_node.kind else { break };
            if !regions.iter().all(|r| self.region_complete(r)) {
                break;
            }
            self.queue.push_back(QueueItem { event: format!("done.state.{gp_path}"), data: Value::Null, after_source: None });
            region_path = gp_path;
        }
    }

    fn run_actions(&mut self, actions: &[ActionRef], event: &str, data: &Value, source: &StatePath, outcome: &mut StepOutcome) {
        for action in actions {
            if let Err(err) = self.run_action(action, event, data, source, outcome) {
                tracing::error!(error = %err, source = %source, "action failed, aborting remaining actions in this step");
                return;
            }
        }
    }

    fn run_action(
        &mut self,
        action: &ActionRef,
        event: &str,
        data: &Value,
        source: &StatePath,
        outcome: &mut StepOutcome,
    ) -> Result<(), RuntimeError> {
        match action {
            ActionRef::Named(name) => {
                let Some(f) = self.registry.get_action(name).cloned() else {
                    return Err(RuntimeError::UnknownAction(name.clone()));
                };
                f(&mut self.context, event, data).map_err(|message| RuntimeError::ActionError {
                    action: name.clone(),
                    source: source.to_string(),
                    message,
                })
            }
            ActionRef::Assign(map) => {
                for (key, value) in map {
                    let resolved = resolve_assign(value, data, &self.context);
                    self.context.insert(key.clone(), resolved);
                }
                Ok(())
            }
            ActionRef::Raise { event: raised } => {
                self.queue.push_back(QueueItem { event: raised.clone(), data: Value::Null, after_source: None });
                Ok(())
            }
            ActionRef::Send { event: sent, to, data: payload } => {
                let resolved = resolve_payload_map(payload, data, &self.context);
                match to {
                    None => self.queue.push_back(QueueItem { event: sent.clone(), data: resolved, after_source: None }),
                    Some(target) => outcome.outbound.push(OutboundMessage { to: target.clone(), event: sent.clone(), data: resolved }),
                }
                Ok(())
            }
            ActionRef::Spawn { src, id } => {
                let invoke_id = id.clone().unwrap_or_else(|| format!("{src}-spawn"));
                let token = CancellationToken::new();
                service::spawn(
                    src.clone(),
                    invoke_id.clone(),
                    self.context.clone(),
                    Value::Null,
                    &self.registry,
                    token.clone(),
                    self.outcomes_tx.clone(),
                );
                self.tokens.insert(invoke_id, token);
                Ok(())
            }
            ActionRef::Stop { id } => {
                if let Some(token) = self.tokens.remove(id) {
                    token.cancel();
                }
                Ok(())
            }
        }
    }
}

fn resolve_assign(value: &AssignValue, data: &Value, context: &BTreeMap<String, Value>) -> Value {
    match value {
        AssignValue::Literal(v) => v.clone(),
        AssignValue::EventField(field) => data.get(field).cloned().unwrap_or(Value::Null),
        AssignValue::ContextField(field) => context.get(field).cloned().unwrap_or(Value::Null),
    }
}

fn resolve_payload_map(map: &BTreeMap<String, AssignValue>, data: &Value, context: &BTreeMap<String, Value>) -> Value {
    let resolved: BTreeMap<String, Value> = map.iter().map(|(k, v)| (k.clone(), resolve_assign(v, data, context))).collect();
    Value::Map(resolved)
}

/// The transition domain: the lowest compound state that is a proper
/// ancestor of both `source` and every target, except for the "internal"
/// self-nested-transition case where `source` itself is the domain.
fn transition_domain(source: &StatePath, targets: &[StatePath], internal: bool, machine: &Machine) -> StatePath {
    if internal && machine.find(source).is_some() {
        let stays_within_source = !targets.is_empty()
            && targets.iter().all(|t| t.as_str() == source.as_str() || (source.contains(t) && t.as_str() != source.as_str()));
        if stays_within_source {
            return source.clone();
        }
    }

    let mut candidate = source.parent().unwrap_or_else(|| source.clone());
    loop {
        if targets.iter().all(|t| candidate.contains(t)) {
            return candidate;
        }
        match candidate.parent() {
            Some(p) => candidate = p,
            None => return candidate,
        }
    }
}

/// Proper ancestors of `target`, strictly below `domain`, shallowest first.
/// Empty when `target` *is* `domain` — the internal self-transition case,
/// where there is nothing between them to (re-)enter.
fn ancestors_between(domain: &StatePath, target: &StatePath) -> Vec<StatePath> {
    if target.as_str() == domain.as_str() {
        return Vec::new();
    }
    let mut chain = Vec::new();
    let mut cursor = target.parent();
    while let Some(p) = cursor {
        if p.as_str() == domain.as_str() {
            break;
        }
        chain.push(p.clone());
        cursor = p.parent();
    }
    chain.reverse();
    chain
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
