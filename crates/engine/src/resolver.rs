// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transition Resolver: given a configuration, an event, and context, picks
//! the ordered list of transitions the Execution Engine should take.

use crate::configuration::Configuration;
use crate::registry::Registry;
use harel_core::{StatePath, Value};
use harel_spec::{Machine, TransitionDef};
use std::collections::{BTreeMap, HashMap};

/// Resolve every transition that should fire for `event` against the
/// current configuration. Guard errors are treated as `false` and logged;
/// they never abort resolution (spec §7, `GuardError`).
pub fn resolve(
    machine: &Machine,
    config: &Configuration,
    event: &str,
    event_data: &Value,
    context: &BTreeMap<String, Value>,
    registry: &Registry,
) -> Vec<TransitionDef> {
    let mut chosen: HashMap<StatePath, TransitionDef> = HashMap::new();

    for leaf in config.leaves(machine) {
        if let Some(def) = resolve_for_leaf(machine, config, &leaf.path, event, event_data, context, registry) {
            chosen.entry(def.source.clone()).or_insert(def);
        }
    }

    filter_conflicts(chosen.into_values().collect())
}

/// Resolve every eventless (`always`) transition enabled against the
/// current configuration — checked once per microstep until quiescent.
pub fn resolve_always(
    machine: &Machine,
    config: &Configuration,
    context: &BTreeMap<String, Value>,
    registry: &Registry,
) -> Vec<TransitionDef> {
    let mut chosen: HashMap<StatePath, TransitionDef> = HashMap::new();

    for leaf in config.leaves(machine) {
        let mut cursor = Some(leaf.path.clone());
        while let Some(path) = cursor {
            let Some(node) = machine.find(&path) else { break };
            if let Some(def) = node
                .always
                .iter()
                .find(|c| guard_enabled(c.cond.as_deref(), config, context, &Value::Null, registry))
            {
                chosen.entry(def.source.clone()).or_insert_with(|| def.clone());
                break;
            }
            cursor = path.parent();
        }
    }

    filter_conflicts(chosen.into_values().collect())
}

/// Resolve the single transition a fired `after` timer should take, if its
/// guard (if any) still holds. Returns `None` if `source` is no longer in
/// the configuration — a timer popped from the scheduler in the same batch
/// as an earlier one that has since exited `source` must be discarded, not
/// fired against a stale state (spec: "a firing timer whose state has
/// since exited must be discarded by the engine").
pub fn resolve_after(
    machine: &Machine,
    config: &Configuration,
    source: &StatePath,
    event_id: &str,
    context: &BTreeMap<String, Value>,
    registry: &Registry,
) -> Option<TransitionDef> {
    if !config.contains(source) {
        return None;
    }
    let node = machine.find(source)?;
    let def = node.after.iter().find(|(_, d)| d.event == event_id).map(|(_, d)| d)?;
    if guard_enabled(def.cond.as_deref(), config, context, &Value::Null, registry) {
        Some(def.clone())
    } else {
        None
    }
}

fn resolve_for_leaf(
    machine: &Machine,
    config: &Configuration,
    leaf: &StatePath,
    event: &str,
    event_data: &Value,
    context: &BTreeMap<String, Value>,
    registry: &Registry,
) -> Option<TransitionDef> {
    let mut cursor = Some(leaf.clone());
    while let Some(path) = cursor {
        let node = machine.find(&path)?;
        if let Some(candidates) = node.on.get(event) {
            for candidate in candidates {
                if guard_enabled(candidate.cond.as_deref(), config, context, event_data, registry) {
                    return Some(candidate.clone());
                }
            }
        }
        cursor = path.parent();
    }
    None
}

fn guard_enabled(
    cond: Option<&str>,
    config: &Configuration,
    context: &BTreeMap<String, Value>,
    event_data: &Value,
    registry: &Registry,
) -> bool {
    let Some(cond) = cond else { return true };

    if let Some(inner) = cond.strip_prefix("in(").and_then(|s| s.strip_suffix(')')) {
        let inner = inner.trim().strip_prefix('#').unwrap_or(inner.trim());
        return config.contains(&StatePath::new(inner.to_string()));
    }

    match registry.get_guard(cond) {
        Some(guard) => match guard(context, event_data) {
            Ok(result) => result,
            Err(message) => {
                tracing::warn!(guard = cond, error = %message, "guard raised an error, treating as false");
                false
            }
        },
        None => {
            tracing::warn!(guard = cond, "no guard registered under this name, treating as false");
            false
        }
    }
}

/// Drop any selected transition whose source is a strict ancestor of
/// another selected transition's source — the deeper one wins (spec §4.2).
fn filter_conflicts(candidates: Vec<TransitionDef>) -> Vec<TransitionDef> {
    candidates
        .iter()
        .filter(|a| {
            !candidates
                .iter()
                .any(|b| a.source != b.source && a.source.contains(&b.source))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
