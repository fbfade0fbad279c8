// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The active set of state paths for one machine, plus the helpers that
//! keep it consistent with the static hierarchy (spec §3 invariants a-c).

use harel_core::StatePath;
use harel_spec::{HistoryDepth, Machine, StateKind, StateNode};
use std::collections::BTreeSet;

/// The set of currently-active state paths for one machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration(BTreeSet<StatePath>);

impl Configuration {
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, path: &StatePath) -> bool {
        self.0.contains(path)
    }

    pub fn insert(&mut self, path: StatePath) {
        self.0.insert(path);
    }

    pub fn remove(&mut self, path: &StatePath) {
        self.0.remove(path);
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatePath> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every currently-active atomic/final leaf, deepest states only.
    pub fn leaves<'m>(&self, machine: &'m Machine) -> Vec<&'m StateNode> {
        self.0
            .iter()
            .filter_map(|p| machine.find(p))
            .filter(|n| n.is_atomic_leaf())
            .collect()
    }

    /// Checks invariants (a) compound states have exactly one active child,
    /// (b) parallel states have every region active, (c) atomic/final
    /// states have no active children.
    pub fn check_invariants(&self, machine: &Machine) -> Result<(), String> {
        for path in &self.0 {
            let Some(node) = machine.find(path) else {
                return Err(format!("configuration references unknown path {path}"));
            };
            match &node.kind {
                StateKind::Compound { children, .. } => {
                    let active_children: Vec<_> =
                        children.iter().filter(|c| self.0.contains(&c.path)).collect();
                    if active_children.len() != 1 {
                        return Err(format!(
                            "compound state {path} has {} active children, expected 1",
                            active_children.len()
                        ));
                    }
                }
                StateKind::Parallel { regions } => {
                    for region in regions {
                        if !self.0.contains(&region.path) {
                            return Err(format!(
                                "parallel state {path} missing active region {}",
                                region.path
                            ));
                        }
                    }
                }
                StateKind::Atomic | StateKind::Final { .. } => {
                    let has_active_child = self.0.iter().any(|p| p != path && path.contains(p));
                    if has_active_child {
                        return Err(format!("atomic/final state {path} has active children"));
                    }
                }
                StateKind::History { .. } => {}
            }
        }
        Ok(())
    }

    /// Expands a target path into its full entry set: compound states pull
    /// in their `initial` child, parallel states pull in every region,
    /// history states resolve from `memory` or their `fallback`.
    pub fn expand_entry_set(
        machine: &Machine,
        target: &StatePath,
        memory: &std::collections::HashMap<StatePath, Vec<StatePath>>,
    ) -> Vec<StatePath> {
        let mut out = Vec::new();
        expand_into(machine, target, memory, &mut out);
        out
    }
}

fn expand_into(
    machine: &Machine,
    target: &StatePath,
    memory: &std::collections::HashMap<StatePath, Vec<StatePath>>,
    out: &mut Vec<StatePath>,
) {
    let Some(node) = machine.find(target) else { return };
    match &node.kind {
        StateKind::Atomic | StateKind::Final { .. } => {
            out.push(target.clone());
        }
        StateKind::Compound { initial, children } => {
            out.push(target.clone());
            let initial_path = target.child(initial);
            let _ = children;
            expand_into(machine, &initial_path, memory, out);
        }
        StateKind::Parallel { regions } => {
            out.push(target.clone());
            for region in regions {
                expand_into(machine, &region.path, memory, out);
            }
        }
        StateKind::History { depth, fallback } => {
            if let Some(remembered) = memory.get(target) {
                match depth {
                    HistoryDepth::Deep => out.extend(remembered.iter().cloned()),
                    HistoryDepth::Shallow => {
                        if let Some(first) = remembered.first() {
                            expand_into(machine, first, memory, out);
                        }
                    }
                }
            } else {
                for f in fallback {
                    expand_into(machine, f, memory, out);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "configuration_tests.rs"]
mod tests;
