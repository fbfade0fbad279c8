// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The externally-visible view of a running machine — what `ask`/`harel run`
//! hand back after every macrostep.

use crate::configuration::Configuration;
use harel_core::Value;
use harel_spec::{Machine, StateKind};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Done,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StateSnapshot {
    pub status: Status,
    /// A canonical leaf path, or `|`-joined paths for a parallel configuration.
    pub current_state: String,
    pub context: BTreeMap<String, Value>,
    /// `meta` declared on each currently-active state, keyed by its path.
    pub meta: BTreeMap<String, BTreeMap<String, Value>>,
    pub tags: BTreeSet<String>,
    pub description: Option<String>,
    pub output: Option<Value>,
}

impl StateSnapshot {
    pub fn capture(machine: &Machine, config: &Configuration, context: &BTreeMap<String, Value>, done: bool) -> Self {
        let leaves = config.leaves(machine);
        let mut leaf_paths: Vec<&str> = leaves.iter().map(|n| n.path.as_str()).collect();
        leaf_paths.sort_unstable();
        let current_state = leaf_paths.join("|");

        let mut meta = BTreeMap::new();
        let mut tags = BTreeSet::new();
        for path in config.iter() {
            let Some(node) = machine.find(path) else { continue };
            if !node.meta.is_empty() {
                meta.insert(path.as_str().to_string(), node.meta.clone());
            }
            tags.extend(node.tags.iter().cloned());
        }

        let description = leaves.iter().find_map(|n| n.description.clone());
        let output = done
            .then(|| {
                leaves.iter().find_map(|n| match &n.kind {
                    StateKind::Final { output } => output.clone(),
                    _ => None,
                })
            })
            .flatten();

        Self {
            status: if done { Status::Done } else { Status::Active },
            current_state,
            context: context.clone(),
            meta,
            tags,
            description,
            output,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Active
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
