// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The normalized, validated in-memory representation of a machine
//! definition — what the Spec Loader produces and everything downstream
//! consumes.

use harel_core::{StatePath, Value};
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// A fully loaded, validated machine definition.
#[derive(Debug, Clone)]
pub struct Machine {
    pub id: String,
    pub root: StateNode,
    pub context: BTreeMap<String, Value>,
}

impl Machine {
    /// Look up a state node by its canonical path.
    pub fn find(&self, path: &StatePath) -> Option<&StateNode> {
        if path.as_str() == self.root.path.as_str() {
            return Some(&self.root);
        }
        self.root.find(path)
    }
}

#[derive(Debug, Clone)]
pub struct StateNode {
    pub path: StatePath,
    pub name: String,
    pub kind: StateKind,
    pub entry: Vec<ActionRef>,
    pub exit: Vec<ActionRef>,
    pub on: IndexMap<String, Vec<TransitionDef>>,
    pub always: Vec<TransitionDef>,
    /// Ordered by (delay, declaration order) ascending, per the shortest-delay-wins rule.
    pub after: Vec<(u64, TransitionDef)>,
    pub invoke: Option<InvokeDef>,
    pub meta: BTreeMap<String, Value>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub output: Option<Value>,
}

impl StateNode {
    pub fn find(&self, path: &StatePath) -> Option<&StateNode> {
        if self.path.as_str() == path.as_str() {
            return Some(self);
        }
        for child in self.children() {
            if path.contains(&child.path) || child.path.as_str() == path.as_str() {
                if let Some(found) = child.find(path) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn children(&self) -> &[StateNode] {
        match &self.kind {
            StateKind::Compound { children, .. } => children,
            StateKind::Parallel { regions } => regions,
            _ => &[],
        }
    }

    pub fn is_atomic_leaf(&self) -> bool {
        matches!(self.kind, StateKind::Atomic | StateKind::Final { .. })
    }
}

#[derive(Debug, Clone)]
pub enum StateKind {
    Atomic,
    Compound { initial: String, children: Vec<StateNode> },
    Parallel { regions: Vec<StateNode> },
    Final { output: Option<Value> },
    History { depth: HistoryDepth, fallback: Vec<StatePath> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDepth {
    Shallow,
    Deep,
}

/// One candidate transition attached to a state's `on`/`always`/`after`/`onDone` table.
#[derive(Debug, Clone)]
pub struct TransitionDef {
    /// The event name that triggers this transition. Synthetic for
    /// `always`/`after`/`invoke` — see [`crate::SyntheticEvent`].
    pub event: String,
    pub source: StatePath,
    pub targets: Vec<StatePath>,
    pub cond: Option<String>,
    pub actions: Vec<ActionRef>,
    pub internal: bool,
}

impl TransitionDef {
    /// A transition with no targets is a "self-loop" (actions-only, no state change).
    pub fn is_targetless(&self) -> bool {
        self.targets.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct InvokeDef {
    pub id: String,
    pub src: String,
    pub on_done: Option<TransitionDef>,
    pub on_error: Option<TransitionDef>,
}

/// One entry in an `entry`/`exit`/transition action list.
#[derive(Debug, Clone)]
pub enum ActionRef {
    /// A name resolved against the action registry at execution time.
    Named(String),
    Assign(BTreeMap<String, AssignValue>),
    Raise { event: String },
    Send { event: String, to: Option<String>, data: BTreeMap<String, AssignValue> },
    Spawn { src: String, id: Option<String> },
    Stop { id: String },
}

/// The right-hand side of an `assign`/`send.data` entry: either a literal
/// or a reference resolved against the triggering event or current context.
#[derive(Debug, Clone)]
pub enum AssignValue {
    Literal(Value),
    EventField(String),
    ContextField(String),
}
