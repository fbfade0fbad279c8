// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns a deserialized [`RawMachine`] into a validated [`Machine`].
//!
//! Two passes over the raw tree: [`collect_paths`] assigns every state its
//! canonical path and records it in a lookup set (so forward- and
//! sideways-references resolve regardless of declaration order), then
//! [`build_node`] rebuilds the tree with every transition target resolved
//! against that set.

use crate::error::SpecError;
use crate::model::{
    ActionRef, AssignValue, HistoryDepth, InvokeDef, Machine, StateKind, StateNode, TransitionDef,
};
use crate::raw::{
    OneOrMany, RawActionItem, RawInlineAction, RawInvoke, RawMachine, RawState, RawTemplate,
    RawTransition, RawTransitionValue,
};
use harel_core::{StatePath, Value};
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashSet};

pub fn normalize(raw: RawMachine) -> Result<Machine, SpecError> {
    let root_path = StatePath::root(&raw.id);
    let mut valid = HashSet::new();
    collect_paths(&raw.root, &root_path, &mut valid);

    let root = build_node("".to_string(), raw.root, root_path.clone(), &root_path, &valid)?;

    Ok(Machine {
        id: raw.id,
        root,
        context: raw.context.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
    })
}

fn collect_paths(raw: &RawState, path: &StatePath, valid: &mut HashSet<StatePath>) {
    valid.insert(path.clone());
    for (name, child) in &raw.states {
        collect_paths(child, &path.child(name), valid);
    }
}

fn build_node(
    name: String,
    raw: RawState,
    path: StatePath,
    machine_root: &StatePath,
    valid: &HashSet<StatePath>,
) -> Result<StateNode, SpecError> {
    let kind_str = raw.kind.as_deref();
    let has_children = !raw.states.is_empty();

    let kind = match kind_str {
        Some("final") => {
            if has_children || raw.initial.is_some() {
                return Err(SpecError::FinalStateHasChildren { path: path.to_string() });
            }
            StateKind::Final { output: raw.output.clone().map(Value::from) }
        }
        Some("parallel") => {
            if raw.initial.is_some() {
                return Err(SpecError::ParallelStateHasInitial { path: path.to_string() });
            }
            let mut regions = Vec::with_capacity(raw.states.len());
            let mut seen = HashSet::new();
            for (child_name, child_raw) in raw.states.clone() {
                if !seen.insert(child_name.clone()) {
                    return Err(SpecError::DuplicateStateName {
                        parent: path.to_string(),
                        name: child_name,
                    });
                }
                let child_path = path.child(&child_name);
                regions.push(build_node(child_name, child_raw, child_path, machine_root, valid)?);
            }
            StateKind::Parallel { regions }
        }
        Some("history") => {
            let depth = match raw.history.as_deref() {
                Some("deep") => HistoryDepth::Deep,
                _ => HistoryDepth::Shallow,
            };
            let fallback_raw = raw.target.clone().map(OneOrMany::into_vec).unwrap_or_default();
            let mut fallback = Vec::with_capacity(fallback_raw.len());
            for t in fallback_raw {
                fallback.push(resolve_path(&t, &path, machine_root, valid)?);
            }
            if fallback.is_empty() {
                return Err(SpecError::HistoryWithoutFallback { path: path.to_string() });
            }
            StateKind::History { depth, fallback }
        }
        Some(other) if other != "compound" && other != "atomic" => {
            return Err(SpecError::UnknownStateKind {
                path: path.to_string(),
                kind: other.to_string(),
            });
        }
        _ => {
            if has_children {
                let initial = raw
                    .initial
                    .clone()
                    .ok_or_else(|| SpecError::MissingInitial { path: path.to_string() })?;
                if !raw.states.contains_key(&initial) {
                    return Err(SpecError::UnknownInitialChild {
                        path: path.to_string(),
                        initial: initial.clone(),
                    });
                }
                let mut children = Vec::with_capacity(raw.states.len());
                let mut seen = HashSet::new();
                for (child_name, child_raw) in raw.states.clone() {
                    if !seen.insert(child_name.clone()) {
                        return Err(SpecError::DuplicateStateName {
                            parent: path.to_string(),
                            name: child_name,
                        });
                    }
                    let child_path = path.child(&child_name);
                    children.push(build_node(
                        child_name,
                        child_raw,
                        child_path,
                        machine_root,
                        valid,
                    )?);
                }
                StateKind::Compound { initial, children }
            } else {
                StateKind::Atomic
            }
        }
    };

    let mut on = build_on_table(&raw.on, &path, machine_root, valid)?;
    if let Some(on_done_raw) = raw.on_done {
        let event = format!("done.state.{path}");
        let def = build_transition(event.clone(), on_done_raw, &path, machine_root, valid)?;
        on.entry(event).or_default().push(def);
    }
    let always = build_transition_list("".into(), raw.always, &path, machine_root, valid)?;
    let after = build_after_table(raw.after, &path, machine_root, valid)?;
    let invoke = build_invoke(raw.invoke, &path, machine_root, valid)?;
    let entry = build_actions(raw.entry.into_vec())?;
    let exit = build_actions(raw.exit.into_vec())?;

    Ok(StateNode {
        path,
        name,
        kind,
        entry,
        exit,
        on,
        always,
        after,
        invoke,
        meta: raw.meta.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
        tags: raw.tags,
        description: raw.description,
        output: raw.output.map(Value::from),
    })
}

fn build_on_table(
    raw: &IndexMap<String, OneOrMany<RawTransitionValue>>,
    source: &StatePath,
    machine_root: &StatePath,
    valid: &HashSet<StatePath>,
) -> Result<IndexMap<String, Vec<TransitionDef>>, SpecError> {
    let mut out = IndexMap::with_capacity(raw.len());
    for (event, values) in raw.clone() {
        let list = build_transition_list(event.clone(), values, source, machine_root, valid)?;
        out.insert(event, list);
    }
    Ok(out)
}

fn build_after_table(
    raw: BTreeMap<String, OneOrMany<RawTransitionValue>>,
    source: &StatePath,
    machine_root: &StatePath,
    valid: &HashSet<StatePath>,
) -> Result<Vec<(u64, TransitionDef)>, SpecError> {
    let mut out = Vec::with_capacity(raw.len());
    for (ms_str, values) in raw {
        let ms: u64 = ms_str.parse().unwrap_or(0);
        let event = format!("after({ms},{source})");
        let list = build_transition_list(event, values, source, machine_root, valid)?;
        for def in list {
            out.push((ms, def));
        }
    }
    // Shortest delay wins; declaration order preserved as the tie-break
    // because sort is stable.
    out.sort_by_key(|(ms, _)| *ms);
    Ok(out)
}

fn build_transition_list(
    event: String,
    raw: OneOrMany<RawTransitionValue>,
    source: &StatePath,
    machine_root: &StatePath,
    valid: &HashSet<StatePath>,
) -> Result<Vec<TransitionDef>, SpecError> {
    let mut out = Vec::new();
    for value in raw.into_vec() {
        out.push(build_transition(event.clone(), value, source, machine_root, valid)?);
    }
    Ok(out)
}

fn build_transition(
    event: String,
    raw: RawTransitionValue,
    source: &StatePath,
    machine_root: &StatePath,
    valid: &HashSet<StatePath>,
) -> Result<TransitionDef, SpecError> {
    let (targets_raw, cond, actions_raw, internal) = match raw {
        RawTransitionValue::Bare(t) => (vec![t], None, Vec::new(), false),
        RawTransitionValue::Full(RawTransition { target, cond, actions, internal }) => {
            (target.map(OneOrMany::into_vec).unwrap_or_default(), cond, actions.into_vec(), internal)
        }
    };

    let mut targets = Vec::with_capacity(targets_raw.len());
    for t in targets_raw {
        targets.push(resolve_path(&t, source, machine_root, valid)?);
    }

    Ok(TransitionDef {
        event,
        source: source.clone(),
        targets,
        cond,
        actions: build_actions(actions_raw)?,
        internal,
    })
}

fn build_invoke(
    raw: Option<RawInvoke>,
    source: &StatePath,
    machine_root: &StatePath,
    valid: &HashSet<StatePath>,
) -> Result<Option<InvokeDef>, SpecError> {
    let Some(raw) = raw else { return Ok(None) };
    let id = raw.id.clone().unwrap_or_else(|| raw.src.clone());
    let on_done = raw
        .on_done
        .map(|v| build_transition(format!("invoke.done:{id}"), v, source, machine_root, valid))
        .transpose()?;
    let on_error = raw
        .on_error
        .map(|v| build_transition(format!("invoke.error:{id}"), v, source, machine_root, valid))
        .transpose()?;
    Ok(Some(InvokeDef { id, src: raw.src, on_done, on_error }))
}

/// Resolves the three path syntaxes described in the machine-definition
/// schema: `#mid.a.b` (absolute), `.child` (relative to the declaring
/// node), and `name` (sibling, relative to the declaring node's parent).
fn resolve_path(
    raw: &str,
    source: &StatePath,
    machine_root: &StatePath,
    valid: &HashSet<StatePath>,
) -> Result<StatePath, SpecError> {
    let resolved = if let Some(rest) = raw.strip_prefix('#') {
        StatePath::new(rest.to_string())
    } else if let Some(rest) = raw.strip_prefix('.') {
        StatePath::new(format!("{source}.{rest}"))
    } else {
        let base = source.parent().unwrap_or_else(|| machine_root.clone());
        base.child(raw)
    };

    if valid.contains(&resolved) {
        Ok(resolved)
    } else {
        Err(SpecError::UnknownTarget { source: source.to_string(), target: raw.to_string() })
    }
}

fn build_actions(raw: Vec<RawActionItem>) -> Result<Vec<ActionRef>, SpecError> {
    raw.into_iter().map(build_action).collect()
}

fn build_action(raw: RawActionItem) -> Result<ActionRef, SpecError> {
    Ok(match raw {
        RawActionItem::Named(name) => ActionRef::Named(name),
        RawActionItem::Inline(RawInlineAction::Assign { assign }) => {
            ActionRef::Assign(build_template_map(assign))
        }
        RawActionItem::Inline(RawInlineAction::Raise { event }) => ActionRef::Raise { event },
        RawActionItem::Inline(RawInlineAction::Send { event, to, data }) => {
            ActionRef::Send { event, to, data: build_template_map(data) }
        }
        RawActionItem::Inline(RawInlineAction::Spawn { src, id }) => ActionRef::Spawn { src, id },
        RawActionItem::Inline(RawInlineAction::Stop { id }) => ActionRef::Stop { id },
    })
}

fn build_template_map(raw: BTreeMap<String, RawTemplate>) -> BTreeMap<String, AssignValue> {
    raw.into_iter().map(|(k, v)| (k, build_template(v))).collect()
}

/// A string value of the form `$event.field` or `$context.field` is a
/// reference; everything else (including plain strings) is a literal.
fn build_template(raw: RawTemplate) -> AssignValue {
    let RawTemplate::Value(v) = raw;
    if let serde_json::Value::String(s) = &v {
        if let Some(field) = s.strip_prefix("$event.") {
            return AssignValue::EventField(field.to_string());
        }
        if let Some(field) = s.strip_prefix("$context.") {
            return AssignValue::ContextField(field.to_string());
        }
    }
    AssignValue::Literal(Value::from(v))
}
