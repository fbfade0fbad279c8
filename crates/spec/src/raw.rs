// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The wire-format JSON schema, deserialized as-is before normalization.
//!
//! Kept deliberately permissive (many optional fields, several `OneOrMany`
//! shorthands) to mirror the ergonomic JSON authors actually write; strict
//! validation happens in [`crate::normalize`], not here.

use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct RawMachine {
    pub id: String,
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
    #[serde(flatten)]
    pub root: RawState,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawState {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub initial: Option<String>,
    #[serde(default)]
    pub states: IndexMap<String, RawState>,
    #[serde(default)]
    pub on: IndexMap<String, OneOrMany<RawTransitionValue>>,
    #[serde(default)]
    pub always: OneOrMany<RawTransitionValue>,
    #[serde(default)]
    pub after: BTreeMap<String, OneOrMany<RawTransitionValue>>,
    pub invoke: Option<RawInvoke>,
    #[serde(default)]
    pub entry: OneOrMany<RawActionItem>,
    #[serde(default)]
    pub exit: OneOrMany<RawActionItem>,
    #[serde(rename = "onDone")]
    pub on_done: Option<RawTransitionValue>,
    #[serde(default)]
    pub meta: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub output: Option<serde_json::Value>,
    /// Only meaningful when `type = "history"`.
    pub history: Option<String>,
    pub target: Option<OneOrMany<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawInvoke {
    #[serde(default)]
    pub id: Option<String>,
    pub src: String,
    #[serde(rename = "onDone")]
    pub on_done: Option<RawTransitionValue>,
    #[serde(rename = "onError")]
    pub on_error: Option<RawTransitionValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTransitionValue {
    Bare(String),
    Full(RawTransition),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTransition {
    pub target: Option<OneOrMany<String>>,
    pub cond: Option<String>,
    #[serde(default)]
    pub actions: OneOrMany<RawActionItem>,
    #[serde(default)]
    pub internal: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawActionItem {
    Named(String),
    Inline(RawInlineAction),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum RawInlineAction {
    #[serde(rename = "assign")]
    Assign { assign: BTreeMap<String, RawTemplate> },
    #[serde(rename = "raise")]
    Raise { event: String },
    #[serde(rename = "send")]
    Send {
        event: String,
        to: Option<String>,
        #[serde(default)]
        data: BTreeMap<String, RawTemplate>,
    },
    #[serde(rename = "spawn")]
    Spawn { src: String, id: Option<String> },
    #[serde(rename = "stop")]
    Stop { id: String },
}

/// An `assign`/`send.data` right-hand side: a literal JSON value, or a
/// `"$event.field"` / `"$context.field"` reference string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTemplate {
    Value(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    None,
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::None
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::None => Vec::new(),
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}
