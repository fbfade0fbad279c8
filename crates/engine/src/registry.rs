// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action / Guard / Service registry.
//!
//! Dynamic dispatch here is by string name, not trait objects over a
//! user-defined interface — see the spec's "dynamic dispatch" design note.
//! A `Registry` is built once at machine-construction time and shared
//! read-only across the actor's lifetime.

use harel_core::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub type ActionFn =
    Arc<dyn Fn(&mut BTreeMap<String, Value>, &str, &Value) -> Result<(), String> + Send + Sync>;

pub type GuardFn = Arc<dyn Fn(&BTreeMap<String, Value>, &Value) -> Result<bool, String> + Send + Sync>;

pub type ServiceFn = Arc<
    dyn Fn(BTreeMap<String, Value>, Value, CancellationToken) -> BoxFuture<Result<Value, String>>
        + Send
        + Sync,
>;

/// Holds every action/guard/service callback a machine may reference by name.
#[derive(Clone, Default)]
pub struct Registry {
    actions: HashMap<String, ActionFn>,
    guards: HashMap<String, GuardFn>,
    services: HashMap<String, ServiceFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&mut BTreeMap<String, Value>, &str, &Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.actions.insert(name.into(), Arc::new(f));
        self
    }

    pub fn guard(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&BTreeMap<String, Value>, &Value) -> Result<bool, String> + Send + Sync + 'static,
    ) -> Self {
        self.guards.insert(name.into(), Arc::new(f));
        self
    }

    pub fn service<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(BTreeMap<String, Value>, Value, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, String>> + Send + 'static,
    {
        self.services.insert(name.into(), Arc::new(move |ctx, data, tok| Box::pin(f(ctx, data, tok))));
        self
    }

    pub fn get_action(&self, name: &str) -> Option<&ActionFn> {
        self.actions.get(name)
    }

    pub fn get_guard(&self, name: &str) -> Option<&GuardFn> {
        self.guards.get(name)
    }

    pub fn get_service(&self, name: &str) -> Option<&ServiceFn> {
        self.services.get(name)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
