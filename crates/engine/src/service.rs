// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service Runner: launches `invoke` services as cancellable tasks and
//! turns their outcome into the synthetic `invoke.done:<id>` /
//! `invoke.error:<id>` events the Execution Engine feeds back through the
//! normal transition pipeline.

use crate::registry::Registry;
use harel_core::Value;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A synthetic event raised by a completed or failed service invocation.
#[derive(Debug, Clone)]
pub struct ServiceOutcome {
    pub invoke_id: String,
    pub event: String,
    pub data: Value,
}

/// Spawns one invoked service as a background task bound to `token`.
///
/// If `token` is cancelled before the service future resolves, the task is
/// dropped without ever sending on `outcomes` — this is the "no outcome on
/// cancellation" half of the exactly-one-of-done/error/cancellation
/// invariant; the other half (never invoking a callback after cancellation)
/// falls out of `tokio::select!` biasing the cancellation branch first.
pub fn spawn(
    src: String,
    invoke_id: String,
    context: BTreeMap<String, Value>,
    input: Value,
    registry: &Registry,
    token: CancellationToken,
    outcomes: mpsc::Sender<ServiceOutcome>,
) {
    let Some(service) = registry.get_service(&src).cloned() else {
        tracing::warn!(service = %src, invoke_id = %invoke_id, "no service registered under this name");
        let _ = outcomes.try_send(ServiceOutcome {
            event: format!("invoke.error:{invoke_id}"),
            data: Value::String(format!("unknown service {src:?}")),
            invoke_id,
        });
        return;
    };

    tokio::spawn(async move {
        tracing::debug!(service = %src, invoke_id = %invoke_id, "service started");
        let fut = service(context, input, token.clone());
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(service = %src, invoke_id = %invoke_id, "service cancelled before completion");
            }
            result = fut => {
                let outcome = match result {
                    Ok(value) => {
                        tracing::debug!(service = %src, invoke_id = %invoke_id, "service completed");
                        ServiceOutcome { event: format!("invoke.done:{invoke_id}"), data: value, invoke_id: invoke_id.clone() }
                    }
                    Err(message) => {
                        tracing::warn!(service = %src, invoke_id = %invoke_id, error = %message, "service failed");
                        ServiceOutcome { event: format!("invoke.error:{invoke_id}"), data: Value::String(message), invoke_id: invoke_id.clone() }
                    }
                };
                if outcomes.send(outcome).await.is_err() {
                    tracing::debug!(invoke_id = %invoke_id, "owning actor gone, dropping service outcome");
                }
            }
        }
    });
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
