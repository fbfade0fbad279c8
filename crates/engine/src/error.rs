// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution-time error taxonomy.
//!
//! Most variants here are *recoverable*: the engine logs them and keeps the
//! machine running (see the ERROR HANDLING DESIGN section of the spec).
//! The fatal variants terminate the owning actor.

use harel_core::StatePath;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A guard callback raised an error; treated as `false`.
    #[error("guard {guard:?} at {source} failed: {message}")]
    GuardError { guard: String, source: String, message: String },

    /// An action callback raised an error mid-macrostep.
    #[error("action {action:?} at {source} failed: {message}")]
    ActionError { action: String, source: String, message: String },

    /// An invoked service failed; delivered as `invoke.error`, never fatal
    /// by itself.
    #[error("service {service:?} at {source} failed: {message}")]
    ServiceError { service: String, source: String, message: String },

    #[error("event {event:?} has no handler on machine {machine} (strict routing)")]
    UnknownEvent { machine: String, event: String },

    #[error("mailbox for {machine} is full")]
    QueueFull { machine: String },

    #[error(
        "transition from {source} names targets that cannot be reconciled into one configuration"
    )]
    ConflictingTargets { source: String },

    #[error("self-send: an action cannot synchronously send to its own machine ({machine})")]
    ReentrantSend { machine: String },

    #[error("microstep budget ({budget}) exceeded processing event {event:?} on {machine}; likely an always/raise cycle")]
    MicrostepBudgetExceeded { machine: String, event: String, budget: usize },

    #[error("entry actions of the initial state of {machine} failed: {message}")]
    InitialEntryFailed { machine: String, message: String },

    #[error("history memory for {path} is missing or inconsistent with the current tree")]
    CorruptHistory { path: StatePath },

    #[error("no action named {0:?} is registered")]
    UnknownAction(String),

    #[error("no guard named {0:?} is registered")]
    UnknownGuard(String),

    #[error("no service named {0:?} is registered")]
    UnknownService(String),

    #[error("machine {0} is already done; external events are ignored")]
    MachineDone(String),
}

impl RuntimeError {
    /// Fatal errors terminate the owning actor; everything else is logged
    /// and the machine keeps running.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RuntimeError::MicrostepBudgetExceeded { .. } | RuntimeError::InitialEntryFailed { .. } | RuntimeError::CorruptHistory { .. }
        )
    }
}
