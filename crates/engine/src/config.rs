// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-level runtime configuration: not file-persisted, since this
//! runtime has no daemon to restart — supplied by the embedding program or
//! CLI flags at construction time.

/// How a machine actor (or the orchestrator routing to it) treats an event
/// with no matching transition handler anywhere in the active configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingMode {
    /// Unhandled routed events surface `RuntimeError::UnknownEvent` to the sender.
    #[default]
    Strict,
    /// Unhandled routed events are silently dropped.
    BestEffort,
}

/// What happens when a mailbox is full and a new message arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// The new message is rejected; the sender observes `QueueFull`.
    #[default]
    Reject,
    /// The oldest queued message is dropped to make room.
    DropOldest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    pub routing_mode: RoutingMode,
    pub overflow_policy: OverflowPolicy,
    pub mailbox_capacity: usize,
    pub max_microsteps: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            routing_mode: RoutingMode::default(),
            overflow_policy: OverflowPolicy::default(),
            mailbox_capacity: 256,
            max_microsteps: 10_000,
        }
    }
}
