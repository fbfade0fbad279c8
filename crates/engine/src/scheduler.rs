// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer Scheduler: arms and fires `after` delays against an injected
//! [`Clock`], so timer behavior is deterministic under `FakeClock` in tests.

use harel_core::StatePath;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// A single armed timer.
#[derive(Debug, Clone)]
struct ArmedTimer {
    deadline: Instant,
    /// Tie-break for simultaneous deadlines: lower sequence fired first.
    sequence: u64,
    id: String,
    source: StatePath,
}

impl PartialEq for ArmedTimer {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.sequence == other.sequence
    }
}
impl Eq for ArmedTimer {}

impl PartialOrd for ArmedTimer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArmedTimer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest deadline first.
        other.deadline.cmp(&self.deadline).then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// One fired timer, ready to be delivered to the owning machine's mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTimer {
    pub id: String,
    pub source: StatePath,
}

/// Arms and fires `after` timers for one machine.
///
/// Cancellation on state exit is race-free: `fired_timers` only returns
/// timers whose id is still present in `armed` at the moment of polling, so
/// a timer cancelled between arming and firing is silently dropped.
#[derive(Debug, Default)]
pub struct Scheduler {
    heap: BinaryHeap<ArmedTimer>,
    next_sequence: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_timer(&mut self, id: String, source: StatePath, delay: Duration, now: Instant) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(ArmedTimer { deadline: now + delay, sequence, id, source });
    }

    pub fn cancel_timer(&mut self, id: &str) {
        self.heap.retain(|t| t.id != id);
    }

    /// Cancel every timer armed from `source` or one of its descendants.
    pub fn cancel_from(&mut self, source: &StatePath) {
        self.heap.retain(|t| !source.contains(&t.source));
    }

    pub fn has_timers(&self) -> bool {
        !self.heap.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|t| t.deadline)
    }

    /// Pop every timer whose deadline has passed, shortest-delay-first
    /// (ties broken by declaration order).
    pub fn fired_timers(&mut self, now: Instant) -> Vec<FiredTimer> {
        let mut fired = Vec::new();
        while let Some(top) = self.heap.peek() {
            if top.deadline > now {
                break;
            }
            let timer = self.heap.pop().expect("peeked Some");
            fired.push(FiredTimer { id: timer.id, source: timer.source });
        }
        fired
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
