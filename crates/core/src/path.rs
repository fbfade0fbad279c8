// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical dotted state paths (`machineId.a.b.c`).
//!
//! Mirrors the string-id indirection the runtime uses everywhere else
//! (see [`crate::id`]): a path is cheap to clone, hash, and compare, and
//! never borrows from the `StateNode` tree it names.

use smol_str::SmolStr;
use std::fmt;

/// A canonical, dot-separated path identifying one node in a state tree.
///
/// The first segment is always the owning machine's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatePath(SmolStr);

impl StatePath {
    pub fn new(path: impl Into<SmolStr>) -> Self {
        Self(path.into())
    }

    pub fn root(machine_id: &str) -> Self {
        Self(SmolStr::new(machine_id))
    }

    pub fn child(&self, segment: &str) -> Self {
        Self(SmolStr::new(format!("{}.{}", self.0, segment)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// The machine id owning this path (the first segment).
    pub fn machine_id(&self) -> &str {
        self.segments().next().unwrap_or_default()
    }

    /// The final path segment (the node's own name).
    pub fn leaf(&self) -> &str {
        self.segments().last().unwrap_or_default()
    }

    /// The parent path, or `None` if this path has a single segment.
    pub fn parent(&self) -> Option<StatePath> {
        let s = self.0.as_str();
        s.rfind('.').map(|idx| StatePath(SmolStr::new(&s[..idx])))
    }

    /// True if `other` is this path or a descendant of it.
    pub fn contains(&self, other: &StatePath) -> bool {
        let mine = self.0.as_str();
        let theirs = other.0.as_str();
        theirs == mine || theirs.strip_prefix(mine).is_some_and(|rest| rest.starts_with('.'))
    }

    /// Depth in segments (a root path has depth 1).
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The least common compound ancestor of two paths, i.e. the longest
    /// shared path prefix. Always at least the shared machine root.
    pub fn least_common_ancestor(&self, other: &StatePath) -> StatePath {
        let mine: Vec<&str> = self.segments().collect();
        let theirs: Vec<&str> = other.segments().collect();
        let mut shared = Vec::new();
        for (a, b) in mine.iter().zip(theirs.iter()) {
            if a == b {
                shared.push(*a);
            } else {
                break;
            }
        }
        StatePath::new(shared.join("."))
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<&str> for StatePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StatePath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
