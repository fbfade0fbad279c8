// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spec Loader error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("invalid machine JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate state name {name:?} under parent {parent}")]
    DuplicateStateName { parent: String, name: String },

    #[error("transition target {target:?} at {source} does not resolve to any known state")]
    UnknownTarget { source: String, target: String },

    #[error("final state {path} may not declare `initial` or child states")]
    FinalStateHasChildren { path: String },

    #[error("parallel state {path} may not declare `initial`")]
    ParallelStateHasInitial { path: String },

    #[error("history state {path} has no usable fallback target")]
    HistoryWithoutFallback { path: String },

    #[error("compound state {path} declares `initial` {initial:?} which is not one of its children")]
    UnknownInitialChild { path: String, initial: String },

    #[error("compound state {path} has children but no `initial`")]
    MissingInitial { path: String },

    #[error("state {path} has unrecognized `type` {kind:?}")]
    UnknownStateKind { path: String, kind: String },
}
