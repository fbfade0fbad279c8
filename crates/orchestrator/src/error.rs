// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("machine {0:?} is already registered")]
    AlreadyRegistered(String),

    #[error("no machine registered under id {0:?}")]
    UnknownTarget(String),

    #[error("mailbox for {machine} is full")]
    QueueFull { machine: String },

    #[error(transparent)]
    Runtime(#[from] harel_engine::RuntimeError),
}
