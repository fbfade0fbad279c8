// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Public entry point for loading a machine definition.

use crate::error::SpecError;
use crate::model::Machine;
use crate::normalize::normalize;
use crate::raw::RawMachine;

/// Parse and validate a machine definition from its JSON text.
pub fn load(json: &str) -> Result<Machine, SpecError> {
    let raw: RawMachine = serde_json::from_str(json)?;
    tracing::debug!(machine_id = %raw.id, "loaded raw machine definition");
    let machine = normalize(raw)?;
    tracing::info!(machine_id = %machine.id, "machine definition validated");
    Ok(machine)
}

/// As [`load`], but from an already-deserialized [`serde_json::Value`].
pub fn load_value(value: serde_json::Value) -> Result<Machine, SpecError> {
    let raw: RawMachine = serde_json::from_value(value)?;
    normalize(raw)
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
