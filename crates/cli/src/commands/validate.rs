// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::exit_error::ExitError;
use std::path::Path;

/// Loads and normalizes the machine definition at `path`, printing
/// `SpecError` diagnostics and failing the process on any problem.
pub fn run(path: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(path)
        .map_err(|err| ExitError::new(1, format!("reading {}: {err}", path.display())))?;

    match harel_spec::load(&json) {
        Ok(machine) => {
            println!("{} is valid ({} root children)", machine.id, machine.root.children().len());
            Ok(())
        }
        Err(err) => Err(ExitError::new(1, format!("{} is invalid: {err}", path.display())).into()),
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
