// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::exit_error::ExitError;
use harel_core::{SystemClock, Value};
use harel_engine::{Registry, RunnerConfig};
use serde::Deserialize;
use std::path::Path;

/// One entry of a `--script` file fed to a running machine.
#[derive(Debug, Deserialize)]
struct ScriptEvent {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Loads `path`, starts it, feeds every event in `script` (in order), and
/// prints one [`harel_engine::StateSnapshot`] as JSON per macrostep.
pub async fn run(path: &Path, script: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(path)
        .map_err(|err| ExitError::new(1, format!("reading {}: {err}", path.display())))?;
    let machine = harel_spec::load(&json).map_err(|err| ExitError::new(1, format!("{err}")))?;

    let script_json = std::fs::read_to_string(script)
        .map_err(|err| ExitError::new(1, format!("reading {}: {err}", script.display())))?;
    let events: Vec<ScriptEvent> = serde_json::from_str(&script_json)
        .map_err(|err| ExitError::new(1, format!("invalid script: {err}")))?;

    let (handle, join) = harel_engine::spawn(machine, Registry::new(), SystemClock, RunnerConfig::default());

    let snapshot = handle.ask().await.map_err(|err| ExitError::new(1, err.to_string()))?;
    println!("{}", serde_json::to_string(&snapshot)?);

    for item in events {
        let data = Value::from(item.data);
        match handle.send_and_wait(item.event, data).await {
            Ok(_) => {
                let snapshot = handle.ask().await.map_err(|err| ExitError::new(1, err.to_string()))?;
                println!("{}", serde_json::to_string(&snapshot)?);
            }
            Err(err) => {
                tracing::warn!(error = %err, "event rejected");
            }
        }
    }

    handle.stop().await;
    join.await.ok();
    Ok(())
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
