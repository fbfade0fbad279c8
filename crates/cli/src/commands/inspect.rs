// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::exit_error::ExitError;
use harel_spec::{StateKind, StateNode};
use std::path::Path;

/// Prints the normalized state tree — paths, kinds, and transition tables —
/// for debugging a machine definition without running it.
pub fn run(path: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(path)
        .map_err(|err| ExitError::new(1, format!("reading {}: {err}", path.display())))?;
    let machine = harel_spec::load(&json).map_err(|err| ExitError::new(1, format!("{err}")))?;

    println!("machine {}", machine.id);
    print_node(&machine.root, 0);
    Ok(())
}

fn print_node(node: &StateNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let kind = match &node.kind {
        StateKind::Atomic => "atomic".to_string(),
        StateKind::Compound { initial, .. } => format!("compound (initial: {initial})"),
        StateKind::Parallel { .. } => "parallel".to_string(),
        StateKind::Final { .. } => "final".to_string(),
        StateKind::History { depth, .. } => format!("history ({depth:?})"),
    };
    println!("{indent}{} [{kind}]", node.path);

    for (event, transitions) in &node.on {
        for t in transitions {
            let targets = if t.targets.is_empty() { "(none)".to_string() } else { t.targets.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ") };
            let guard = t.cond.as_deref().map(|c| format!(" [cond={c}]")).unwrap_or_default();
            println!("{indent}  on {event:?} -> {targets}{guard}");
        }
    }
    for t in &node.always {
        let targets = t.targets.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
        let guard = t.cond.as_deref().map(|c| format!(" [cond={c}]")).unwrap_or_default();
        println!("{indent}  always -> {targets}{guard}");
    }
    for (ms, t) in &node.after {
        let targets = t.targets.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
        println!("{indent}  after {ms}ms -> {targets}");
    }
    if let Some(invoke) = &node.invoke {
        println!("{indent}  invoke {} (id={})", invoke.src, invoke.id);
    }

    for child in node.children() {
        print_node(child, depth + 1);
    }
}

#[cfg(test)]
#[path = "inspect_tests.rs"]
mod tests;
