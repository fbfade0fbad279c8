// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `harel`: validates, inspects, and scripts statechart definitions against
//! the execution engine without embedding it in a host program.

mod commands;
mod exit_error;

use clap::{Parser, Subcommand};
use exit_error::ExitError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "harel", version, about = "Run and inspect harel statechart definitions")]
struct Cli {
    /// Increase log verbosity (-v, -vv); overridden by RUST_LOG if set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate a machine definition.
    Validate { file: PathBuf },
    /// Run a machine against a scripted event feed, printing one snapshot per macrostep.
    Run {
        file: PathBuf,
        #[arg(long)]
        script: PathBuf,
    },
    /// Print the normalized state tree for debugging.
    Inspect { file: PathBuf },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Validate { file } => commands::validate::run(&file),
        Command::Run { file, script } => commands::run::run(&file, &script).await,
        Command::Inspect { file } => commands::inspect::run(&file),
    };

    if let Err(err) = result {
        let code = err.downcast_ref::<ExitError>().map(|e| e.code).unwrap_or(1);
        eprintln!("error: {err:#}");
        std::process::exit(code);
    }
}

fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
