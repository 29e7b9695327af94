use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse and validate a workspace document.
    Validate {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show the execution order and levels of a flow.
    Plan {
        path: PathBuf,
        #[arg(long)]
        flow: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Execute one flow end to end.
    RunFlow {
        path: PathBuf,
        #[arg(long)]
        flow: String,
        /// Run variable, highest precedence after test case overrides. Repeatable.
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Execute a test suite and report per-item results.
    RunSuite {
        path: PathBuf,
        #[arg(long)]
        suite: String,
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Send every request of a collection once.
    RunCollection {
        path: PathBuf,
        #[arg(long)]
        collection: String,
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}
