use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "volley", version, about = "Run REST request flows, collections and test suites")]
struct Cli {
    /// Log filter, e.g. `debug` or `volley_exec=trace`. Falls back to RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("volley=info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Validate { path, output } => cmd::validate::validate_cmd(&path, output).await,
        Command::Plan { path, flow, output } => cmd::plan::plan_cmd(&path, &flow, output).await,
        Command::RunFlow {
            path,
            flow,
            vars,
            run,
            output,
        } => cmd::run_flow::run_flow_cmd(&path, &flow, &vars, run, output).await,
        Command::RunSuite {
            path,
            suite,
            run,
            output,
        } => cmd::run_suite::run_suite_cmd(&path, &suite, run, output).await,
        Command::RunCollection {
            path,
            collection,
            run,
            output,
        } => cmd::run_collection::run_collection_cmd(&path, &collection, run, output).await,
    }
}
