use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use volley_core::{parse_workspace_str, DocumentFormat, ParsedWorkspace, Validate};
use volley_exec::events::{CompositeEventSink, StdoutEventSink};
use volley_exec::{CancelHandle, EngineDeps, ReqwestHttpExecutor};

use crate::cmd::progress::ProgressEventSink;
use crate::exit_codes;
use crate::output::{print_error, OutputFormat};
use crate::{OutputArgs, RunArgs};

/// Read, parse and validate a workspace document, reporting problems the way `validate` does.
pub(crate) fn load_workspace(path: &Path, output: &OutputArgs) -> Result<ParsedWorkspace, i32> {
    let content = match std::fs::read_to_string(path) {
        Ok(v) => v,
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read {}: {e}", path.display()),
            );
            return Err(exit_codes::RUNTIME_ERROR);
        }
    };

    let parsed = match parse_workspace_str(&content, DocumentFormat::Auto) {
        Ok(p) => p,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            return Err(exit_codes::VALIDATION_FAILED);
        }
    };

    if let Err(err) = parsed.document.validate() {
        print_error(output.format, output.quiet, "workspace validation failed");
        if !output.quiet {
            for m in err.messages() {
                eprintln!("- {m}");
            }
        }
        return Err(exit_codes::VALIDATION_FAILED);
    }
    debug!(path = %path.display(), format = ?parsed.format, "workspace loaded");
    Ok(parsed)
}

/// Wire the engine to a real HTTP client plus the sinks the flags ask for.
pub(crate) fn engine_deps(
    parsed: &ParsedWorkspace,
    run: &RunArgs,
    output: &OutputArgs,
) -> Result<EngineDeps, i32> {
    let http = match ReqwestHttpExecutor::new(Duration::from_millis(run.timeout)) {
        Ok(h) => h,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            return Err(exit_codes::RUNTIME_ERROR);
        }
    };

    let mut sink = CompositeEventSink::new();
    if output.format == OutputFormat::Text && !output.quiet {
        sink.add(Box::new(ProgressEventSink::new()));
    }
    if run.events {
        sink.add(Box::new(StdoutEventSink));
    }

    Ok(EngineDeps::from_workspace(&parsed.document, Arc::new(http)).with_event_sink(Arc::new(sink)))
}

/// Cancel `handle` on the first Ctrl-C. The watcher dies with the runtime.
pub(crate) fn watch_ctrl_c(handle: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            handle.cancel();
        }
    });
}
