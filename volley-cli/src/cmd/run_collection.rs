use std::path::Path;

use serde::Serialize;
use volley_core::types::{ExecutionConfig, SuiteRunStatus};
use volley_exec::{CollectionRunOptions, CollectionRunner};

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{OutputArgs, RunArgs};

#[derive(Serialize)]
struct RunCollectionSummary {
    run_id: String,
    collection_id: String,
    status: String,
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
    average_time_ms: f64,
}

pub async fn run_collection_cmd(
    path: &Path,
    collection_id: &str,
    run: RunArgs,
    output: OutputArgs,
) -> i32 {
    let parsed = match super::load_workspace(path, &output) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let Some(collection) = parsed.document.collections.iter().find(|c| c.id == collection_id)
    else {
        print_error(
            output.format,
            output.quiet,
            &format!("collection '{collection_id}' not found"),
        );
        return exit_codes::VALIDATION_FAILED;
    };

    let environment = match run.env.as_deref() {
        None => None,
        Some(id) => match parsed.document.environments.iter().find(|e| e.id == id) {
            Some(env) => Some(env.clone()),
            None => {
                print_error(output.format, output.quiet, &format!("environment '{id}' not found"));
                return exit_codes::VALIDATION_FAILED;
            }
        },
    };
    let options = CollectionRunOptions {
        environment,
        auth_id: run.auth.clone(),
    };

    let mut config = ExecutionConfig::default();
    run.apply_to(&mut config);

    let deps = match super::engine_deps(&parsed, &run, &output) {
        Ok(d) => d,
        Err(code) => return code,
    };
    let runner = match CollectionRunner::new(deps, config) {
        Ok(r) => r,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };
    super::watch_ctrl_c(runner.cancel_handle());

    let result = match runner.run(&collection.requests, &options).await {
        Ok(r) => r,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };

    match output.format {
        OutputFormat::Json => print_result(output.format, output.quiet, &result),
        OutputFormat::Text | OutputFormat::Dot => {
            if !output.quiet {
                for r in collection.requests.iter().filter_map(|r| result.results.get(&r.id)) {
                    let http = r
                        .response
                        .as_ref()
                        .map(|resp| format!(" HTTP {} in {}ms", resp.status, resp.elapsed_ms))
                        .unwrap_or_default();
                    let err = r.error.as_deref().map(|e| format!(" ({e})")).unwrap_or_default();
                    println!("- {} [{}]{http}{err}", r.request_id, r.status.as_str());
                }
            }
            let summary = RunCollectionSummary {
                run_id: result.run_id.to_string(),
                collection_id: collection.id.clone(),
                status: result.status.as_str().to_string(),
                total: result.progress.total,
                passed: result.progress.passed,
                failed: result.progress.failed,
                skipped: result.progress.skipped,
                average_time_ms: result.average_time,
            };
            print_result(output.format, output.quiet, &summary);
        }
    }

    match result.status {
        SuiteRunStatus::Success => exit_codes::SUCCESS,
        _ => exit_codes::RUN_FAILED,
    }
}
