use std::path::Path;

use serde::Serialize;
use volley_core::types::SuiteRunStatus;
use volley_exec::SuiteRunner;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{OutputArgs, RunArgs};

#[derive(Serialize)]
struct RunSuiteSummary {
    run_id: String,
    suite_id: String,
    status: String,
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
    average_time_ms: f64,
}

pub async fn run_suite_cmd(path: &Path, suite_id: &str, run: RunArgs, output: OutputArgs) -> i32 {
    let parsed = match super::load_workspace(path, &output) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let Some(mut suite) = parsed.document.suites.iter().find(|s| s.id == suite_id).cloned() else {
        print_error(output.format, output.quiet, &format!("suite '{suite_id}' not found"));
        return exit_codes::VALIDATION_FAILED;
    };
    run.apply_to(&mut suite.settings);
    if run.env.is_some() {
        suite.default_env_id = run.env.clone();
    }
    if run.auth.is_some() {
        suite.default_auth_id = run.auth.clone();
    }

    let deps = match super::engine_deps(&parsed, &run, &output) {
        Ok(d) => d,
        Err(code) => return code,
    };
    let runner = match SuiteRunner::new(deps, suite) {
        Ok(r) => r,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };
    super::watch_ctrl_c(runner.cancel_handle());

    let result = runner.run().await;

    match output.format {
        OutputFormat::Json => print_result(output.format, output.quiet, &result),
        OutputFormat::Text | OutputFormat::Dot => {
            if !output.quiet {
                let mut items: Vec<_> = result.item_results.values().collect();
                items.sort_by(|a, b| a.item_id.cmp(&b.item_id));
                for item in items {
                    let time = item.elapsed_time.map(|t| format!(" {t}ms")).unwrap_or_default();
                    let err = item.error.as_deref().map(|e| format!(" ({e})")).unwrap_or_default();
                    println!(
                        "- {} [{}/{}]{time}{err}",
                        item.item_id,
                        item.status.as_str(),
                        item.validation_status.as_str()
                    );
                    for f in &item.validation_failures {
                        println!("    {f}");
                    }
                }
            }
            let summary = RunSuiteSummary {
                run_id: result.run_id.to_string(),
                suite_id: result.suite_id.clone(),
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
