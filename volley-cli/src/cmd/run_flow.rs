use std::path::Path;

use serde::Serialize;
use volley_core::types::{FlowRunStatus, NodeStatus};
use volley_exec::{CancelHandle, FlowEngine, FlowRunOptions};

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{parse_vars, OutputArgs, RunArgs};

#[derive(Serialize)]
struct RunFlowSummary {
    run_id: String,
    flow_id: String,
    status: String,
    nodes_succeeded: usize,
    nodes_failed: usize,
    nodes_skipped: usize,
    execution_order: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

pub async fn run_flow_cmd(
    path: &Path,
    flow_id: &str,
    vars: &[String],
    run: RunArgs,
    output: OutputArgs,
) -> i32 {
    let variables = match parse_vars(vars) {
        Ok(v) => v,
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::VALIDATION_FAILED;
        }
    };
    let parsed = match super::load_workspace(path, &output) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let Some(flow) = parsed.document.flows.iter().find(|f| f.id == flow_id) else {
        print_error(output.format, output.quiet, &format!("flow '{flow_id}' not found"));
        return exit_codes::VALIDATION_FAILED;
    };
    let deps = match super::engine_deps(&parsed, &run, &output) {
        Ok(d) => d,
        Err(code) => return code,
    };

    let cancel = CancelHandle::new();
    super::watch_ctrl_c(cancel.clone());

    let options = FlowRunOptions {
        run_id: None,
        env_id: run.env.clone(),
        auth_id: run.auth.clone(),
        variables,
    };
    let result = FlowEngine::new(deps).run(flow, &options, &cancel).await;

    let count = |s: NodeStatus| result.node_results.values().filter(|n| n.status == s).count();
    let summary = RunFlowSummary {
        run_id: result.run_id.to_string(),
        flow_id: result.flow_id.clone(),
        status: result.status.as_str().to_string(),
        nodes_succeeded: count(NodeStatus::Success),
        nodes_failed: count(NodeStatus::Failed),
        nodes_skipped: count(NodeStatus::Skipped),
        execution_order: result.execution_order.clone(),
        errors: result.errors.clone(),
    };

    match output.format {
        OutputFormat::Json => print_result(output.format, output.quiet, &result),
        OutputFormat::Text | OutputFormat::Dot => {
            if !output.quiet {
                for n in flow.nodes.iter().filter_map(|n| result.node(&n.id)) {
                    let http = n
                        .response
                        .as_ref()
                        .map(|r| format!(" HTTP {} in {}ms", r.status, r.elapsed_ms))
                        .unwrap_or_default();
                    let err = n.error.as_deref().map(|e| format!(" ({e})")).unwrap_or_default();
                    println!("- {} [{}]{http}{err}", n.alias, n.status.as_str());
                }
            }
            print_result(output.format, output.quiet, &summary);
        }
    }

    match result.status {
        FlowRunStatus::Success => exit_codes::SUCCESS,
        _ => exit_codes::RUN_FAILED,
    }
}
