use std::path::Path;

use serde::Serialize;
use volley_core::types::Flow;
use volley_core::FlowGraph;

use crate::exit_codes;
use crate::output::{print_error, OutputFormat};
use crate::OutputArgs;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanOutput<'a> {
    flow_id: &'a str,
    topo_order: &'a [String],
    levels: &'a [Vec<String>],
    steps: Vec<PlanStep<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanStep<'a> {
    node_id: &'a str,
    alias: &'a str,
    request_id: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
}

pub async fn plan_cmd(path: &Path, flow_id: &str, output: OutputArgs) -> i32 {
    let parsed = match super::load_workspace(path, &output) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let Some(flow) = parsed.document.flows.iter().find(|f| f.id == flow_id) else {
        print_error(output.format, output.quiet, &format!("flow '{flow_id}' not found"));
        return exit_codes::VALIDATION_FAILED;
    };

    let graph = match FlowGraph::build(flow) {
        Ok(g) => g,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };
    if output.quiet {
        return exit_codes::SUCCESS;
    }

    match output.format {
        OutputFormat::Json => print_json(flow, &graph),
        OutputFormat::Text => print_text(flow, &graph),
        OutputFormat::Dot => {
            println!("{}", to_dot(flow));
            exit_codes::SUCCESS
        }
    }
}

fn steps<'a>(flow: &'a Flow, graph: &'a FlowGraph) -> Vec<PlanStep<'a>> {
    graph
        .topo_order
        .iter()
        .filter_map(|id| flow.node(id))
        .map(|n| PlanStep {
            node_id: &n.id,
            alias: &n.alias,
            request_id: &n.request_id,
            depends_on: graph
                .incoming(&n.id)
                .iter()
                .map(|c| format!("{} ({})", c.source_node_id, c.condition.as_str()))
                .collect(),
        })
        .collect()
}

fn print_json(flow: &Flow, graph: &FlowGraph) -> i32 {
    let payload = PlanOutput {
        flow_id: &flow.id,
        topo_order: &graph.topo_order,
        levels: &graph.levels,
        steps: steps(flow, graph),
    };
    match serde_json::to_string_pretty(&payload) {
        Ok(s) => {
            println!("{s}");
            exit_codes::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize plan as JSON: {e}");
            exit_codes::RUNTIME_ERROR
        }
    }
}

fn print_text(flow: &Flow, graph: &FlowGraph) -> i32 {
    println!("flow: {}", flow.id);
    println!("\nexecution levels:");
    for (idx, level) in graph.levels.iter().enumerate() {
        if !level.is_empty() {
            println!("  Level {idx}: {}", level.join(", "));
        }
    }

    println!("\nexecution order:");
    for s in steps(flow, graph) {
        println!("- {} ({}) -> request {}", s.node_id, s.alias, s.request_id);
        if !s.depends_on.is_empty() {
            println!("  after: {}", s.depends_on.join(", "));
        }
    }
    exit_codes::SUCCESS
}

/// Graphviz rendering: one box per node, edges labelled with their condition.
fn to_dot(flow: &Flow) -> String {
    let mut out = format!("digraph \"{}\" {{\n  rankdir=LR;\n  node [shape=box];\n", escape(&flow.id));
    for n in &flow.nodes {
        out.push_str(&format!(
            "  \"{}\" [label=\"{}\\n{}\"];\n",
            escape(&n.id),
            escape(&n.alias),
            escape(&n.request_id)
        ));
    }
    for c in &flow.connectors {
        out.push_str(&format!(
            "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
            escape(&c.source_node_id),
            escape(&c.target_node_id),
            c.condition.as_str()
        ));
    }
    out.push('}');
    out
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_core::types::{ConnectorCondition, FlowConnector, FlowNode};

    #[test]
    fn dot_lists_nodes_and_labelled_edges() {
        let flow = Flow {
            id: "f".into(),
            name: String::new(),
            nodes: vec![
                FlowNode { id: "a".into(), alias: "login".into(), request_id: "r1".into() },
                FlowNode { id: "b".into(), alias: "me".into(), request_id: "r2".into() },
            ],
            connectors: vec![FlowConnector {
                id: "c1".into(),
                source_node_id: "a".into(),
                target_node_id: "b".into(),
                condition: ConnectorCondition::Failure,
            }],
            default_env_id: None,
            default_auth_id: None,
        };
        let dot = to_dot(&flow);
        assert!(dot.starts_with("digraph \"f\""));
        assert!(dot.contains("\"a\" -> \"b\" [label=\"failure\"]"));
        assert!(dot.contains("login\\nr1"));
    }
}
