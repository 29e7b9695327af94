//! Conditional traversal of a flow graph.
//!
//! Nodes run one at a time in topological order. A node runs when it has no incoming
//! connectors or when at least one incoming connector is satisfied by its source's outcome;
//! otherwise it is skipped, which in turn satisfies none of its own outgoing connectors.

mod context;
mod result;

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use volley_core::types::{Flow, FlowRunStatus, NodeStatus};
use volley_core::{validate_flow, FlowGraph};

use crate::batch::CancelHandle;
use crate::deps::EngineDeps;
use crate::events::{Event, RunKind};
use crate::request::{execute_request, BuildContext};

pub use context::FlowContext;
pub use result::{FlowNodeResult, FlowRunResult};

#[derive(Debug, Clone, Default)]
pub struct FlowRunOptions {
    /// Reuse a caller-chosen run id (a suite run, for example); a fresh v4 id otherwise.
    pub run_id: Option<Uuid>,
    /// Overrides the flow's `defaultEnvId`.
    pub env_id: Option<String>,
    /// Overrides the flow's `defaultAuthId`.
    pub auth_id: Option<String>,
    pub variables: BTreeMap<String, String>,
}

pub struct FlowEngine {
    deps: EngineDeps,
}

impl FlowEngine {
    pub fn new(deps: EngineDeps) -> Self {
        Self { deps }
    }

    /// Run `flow` to completion. Never fails: every problem ends up in the returned result.
    pub async fn run(
        &self,
        flow: &Flow,
        options: &FlowRunOptions,
        cancel: &CancelHandle,
    ) -> FlowRunResult {
        let run_id = options.run_id.unwrap_or_else(Uuid::new_v4);
        let mut result = FlowRunResult::start(run_id, flow);
        let sink = &self.deps.event_sink;
        sink.emit(Event::RunStarted {
            run_id,
            kind: RunKind::Flow,
            target_id: flow.id.clone(),
            total: flow.nodes.len(),
        })
        .await;
        info!(%run_id, flow_id = %flow.id, nodes = flow.nodes.len(), "flow started");

        self.traverse(flow, options, cancel, &mut result).await;

        if result.status == FlowRunStatus::Running {
            let any_failed = result
                .node_results
                .values()
                .any(|n| n.status == NodeStatus::Failed);
            result.status = if any_failed || !result.errors.is_empty() {
                FlowRunStatus::Failed
            } else {
                FlowRunStatus::Success
            };
        }
        result.refresh_progress();
        result.completed_at = Some(Utc::now());

        info!(%run_id, flow_id = %flow.id, status = result.status.as_str(), "flow finished");
        sink.emit(Event::FlowFinished {
            run_id,
            flow_id: flow.id.clone(),
            status: result.status,
        })
        .await;
        result
    }

    async fn traverse(
        &self,
        flow: &Flow,
        options: &FlowRunOptions,
        cancel: &CancelHandle,
        result: &mut FlowRunResult,
    ) {
        if let Err(e) = validate_flow(flow) {
            warn!(flow_id = %flow.id, violations = e.violations.len(), "flow failed validation");
            result.errors = e.messages();
            return;
        }
        let graph = match FlowGraph::build(flow) {
            Ok(g) => g,
            Err(e) => {
                result.errors.push(e.to_string());
                return;
            }
        };

        let env_id = options.env_id.as_deref().or(flow.default_env_id.as_deref());
        let environment = match env_id {
            Some(id) => match self.deps.environments.find_environment(id) {
                Some(env) => Some(env),
                None => {
                    result.errors.push(format!("environment '{id}' not found"));
                    return;
                }
            },
            None => None,
        };
        let default_auth_id = options.auth_id.as_deref().or(flow.default_auth_id.as_deref());

        let run_id = result.run_id;
        let mut context = FlowContext::new();

        for node_id in &graph.topo_order {
            if cancel.is_cancelled() {
                info!(%run_id, flow_id = %flow.id, "flow cancelled");
                result.status = FlowRunStatus::Cancelled;
                return;
            }
            let Some(node) = flow.node(node_id) else {
                continue;
            };

            let incoming = graph.incoming(node_id);
            let mut eligible = incoming.is_empty();
            for c in incoming {
                let satisfied = result.node(&c.source_node_id).is_some_and(|src| {
                    let outcome = match src.status {
                        NodeStatus::Success | NodeStatus::Failed => {
                            Some(src.response.as_ref().map(|r| r.status))
                        }
                        _ => None,
                    };
                    outcome.is_some_and(|status| c.condition.is_satisfied_by(status))
                });
                if satisfied {
                    eligible = true;
                    result.active_connector_ids.push(c.id.clone());
                } else {
                    result.skipped_connector_ids.push(c.id.clone());
                }
            }

            if !eligible {
                debug!(%run_id, node_id = %node.id, "node skipped");
                self.finish_node(flow, result, &node.id, NodeStatus::Skipped)
                    .await;
                continue;
            }

            self.deps
                .event_sink
                .emit(Event::NodeStarted {
                    run_id,
                    flow_id: flow.id.clone(),
                    node_id: node.id.clone(),
                })
                .await;
            if let Some(n) = result.node_results.get_mut(&node.id) {
                n.status = NodeStatus::Running;
                n.started_at = Some(Utc::now());
            }

            let outcome = match self.deps.collections.find_request_by_id(&node.request_id) {
                None => Err(format!("request '{}' not found", node.request_id)),
                Some(request) => {
                    let collection = self.deps.collections.collection_of(&request.id);
                    let ctx = BuildContext {
                        collection: collection.as_deref(),
                        environment: environment.as_ref(),
                        default_auth_id,
                        overrides: None,
                        flow: Some(&context),
                        variables: Some(&options.variables),
                    };
                    let exchange_id = format!("{run_id}:{}", node.id);
                    execute_request(&self.deps, &exchange_id, &request, &ctx, cancel).await
                }
            };

            if cancel.is_cancelled() {
                // The response arrived after cancellation; it is not part of the run.
                if let Some(n) = result.node_results.get_mut(&node.id) {
                    n.error = Some("cancelled".to_string());
                }
                self.finish_node(flow, result, &node.id, NodeStatus::Skipped)
                    .await;
                result.status = FlowRunStatus::Cancelled;
                return;
            }

            match outcome {
                Ok(response) => {
                    let status = if response.is_success() {
                        context.record(node.alias.clone(), response.clone());
                        NodeStatus::Success
                    } else {
                        NodeStatus::Failed
                    };
                    debug!(%run_id, node_id = %node.id, http_status = response.status, "node finished");
                    if let Some(n) = result.node_results.get_mut(&node.id) {
                        n.response = Some(response);
                    }
                    result.execution_order.push(node.alias.clone());
                    self.finish_node(flow, result, &node.id, status).await;
                }
                Err(error) => {
                    warn!(%run_id, node_id = %node.id, %error, "node errored, halting flow");
                    if let Some(n) = result.node_results.get_mut(&node.id) {
                        n.error = Some(error);
                    }
                    result.execution_order.push(node.alias.clone());
                    self.finish_node(flow, result, &node.id, NodeStatus::Failed)
                        .await;
                    return;
                }
            }
        }
    }

    async fn finish_node(
        &self,
        flow: &Flow,
        result: &mut FlowRunResult,
        node_id: &str,
        status: NodeStatus,
    ) {
        if let Some(n) = result.node_results.get_mut(node_id) {
            n.status = status;
            n.completed_at = Some(Utc::now());
        }
        result.refresh_progress();
        self.deps
            .event_sink
            .emit(Event::NodeFinished {
                run_id: result.run_id,
                flow_id: flow.id.clone(),
                node_id: node_id.to_string(),
                status,
            })
            .await;
    }
}
