use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use volley_core::types::{Flow, FlowProgress, FlowRunStatus, NodeStatus};

use crate::http::HttpResponse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNodeResult {
    pub node_id: String,
    pub alias: String,
    pub request_id: String,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRunResult {
    pub run_id: Uuid,
    pub flow_id: String,
    pub status: FlowRunStatus,
    pub node_results: BTreeMap<String, FlowNodeResult>,
    pub active_connector_ids: Vec<String>,
    pub skipped_connector_ids: Vec<String>,
    /// Aliases of executed nodes, in execution order.
    pub execution_order: Vec<String>,
    pub progress: FlowProgress,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl FlowRunResult {
    /// A running result with every node idle.
    pub fn start(run_id: Uuid, flow: &Flow) -> Self {
        let node_results = flow
            .nodes
            .iter()
            .map(|n| {
                (
                    n.id.clone(),
                    FlowNodeResult {
                        node_id: n.id.clone(),
                        alias: n.alias.clone(),
                        request_id: n.request_id.clone(),
                        status: NodeStatus::Idle,
                        response: None,
                        error: None,
                        started_at: None,
                        completed_at: None,
                    },
                )
            })
            .collect();
        Self {
            run_id,
            flow_id: flow.id.clone(),
            status: FlowRunStatus::Running,
            node_results,
            active_connector_ids: Vec::new(),
            skipped_connector_ids: Vec::new(),
            execution_order: Vec::new(),
            progress: FlowProgress {
                total: flow.nodes.len(),
                ..Default::default()
            },
            errors: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn node(&self, node_id: &str) -> Option<&FlowNodeResult> {
        self.node_results.get(node_id)
    }

    pub fn refresh_progress(&mut self) {
        self.progress = FlowProgress::from_nodes(
            self.node_results.len(),
            self.node_results.values().map(|r| r.status),
        );
    }

    /// Wall-clock duration of the run in milliseconds, once finished.
    pub fn elapsed_ms(&self) -> Option<u64> {
        let done = self.completed_at?;
        u64::try_from((done - self.started_at).num_milliseconds()).ok()
    }

    /// First recorded error: flow-level errors first, then failed nodes.
    pub fn first_error(&self) -> Option<String> {
        self.errors.first().cloned().or_else(|| {
            self.node_results
                .values()
                .filter(|n| n.status == NodeStatus::Failed)
                .find_map(|n| {
                    n.error.clone().or_else(|| {
                        n.response
                            .as_ref()
                            .map(|r| format!("node '{}' returned HTTP {}", n.alias, r.status))
                    })
                })
        })
    }
}
