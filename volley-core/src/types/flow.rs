use serde::{Deserialize, Serialize};

/// A directed graph of request nodes connected by conditional edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub nodes: Vec<FlowNode>,

    #[serde(default)]
    pub connectors: Vec<FlowConnector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_env_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_auth_id: Option<String>,
}

impl Flow {
    pub fn node(&self, node_id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: String,
    /// Unique within the flow; downstream templates address this node's response as `{{alias.response...}}`.
    pub alias: String,
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowConnector {
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    #[serde(default)]
    pub condition: ConnectorCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorCondition {
    #[default]
    Success,
    Failure,
    Always,
}

impl ConnectorCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorCondition::Success => "success",
            ConnectorCondition::Failure => "failure",
            ConnectorCondition::Always => "always",
        }
    }

    /// Whether an upstream outcome opens this connector.
    ///
    /// `status` is the upstream HTTP status when a response was received; `None` means the
    /// upstream node errored before producing a response.
    pub fn is_satisfied_by(&self, status: Option<u16>) -> bool {
        match self {
            ConnectorCondition::Success => status.is_some_and(is_success_status),
            ConnectorCondition::Failure => !status.is_some_and(is_success_status),
            ConnectorCondition::Always => true,
        }
    }
}

/// 2xx and 3xx count as success for flow traversal and plain request runs.
pub fn is_success_status(status: u16) -> bool {
    (200..400).contains(&status)
}
