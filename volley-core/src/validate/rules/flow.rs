use std::collections::BTreeSet;

use crate::graph::FlowGraph;
use crate::types::Flow;
use crate::validate::validator::{Validator, ALIAS_RE};

pub(crate) fn validate_flow(v: &mut Validator, path: &str, flow: &Flow) {
    v.require_non_empty(&format!("{path}.id"), &flow.id);

    let before = v.len();
    v.unique_ids(
        &format!("{path}.nodes"),
        "node id",
        flow.nodes.iter().map(|n| n.id.as_str()),
    );
    v.unique_ids(
        &format!("{path}.nodes"),
        "alias",
        flow.nodes.iter().map(|n| n.alias.as_str()),
    );
    v.unique_ids(
        &format!("{path}.connectors"),
        "connector id",
        flow.connectors.iter().map(|c| c.id.as_str()),
    );

    for (i, n) in flow.nodes.iter().enumerate() {
        let p = format!("{path}.nodes[{i}]");
        v.require_non_empty(&format!("{p}.requestId"), &n.request_id);
        if n.alias.is_empty() {
            v.push(format!("{p}.alias"), "must not be empty");
        } else if !ALIAS_RE.is_match(&n.alias) {
            v.push(
                format!("{p}.alias"),
                format!("alias '{}' must match ^[A-Za-z0-9_\\-]+$", n.alias),
            );
        }
    }

    let node_ids: BTreeSet<&str> = flow.nodes.iter().map(|n| n.id.as_str()).collect();
    for (i, c) in flow.connectors.iter().enumerate() {
        let p = format!("{path}.connectors[{i}]");
        if !node_ids.contains(c.source_node_id.as_str()) {
            v.push(
                format!("{p}.sourceNodeId"),
                format!("connector '{}' references unknown source node '{}'", c.id, c.source_node_id),
            );
        }
        if !node_ids.contains(c.target_node_id.as_str()) {
            v.push(
                format!("{p}.targetNodeId"),
                format!("connector '{}' references unknown target node '{}'", c.id, c.target_node_id),
            );
        }
    }

    // Cycle detection only makes sense on a structurally sound graph.
    if v.len() == before {
        if let Err(e) = FlowGraph::build(flow) {
            v.push(format!("{path}.connectors"), e.to_string());
        }
    }
}
