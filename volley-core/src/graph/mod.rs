use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::types::{Flow, FlowConnector};

/// Execution view of a flow: topological order plus per-node connector lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowGraph {
    /// Node ids in Kahn order; ties keep node declaration order.
    pub topo_order: Vec<String>,
    /// Nodes grouped by longest distance from a root. Informational only; execution is sequential.
    pub levels: Vec<Vec<String>>,
    incoming: BTreeMap<String, Vec<FlowConnector>>,
    outgoing: BTreeMap<String, Vec<FlowConnector>>,
}

impl FlowGraph {
    /// Build the graph, failing fast when the connectors form a cycle.
    ///
    /// Connectors that reference unknown nodes are ignored here; structural validation reports them.
    pub fn build(flow: &Flow) -> Result<Self, GraphError> {
        let position: BTreeMap<&str, usize> = flow
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut incoming: BTreeMap<String, Vec<FlowConnector>> = BTreeMap::new();
        let mut outgoing: BTreeMap<String, Vec<FlowConnector>> = BTreeMap::new();
        let mut indeg = vec![0usize; flow.nodes.len()];
        let mut next: Vec<Vec<usize>> = vec![Vec::new(); flow.nodes.len()];

        for c in &flow.connectors {
            let (Some(&src), Some(&dst)) = (
                position.get(c.source_node_id.as_str()),
                position.get(c.target_node_id.as_str()),
            ) else {
                continue;
            };
            indeg[dst] += 1;
            next[src].push(dst);
            incoming
                .entry(c.target_node_id.clone())
                .or_default()
                .push(c.clone());
            outgoing
                .entry(c.source_node_id.clone())
                .or_default()
                .push(c.clone());
        }
        for v in &mut next {
            v.sort_unstable();
        }

        // Min-heap on declaration index: among ready nodes the earliest declared runs first.
        let mut ready: BinaryHeap<Reverse<usize>> = (0..flow.nodes.len())
            .filter(|&i| indeg[i] == 0)
            .map(Reverse)
            .collect();
        let mut order = Vec::with_capacity(flow.nodes.len());
        while let Some(Reverse(i)) = ready.pop() {
            order.push(i);
            for &m in &next[i] {
                indeg[m] -= 1;
                if indeg[m] == 0 {
                    ready.push(Reverse(m));
                }
            }
        }

        if order.len() != flow.nodes.len() {
            let nodes = (0..flow.nodes.len())
                .filter(|&i| indeg[i] > 0)
                .map(|i| flow.nodes[i].id.clone())
                .collect();
            return Err(GraphError::Cycle { nodes });
        }

        let topo_order: Vec<String> = order.iter().map(|&i| flow.nodes[i].id.clone()).collect();
        let levels = compute_levels(&topo_order, &incoming);

        Ok(Self {
            topo_order,
            levels,
            incoming,
            outgoing,
        })
    }

    pub fn incoming(&self, node_id: &str) -> &[FlowConnector] {
        self.incoming.get(node_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn outgoing(&self, node_id: &str) -> &[FlowConnector] {
        self.outgoing.get(node_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_root(&self, node_id: &str) -> bool {
        self.incoming(node_id).is_empty()
    }
}

fn compute_levels(
    topo: &[String],
    incoming: &BTreeMap<String, Vec<FlowConnector>>,
) -> Vec<Vec<String>> {
    if topo.is_empty() {
        return Vec::new();
    }
    let mut level: BTreeMap<&str, usize> = BTreeMap::new();
    for node in topo {
        let l = incoming
            .get(node)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|c| level.get(c.source_node_id.as_str()).copied())
            .max()
            .map(|m| m + 1)
            .unwrap_or(0);
        level.insert(node.as_str(), l);
    }

    let max_level = level.values().copied().max().unwrap_or(0);
    let mut levels = vec![Vec::<String>::new(); max_level + 1];
    for node in topo {
        levels[level[node.as_str()]].push(node.clone());
    }
    levels
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("cycle detected in flow graph (nodes: {})", nodes.join(", "))]
    Cycle { nodes: Vec<String> },
}
