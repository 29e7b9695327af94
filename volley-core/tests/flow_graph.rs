use volley_core::types::{ConnectorCondition, Flow, FlowConnector, FlowNode};
use volley_core::{FlowGraph, GraphError};

fn node(id: &str) -> FlowNode {
    FlowNode {
        id: id.to_string(),
        alias: id.to_string(),
        request_id: format!("req-{id}"),
    }
}

fn edge(id: &str, from: &str, to: &str) -> FlowConnector {
    FlowConnector {
        id: id.to_string(),
        source_node_id: from.to_string(),
        target_node_id: to.to_string(),
        condition: ConnectorCondition::Success,
    }
}

fn flow(nodes: &[&str], connectors: Vec<FlowConnector>) -> Flow {
    Flow {
        id: "f1".to_string(),
        name: "flow".to_string(),
        nodes: nodes.iter().map(|n| node(n)).collect(),
        connectors,
        default_env_id: None,
        default_auth_id: None,
    }
}

#[test]
fn topo_order_follows_connectors() {
    let f = flow(
        &["fetch", "login", "create"],
        vec![edge("c1", "login", "create"), edge("c2", "create", "fetch")],
    );
    let g = FlowGraph::build(&f).unwrap();
    assert_eq!(g.topo_order, vec!["login", "create", "fetch"]);
    assert_eq!(
        g.levels,
        vec![
            vec!["login".to_string()],
            vec!["create".to_string()],
            vec!["fetch".to_string()],
        ]
    );
}

#[test]
fn independent_nodes_keep_declaration_order() {
    let f = flow(&["b", "a", "c"], vec![]);
    let g = FlowGraph::build(&f).unwrap();
    assert_eq!(g.topo_order, vec!["b", "a", "c"]);
    assert_eq!(g.levels.len(), 1);
}

#[test]
fn ready_ties_release_the_earliest_declared_node() {
    // After `a` runs both `b` and `d` are ready; `b` is declared first and unlocks `c`,
    // which is still declared before `d`.
    let f = flow(
        &["a", "b", "c", "d"],
        vec![edge("c1", "a", "d"), edge("c2", "b", "c")],
    );
    let g = FlowGraph::build(&f).unwrap();
    assert_eq!(g.topo_order, vec!["a", "b", "c", "d"]);
    assert_eq!(g.levels[1], vec!["c".to_string(), "d".to_string()]);
}

#[test]
fn parallel_branches_share_a_level() {
    let f = flow(
        &["root", "left", "right", "join"],
        vec![
            edge("c1", "root", "left"),
            edge("c2", "root", "right"),
            edge("c3", "left", "join"),
            edge("c4", "right", "join"),
        ],
    );
    let g = FlowGraph::build(&f).unwrap();
    assert_eq!(g.topo_order, vec!["root", "left", "right", "join"]);
    assert_eq!(g.levels[1], vec!["left".to_string(), "right".to_string()]);
    assert_eq!(g.incoming("join").len(), 2);
    assert_eq!(g.outgoing("root").len(), 2);
    assert!(g.is_root("root"));
}

#[test]
fn two_node_cycle_is_detected() {
    let f = flow(&["a", "b"], vec![edge("c1", "a", "b"), edge("c2", "b", "a")]);
    let err = FlowGraph::build(&f).unwrap_err();
    assert_eq!(
        err,
        GraphError::Cycle {
            nodes: vec!["a".to_string(), "b".to_string()]
        }
    );
    assert!(err.to_string().contains("cycle"));
}

#[test]
fn self_loop_is_a_cycle() {
    let f = flow(&["a"], vec![edge("c1", "a", "a")]);
    assert!(FlowGraph::build(&f).is_err());
}

#[test]
fn empty_flow_builds() {
    let g = FlowGraph::build(&flow(&[], vec![])).unwrap();
    assert!(g.topo_order.is_empty());
    assert!(g.levels.is_empty());
}
