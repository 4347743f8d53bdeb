// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property tests: structural invariants hold after any sequence of edits,
//! and undo/redo walks the history back and forth exactly.

use nodeweave_graph::builtin::{self, BASIC_A, COUNTER};
use nodeweave_graph::serialize::NodeDocument;
use nodeweave_graph::{Connection, CreateNodeOptions, NodeGraph, NodeId, PortRef};
use indexmap::IndexMap;
use proptest::prelude::*;
use std::collections::BTreeSet;

const NODES: usize = 5;

#[derive(Debug, Clone)]
enum Edit {
    Connect { from: usize, output: usize, to: usize, input: usize },
    Disconnect { from: usize, output: usize, to: usize, input: usize },
    Lock { node: usize, output: usize },
    Unlock { node: usize, output: usize },
    Disable { node: usize },
    Move { node: usize, x: i32, y: i32 },
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    let endpoints = (0..NODES, 0..2usize, 0..NODES, 0..2usize);
    prop_oneof![
        4 => endpoints.clone().prop_map(|(from, output, to, input)| Edit::Connect { from, output, to, input }),
        2 => endpoints.prop_map(|(from, output, to, input)| Edit::Disconnect { from, output, to, input }),
        1 => (0..NODES, 0..2usize).prop_map(|(node, output)| Edit::Lock { node, output }),
        1 => (0..NODES, 0..2usize).prop_map(|(node, output)| Edit::Unlock { node, output }),
        1 => (0..NODES).prop_map(|node| Edit::Disable { node }),
        1 => (0..NODES, -500..500i32, -500..500i32).prop_map(|(node, x, y)| Edit::Move { node, x, y }),
    ]
}

/// Four two-in/two-out nodes and one counter
fn setup() -> (NodeGraph, Vec<NodeId>) {
    let mut graph = NodeGraph::new();
    builtin::register_builtin_nodes(&mut graph.registry().write());
    let ids: Vec<NodeId> = (0..NODES)
        .map(|i| {
            let type_id = if i == NODES - 1 { COUNTER } else { BASIC_A };
            graph.create_node(type_id, CreateNodeOptions::new()).unwrap()
        })
        .collect();
    graph.clear_undo_stack();
    (graph, ids)
}

fn port_name(graph: &NodeGraph, port: &PortRef, index: usize) -> String {
    let names: Vec<&String> = graph.node(&port.node).unwrap().ports(port.direction).keys().collect();
    names[index % names.len()].clone()
}

fn input_port(graph: &NodeGraph, node: &NodeId, index: usize) -> PortRef {
    let name = port_name(graph, &PortRef::input(node, ""), index);
    PortRef::input(node, name)
}

fn output_port(graph: &NodeGraph, node: &NodeId, index: usize) -> PortRef {
    let name = port_name(graph, &PortRef::output(node, ""), index);
    PortRef::output(node, name)
}

/// Apply one edit; rejected edits (locked ports) are part of normal use
fn apply(graph: &mut NodeGraph, ids: &[NodeId], edit: &Edit) {
    let _ = match *edit {
        Edit::Connect { from, output, to, input } | Edit::Disconnect { from, output, to, input } => {
            let out = output_port(graph, &ids[from], output);
            let inp = input_port(graph, &ids[to], input);
            if matches!(edit, Edit::Connect { .. }) {
                graph.connect(&out, &inp).map(|_| ())
            } else {
                graph.disconnect(&inp, &out).map(|_| ())
            }
        }
        Edit::Lock { node, output } | Edit::Unlock { node, output } => {
            let port = output_port(graph, &ids[node], output);
            graph.set_port_locked(&port, matches!(edit, Edit::Lock { .. }), true)
        }
        Edit::Disable { node } => graph.disable_nodes(&ids[node..=node], None),
        Edit::Move { node, x, y } => graph.set_node_position(&ids[node], [f64::from(x), f64::from(y)]),
    };
}

type Snapshot = (IndexMap<NodeId, NodeDocument>, BTreeSet<Connection>, Vec<bool>);

fn snapshot(graph: &NodeGraph) -> Snapshot {
    let locks = graph
        .model()
        .nodes()
        .flat_map(|n| n.all_ports().map(|p| p.locked))
        .collect();
    (
        graph.serialize_session().nodes,
        graph.model().connections().into_iter().collect(),
        locks,
    )
}

proptest! {
    #[test]
    fn structure_stays_consistent(edits in prop::collection::vec(edit_strategy(), 1..40)) {
        let (mut graph, ids) = setup();
        for edit in &edits {
            apply(&mut graph, &ids, edit);
            prop_assert!(graph.model().is_consistent(), "after {:?}", edit);
            prop_assert!(!graph.model().has_cycle(), "after {:?}", edit);
            for node in graph.model().nodes() {
                for port in node.inputs().filter(|p| !p.multi_connection) {
                    prop_assert!(port.peer_count() <= 1);
                }
            }
        }
    }

    #[test]
    fn undo_redo_round_trip(edits in prop::collection::vec(edit_strategy(), 1..30)) {
        let (mut graph, ids) = setup();
        let initial = snapshot(&graph);
        for edit in &edits {
            apply(&mut graph, &ids, edit);
        }
        let last = snapshot(&graph);

        while graph.undo().is_ok() {}
        prop_assert_eq!(snapshot(&graph), initial);
        while graph.redo().is_ok() {}
        prop_assert_eq!(snapshot(&graph), last);
        prop_assert!(graph.model().is_consistent());
    }
}
