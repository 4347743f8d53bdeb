// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end editing scenarios through the public API.

use nodeweave_graph::builtin::{self, BASIC_A, BASIC_B, COUNTER, COUNTER_PROPERTY};
use nodeweave_graph::{
    CreateNodeOptions, DeserializeOptions, GraphError, GraphEvent, Node, NodeGraph, NodeId, NodeRegistry, PortRef,
};
use std::cell::RefCell;
use std::rc::Rc;

fn editor() -> NodeGraph {
    let graph = NodeGraph::new();
    builtin::register_builtin_nodes(&mut graph.registry().write());
    graph
}

fn create(graph: &mut NodeGraph, type_id: &str) -> NodeId {
    graph.create_node(type_id, CreateNodeOptions::new()).unwrap()
}

#[test]
fn connect_records_peers_on_both_sides() {
    let mut graph = editor();
    let a = create(&mut graph, BASIC_B);
    let b = create(&mut graph, BASIC_B);
    graph.connect(&PortRef::output(&a, "out"), &PortRef::input(&b, "in")).unwrap();

    let out = graph.model().port(&PortRef::output(&a, "out")).unwrap();
    assert_eq!(out.peers().len(), 1);
    assert_eq!(out.peers()[&b], vec!["in".to_string()]);
    let input = graph.model().port(&PortRef::input(&b, "in")).unwrap();
    assert_eq!(input.peers()[&a], vec!["out".to_string()]);
}

#[test]
fn acyclic_graph_rejects_back_edge() {
    let mut graph = editor();
    let a = create(&mut graph, BASIC_B);
    let b = create(&mut graph, BASIC_B);
    graph.connect(&PortRef::output(&a, "out"), &PortRef::input(&b, "in")).unwrap();
    let before = graph.serialize_session();

    let made = graph.connect(&PortRef::output(&b, "out"), &PortRef::input(&a, "in")).unwrap();
    assert!(!made);
    assert_eq!(graph.serialize_session(), before);
}

#[test]
fn single_connection_input_keeps_latest_peer() {
    let mut graph = editor();
    let a1 = create(&mut graph, BASIC_B);
    let a2 = create(&mut graph, BASIC_B);
    let b = create(&mut graph, BASIC_B);
    let input = PortRef::input(&b, "in");
    graph.connect(&input, &PortRef::output(&a1, "out")).unwrap();
    graph.connect(&input, &PortRef::output(&a2, "out")).unwrap();

    let port = graph.model().port(&input).unwrap();
    assert_eq!(port.peer_count(), 1);
    assert!(port.is_connected_to(&a2, "out"));
    assert_eq!(graph.model().port(&PortRef::output(&a1, "out")).unwrap().peer_count(), 0);
}

#[test]
fn serialize_round_trip_into_fresh_graph() {
    let mut graph = editor();
    let a = create(&mut graph, BASIC_A);
    let b = create(&mut graph, BASIC_B);
    let c = create(&mut graph, COUNTER);
    graph.set_property(&b, "label", "hello").unwrap();
    graph.set_node_position(&c, [300.0, 40.0]).unwrap();
    graph.connect(&PortRef::output(&a, "out A"), &PortRef::input(&b, "in")).unwrap();
    graph.connect(&PortRef::output(&b, "out"), &PortRef::input(&c, "in")).unwrap();

    let text = serde_json::to_string(&graph.serialize_session()).unwrap();
    let mut fresh = NodeGraph::with_registry(graph.registry().clone());
    let doc = serde_json::from_str(&text).unwrap();
    let ids = fresh.deserialize(&doc, DeserializeOptions::default()).unwrap();

    assert_eq!(ids.len(), 3);
    assert_eq!(fresh.model().connections().len(), 2);
    for original in graph.model().nodes() {
        let copy = fresh.get_node_by_name(&original.name).unwrap();
        assert_eq!(copy.type_id, original.type_id);
        let mut expected = original.properties();
        let mut actual = copy.properties();
        expected.shift_remove("id");
        actual.shift_remove("id");
        assert_eq!(actual, expected, "properties of {}", original.name);
    }
    assert!(fresh.model().is_consistent());
}

#[test]
fn undo_create_and_connect_restores_empty_graph() {
    let mut graph = editor();
    let empty = graph.serialize_session();

    graph.begin_undo("create node");
    let a = create(&mut graph, BASIC_B);
    let b = create(&mut graph, BASIC_B);
    graph.end_undo().unwrap();
    graph.connect(&PortRef::output(&a, "out"), &PortRef::input(&b, "in")).unwrap();

    graph.undo().unwrap();
    graph.undo().unwrap();
    assert_eq!(graph.serialize_session(), empty);
    assert!(matches!(graph.undo(), Err(GraphError::NothingToUndo)));
}

#[test]
fn duplicate_registration_keeps_original() {
    let registry = NodeRegistry::shared();
    let mut graph = NodeGraph::with_registry(registry.clone());
    assert!(graph.register_node("demo.Node", "Node", || Node::new("demo.Node", "first")));
    assert!(!graph.register_node("demo.Node", "Node", || Node::new("demo.Node", "second")));

    let id = create(&mut graph, "demo.Node");
    assert_eq!(graph.node(&id).unwrap().name, "first");
    assert_eq!(registry.read().len(), 1);
}

#[test]
fn delete_nodes_drops_connections_and_undoes() {
    let mut graph = editor();
    let a = create(&mut graph, BASIC_B);
    let b = create(&mut graph, COUNTER);
    let c = create(&mut graph, BASIC_B);
    graph.connect(&PortRef::output(&a, "out"), &PortRef::input(&b, "in")).unwrap();
    graph.connect(&PortRef::output(&b, "out"), &PortRef::input(&c, "in")).unwrap();
    graph.set_port_locked(&PortRef::output(&b, "out"), true, false).unwrap();

    graph.delete_nodes(&[b.clone()]).unwrap();
    assert_eq!(graph.model().node_count(), 2);
    assert!(graph.model().connections().is_empty());
    assert_eq!(graph.undo_stack().undo_text(), Some("delete node: 'counter'"));

    graph.undo().unwrap();
    let restored = graph.node(&b).unwrap();
    assert_eq!(restored.get_property(COUNTER_PROPERTY), Some(1.into()));
    assert!(restored.output("out").unwrap().locked);
    assert_eq!(graph.model().connections().len(), 2);
    assert!(graph.model().is_consistent());
}

#[test]
fn observers_receive_events_in_order() {
    let mut graph = editor();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    graph.add_observer(move |event: &GraphEvent| sink.borrow_mut().push(event.clone()));

    let a = create(&mut graph, BASIC_B);
    let b = create(&mut graph, BASIC_B);
    graph.connect(&PortRef::output(&a, "out"), &PortRef::input(&b, "in")).unwrap();
    graph.delete_nodes(&[a.clone()]).unwrap();

    let events = events.borrow();
    let created = events
        .iter()
        .filter(|e| matches!(e, GraphEvent::NodeCreated(_)))
        .count();
    assert_eq!(created, 2);
    let connected = events
        .iter()
        .position(|e| matches!(e, GraphEvent::PortConnected { .. }))
        .unwrap();
    let disconnected = events
        .iter()
        .position(|e| matches!(e, GraphEvent::PortDisconnected { .. }))
        .unwrap();
    assert!(connected < disconnected);
    assert!(matches!(events.last(), Some(GraphEvent::NodesDeleted(ids)) if ids == &vec![a.clone()]));
}

#[test]
fn session_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");

    let mut graph = editor();
    let a = create(&mut graph, BASIC_A);
    let b = create(&mut graph, BASIC_B);
    graph.connect(&PortRef::output(&a, "out B"), &PortRef::input(&b, "in")).unwrap();
    graph.save_session(&path).unwrap();

    let mut loaded = editor();
    create(&mut loaded, COUNTER);
    loaded.load_session(&path).unwrap();
    assert_eq!(loaded.model().node_count(), 2);
    assert_eq!(loaded.model().session(), Some(path.as_path()));
    let connection = &loaded.model().connections()[0];
    assert_eq!(connection.output.name, "out B");
    assert_eq!(connection.input.name, "in");
}

#[test]
fn auto_layout_is_one_undo_step() {
    let mut graph = editor();
    let ids: Vec<NodeId> = (0..4).map(|_| create(&mut graph, BASIC_B)).collect();
    for pair in ids.windows(2) {
        graph
            .connect(&PortRef::output(&pair[0], "out"), &PortRef::input(&pair[1], "in"))
            .unwrap();
    }
    let before = graph.serialize_session();
    graph.auto_layout_nodes(None, true, &[]).unwrap();

    let xs: Vec<f64> = ids.iter().map(|id| graph.node(id).unwrap().position[0]).collect();
    assert!(xs.windows(2).all(|w| w[0] < w[1]));
    graph.undo().unwrap();
    assert_eq!(graph.serialize_session(), before);
}
