// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph model owning the nodes, global settings, the common property schema
//! and the connection constraint tables.

use crate::connection::Connection;
use crate::constraint::ConnectionConstraints;
use crate::node::{LayoutDirection, Node, NodeId};
use crate::port::{Port, PortDirection, PortRef};
use crate::property::PropertyMeta;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// How connection pipes are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipeStyle {
    /// Bezier curves
    #[default]
    Curved,
    /// Straight lines
    Straight,
    /// Right-angled segments
    Angle,
}

/// Graph-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSettings {
    /// Reject connections that would close a cycle
    pub acyclic: bool,
    /// Default node layout direction
    pub layout_direction: LayoutDirection,
    /// Pipe drawing style
    pub pipe_style: PipeStyle,
    /// Connect by dropping a node onto a pipe
    pub pipe_collision: bool,
    /// Cut pipes with a slicer gesture
    pub pipe_slicing: bool,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            acyclic: true,
            layout_direction: LayoutDirection::Horizontal,
            pipe_style: PipeStyle::Curved,
            pipe_collision: false,
            pipe_slicing: true,
        }
    }
}

/// Node graph data model
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    nodes: IndexMap<NodeId, Node>,
    common_properties: IndexMap<String, IndexMap<String, PropertyMeta>>,
    accept: ConnectionConstraints,
    reject: ConnectionConstraints,
    settings: GraphSettings,
    session: Option<PathBuf>,
}

impl GraphModel {
    /// Create an empty model with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty model with the given settings
    pub fn with_settings(settings: GraphSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Graph-wide settings
    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    pub(crate) fn settings_mut(&mut self) -> &mut GraphSettings {
        &mut self.settings
    }

    /// Path of the current session file, if any
    pub fn session(&self) -> Option<&Path> {
        self.session.as_deref()
    }

    pub(crate) fn set_session(&mut self, session: Option<PathBuf>) {
        self.session = session;
    }

    /// Get a node by ID
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub(crate) fn node_mut(&mut self, node_id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node_id)
    }

    /// Get all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no node
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the node belongs to the graph
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Position of a node in insertion order
    pub fn index_of(&self, node_id: &NodeId) -> Option<usize> {
        self.nodes.get_index_of(node_id)
    }

    /// Resolve a port reference
    pub fn port(&self, port: &PortRef) -> Option<&Port> {
        self.nodes.get(&port.node)?.port(port.direction, &port.name)
    }

    pub(crate) fn port_mut(&mut self, port: &PortRef) -> Option<&mut Port> {
        self.nodes.get_mut(&port.node)?.port_mut(port.direction, &port.name)
    }

    /// Insert a node at `index` (clamped), merging its property metadata
    /// into the common schema
    pub(crate) fn insert_node(&mut self, index: Option<usize>, node: Node) {
        self.register_common_properties(&node.type_id, node.property_meta());
        let index = index.unwrap_or(self.nodes.len()).min(self.nodes.len());
        self.nodes.shift_insert(index, node.id.clone(), node);
    }

    /// Remove a node, returning its former index
    pub(crate) fn remove_node(&mut self, node_id: &NodeId) -> Option<(usize, Node)> {
        self.nodes
            .shift_remove_full(node_id)
            .map(|(index, _, node)| (index, node))
    }

    pub(crate) fn clear_nodes(&mut self) {
        self.nodes.clear();
    }

    /// Merge property metadata into the schema of `type_id`.
    ///
    /// The first registration of a type is stored whole; later ones add
    /// missing properties and overwrite the fields they set.
    pub fn register_common_properties(&mut self, type_id: &str, meta: &IndexMap<String, PropertyMeta>) {
        let schema = self
            .common_properties
            .entry(type_id.to_string())
            .or_insert_with(Node::builtin_meta);
        for (name, attrs) in meta {
            match schema.get_mut(name) {
                Some(existing) => existing.merge(attrs),
                None => {
                    schema.insert(name.clone(), attrs.clone());
                }
            }
        }
    }

    /// Property schema of one node type
    pub fn common_properties(&self, type_id: &str) -> Option<&IndexMap<String, PropertyMeta>> {
        self.common_properties.get(type_id)
    }

    /// Accepted connection rules
    pub fn accept_constraints(&self) -> &ConnectionConstraints {
        &self.accept
    }

    /// Rejected connection rules
    pub fn reject_constraints(&self) -> &ConnectionConstraints {
        &self.reject
    }

    pub(crate) fn accept_constraints_mut(&mut self) -> &mut ConnectionConstraints {
        &mut self.accept
    }

    pub(crate) fn reject_constraints_mut(&mut self) -> &mut ConnectionConstraints {
        &mut self.reject
    }

    /// Every connection in the graph, once per (input, output) pair
    pub fn connections(&self) -> Vec<Connection> {
        self.connections_among(self.nodes.keys())
    }

    /// Connections touching any of `node_ids`, once per (input, output) pair
    pub fn connections_among<'a>(&self, node_ids: impl IntoIterator<Item = &'a NodeId>) -> Vec<Connection> {
        let mut seen = IndexSet::new();
        for node_id in node_ids {
            let Some(node) = self.nodes.get(node_id) else {
                continue;
            };
            for port in node.all_ports() {
                for peer in port.peer_refs() {
                    let connection = match port.direction {
                        PortDirection::In => Connection::new(port.port_ref(), peer),
                        PortDirection::Out => Connection::new(peer, port.port_ref()),
                    };
                    seen.insert(connection);
                }
            }
        }
        seen.into_iter().collect()
    }

    /// Nodes feeding the inputs of `node_id`
    pub fn upstream_nodes(&self, node_id: &NodeId) -> Vec<NodeId> {
        self.neighbours(node_id, PortDirection::In)
    }

    /// Nodes fed by the outputs of `node_id`
    pub fn downstream_nodes(&self, node_id: &NodeId) -> Vec<NodeId> {
        self.neighbours(node_id, PortDirection::Out)
    }

    fn neighbours(&self, node_id: &NodeId, direction: PortDirection) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(node_id) else {
            return Vec::new();
        };
        let mut found = IndexSet::new();
        for port in node.ports(direction).values() {
            found.extend(port.peers().keys().cloned());
        }
        found.into_iter().collect()
    }

    /// Whether `from` reaches `to` following output -> input edges
    pub fn reaches(&self, from: &NodeId, to: &NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![from.clone()];
        while let Some(current) = stack.pop() {
            if &current == to {
                return true;
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            stack.extend(self.downstream_nodes(&current));
        }
        false
    }

    /// Whether adding the edge `output_node -> input_node` closes a cycle.
    /// A self-loop counts.
    pub fn would_create_cycle(&self, output_node: &NodeId, input_node: &NodeId) -> bool {
        output_node == input_node || self.reaches(input_node, output_node)
    }

    /// Whether the output -> input edge graph holds a cycle
    pub fn has_cycle(&self) -> bool {
        self.nodes.keys().any(|id| {
            self.downstream_nodes(id)
                .iter()
                .any(|next| self.reaches(next, id))
        })
    }

    /// Check the structural invariants: ports belong to their node, peers
    /// exist and are mirrored, and single-connection ports hold one peer at
    /// most.
    pub fn is_consistent(&self) -> bool {
        self.nodes.iter().all(|(id, node)| {
            &node.id == id
                && node.all_ports().all(|port| {
                    &port.node == id
                        && (port.multi_connection || port.peer_count() <= 1)
                        && port.peer_refs().iter().all(|peer| {
                            self.port(peer)
                                .is_some_and(|p| p.is_connected_to(id, &port.name))
                        })
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(model: &mut GraphModel, count: usize) -> Vec<NodeId> {
        let ids: Vec<NodeId> = (0..count)
            .map(|i| {
                let node = Node::new("test.Chain", format!("n{i}"))
                    .with_input("in")
                    .with_output("out");
                let id = node.id.clone();
                model.insert_node(None, node);
                id
            })
            .collect();
        for pair in ids.windows(2) {
            model
                .port_mut(&PortRef::output(&pair[0], "out"))
                .unwrap()
                .add_peer(&pair[1], "in");
            model
                .port_mut(&PortRef::input(&pair[1], "in"))
                .unwrap()
                .add_peer(&pair[0], "out");
        }
        ids
    }

    #[test]
    fn test_default_settings() {
        let settings = GraphSettings::default();
        assert!(settings.acyclic);
        assert!(settings.pipe_slicing);
        assert!(!settings.pipe_collision);
        assert_eq!(settings.pipe_style, PipeStyle::Curved);
    }

    #[test]
    fn test_connections_are_deduplicated() {
        let mut model = GraphModel::new();
        let ids = chain(&mut model, 3);
        let connections = model.connections();
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[0].input, PortRef::input(&ids[1], "in"));
        assert!(model.is_consistent());
    }

    #[test]
    fn test_reachability() {
        let mut model = GraphModel::new();
        let ids = chain(&mut model, 3);
        assert!(model.reaches(&ids[0], &ids[2]));
        assert!(!model.reaches(&ids[2], &ids[0]));
        assert!(model.would_create_cycle(&ids[2], &ids[0]));
        assert!(model.would_create_cycle(&ids[1], &ids[1]));
        assert!(!model.would_create_cycle(&ids[0], &ids[2]));
        assert!(!model.has_cycle());
        assert_eq!(model.upstream_nodes(&ids[1]), vec![ids[0].clone()]);
        assert_eq!(model.downstream_nodes(&ids[1]), vec![ids[2].clone()]);
    }

    #[test]
    fn test_insert_and_remove_keep_order() {
        let mut model = GraphModel::new();
        let ids = chain(&mut model, 3);
        let (index, node) = model.remove_node(&ids[1]).unwrap();
        assert_eq!(index, 1);
        model.insert_node(Some(index), node);
        assert_eq!(model.node_ids().cloned().collect::<Vec<_>>(), ids);
    }

    #[test]
    fn test_asymmetric_peers_are_inconsistent() {
        let mut model = GraphModel::new();
        let ids = chain(&mut model, 2);
        model
            .port_mut(&PortRef::input(&ids[1], "in"))
            .unwrap()
            .remove_peer(&ids[0], "out");
        assert!(!model.is_consistent());
    }

    #[test]
    fn test_common_property_merge() {
        use crate::property::WidgetType;

        let mut model = GraphModel::new();
        let mut first = IndexMap::new();
        first.insert(
            "mode".to_string(),
            PropertyMeta::new(WidgetType::ComboBox).with_items(["a", "b"]),
        );
        model.register_common_properties("test.Chain", &first);

        let mut second = IndexMap::new();
        second.insert("mode".to_string(), PropertyMeta::new(WidgetType::ComboBox).with_tab("Modes"));
        second.insert("gain".to_string(), PropertyMeta::new(WidgetType::Slider));
        model.register_common_properties("test.Chain", &second);

        let schema = model.common_properties("test.Chain").unwrap();
        assert_eq!(schema["mode"].items.len(), 2);
        assert_eq!(schema["mode"].tab.as_deref(), Some("Modes"));
        assert!(schema.contains_key("gain"));
        assert!(schema.contains_key("name"));
    }
}
