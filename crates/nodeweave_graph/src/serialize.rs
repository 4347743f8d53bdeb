// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session document and (de)serialization of node sets.
//!
//! Layout of a document:
//!
//! ```json
//! {
//!   "graph": { "layout_direction": "horizontal", "acyclic": true, ... },
//!   "nodes": { "<id>": { "type_id": "...", "name": "...", "custom": {} } },
//!   "connections": [ { "in": ["<id>", "in"], "out": ["<id>", "out"] } ]
//! }
//! ```

use crate::command::Command;
use crate::constraint::ConnectionConstraints;
use crate::error::Result;
use crate::graph::PipeStyle;
use crate::node::{LayoutDirection, Node, NodeId};
use crate::node_graph::NodeGraph;
use crate::port::{Port, PortDirection, PortRef, PortSpec};
use crate::property::{PropertyMeta, PropertyValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A serialized graph or node set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    /// Graph settings
    #[serde(default)]
    pub graph: GraphDocument,
    /// Nodes keyed by id
    #[serde(default)]
    pub nodes: IndexMap<NodeId, NodeDocument>,
    /// Connections, once per (input, output) pair
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<ConnectionDocument>,
}

/// Serialized graph settings; absent keys leave the graph untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Default node layout direction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_direction: Option<LayoutDirection>,
    /// Acyclic mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acyclic: Option<bool>,
    /// Pipe collision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipe_collision: Option<bool>,
    /// Pipe slicing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipe_slicing: Option<bool>,
    /// Pipe style
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipe_style: Option<PipeStyle>,
    /// Accept table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_connection_types: Option<ConnectionConstraints>,
    /// Reject table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_connection_types: Option<ConnectionConstraints>,
}

/// Serialized port declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDocument {
    /// Port name
    pub name: String,
    /// Multi-connection flag
    #[serde(default)]
    pub multi_connection: bool,
    /// Show the port label
    #[serde(default = "default_true")]
    pub display_name: bool,
}

fn default_true() -> bool {
    true
}

impl From<&Port> for PortDocument {
    fn from(port: &Port) -> Self {
        Self {
            name: port.name.clone(),
            multi_connection: port.multi_connection,
            display_name: port.display_name,
        }
    }
}

impl From<&PortDocument> for PortSpec {
    fn from(doc: &PortDocument) -> Self {
        PortSpec::new(doc.name.clone())
            .multi(doc.multi_connection)
            .display_name(doc.display_name)
    }
}

/// Serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDocument {
    /// Registered type identifier
    pub type_id: String,
    /// Node name
    pub name: String,
    /// Border color
    pub color: [u8; 4],
    /// Label color
    pub text_color: [u8; 4],
    /// Disabled flag
    pub disabled: bool,
    /// Selected flag
    pub selected: bool,
    /// Visible flag
    pub visible: bool,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
    /// Position
    pub pos: [f64; 2],
    /// Port flow direction
    pub layout_direction: LayoutDirection,
    /// Whether ports may change
    pub port_deletion_allowed: bool,
    /// Input declarations, only for nodes with dynamic ports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_ports: Option<Vec<PortDocument>>,
    /// Output declarations, only for nodes with dynamic ports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_ports: Option<Vec<PortDocument>>,
    /// Custom property values
    pub custom: IndexMap<String, PropertyValue>,
}

impl Default for NodeDocument {
    fn default() -> Self {
        Self::from(&Node::new(String::new(), "node"))
    }
}

impl From<&Node> for NodeDocument {
    fn from(node: &Node) -> Self {
        let ports = |direction| {
            node.port_deletion_allowed.then(|| {
                node.ports(direction)
                    .values()
                    .map(PortDocument::from)
                    .collect::<Vec<_>>()
            })
        };
        Self {
            type_id: node.type_id.clone(),
            name: node.name.clone(),
            color: node.color,
            text_color: node.text_color,
            disabled: node.disabled,
            selected: node.selected,
            visible: node.visible,
            width: node.size[0],
            height: node.size[1],
            pos: node.position,
            layout_direction: node.layout_direction,
            port_deletion_allowed: node.port_deletion_allowed,
            input_ports: ports(PortDirection::In),
            output_ports: ports(PortDirection::Out),
            custom: node.custom_properties().clone(),
        }
    }
}

impl NodeDocument {
    /// Copy the serialized state onto a node built by the registry
    fn restore(&self, node: &mut Node) {
        node.name = self.name.clone();
        node.color = self.color;
        node.text_color = self.text_color;
        node.disabled = self.disabled;
        node.selected = self.selected;
        node.visible = self.visible;
        node.size = [self.width, self.height];
        node.position = self.pos;
        node.layout_direction = self.layout_direction;
        node.port_deletion_allowed = self.port_deletion_allowed;

        for (name, value) in &self.custom {
            let result = if node.is_custom_property(name) {
                node.set_property(name, value.clone())
            } else {
                node.add_property(name, value.clone(), PropertyMeta::default())
            };
            if let Err(e) = result {
                tracing::warn!("{}: skipped property '{}': {}", self.type_id, name, e);
            }
        }

        if self.port_deletion_allowed {
            let id = node.id.clone();
            for (direction, ports) in [
                (PortDirection::In, &self.input_ports),
                (PortDirection::Out, &self.output_ports),
            ] {
                let Some(ports) = ports else {
                    continue;
                };
                let rebuilt: IndexMap<String, Port> = ports
                    .iter()
                    .map(|doc| (doc.name.clone(), PortSpec::from(doc).build(id.clone(), direction)))
                    .collect();
                *node.ports_mut(direction) = rebuilt;
            }
        }
    }
}

/// One serialized connection, `[node id, port name]` on each side
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionDocument {
    /// Input side
    #[serde(rename = "in")]
    pub input: (NodeId, String),
    /// Output side
    #[serde(rename = "out")]
    pub output: (NodeId, String),
}

/// Options for [`NodeGraph::deserialize`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeserializeOptions {
    /// Move the top-left corner of the imported nodes here
    pub position: Option<[f64; 2]>,
}

impl NodeGraph {
    fn graph_document(&self) -> GraphDocument {
        let settings = self.model.settings();
        GraphDocument {
            layout_direction: Some(settings.layout_direction),
            acyclic: Some(settings.acyclic),
            pipe_collision: Some(settings.pipe_collision),
            pipe_slicing: Some(settings.pipe_slicing),
            pipe_style: Some(settings.pipe_style),
            accept_connection_types: Some(self.model.accept_constraints().clone()),
            reject_connection_types: Some(self.model.reject_constraints().clone()),
        }
    }

    /// Serialize the given nodes, their connections and the graph settings.
    ///
    /// Connections to nodes outside the set are kept so a paste can
    /// reconnect to them.
    pub fn serialize_nodes(&self, node_ids: &[NodeId]) -> SessionDocument {
        let nodes = node_ids
            .iter()
            .filter_map(|id| self.model.node(id))
            .map(|node| (node.id.clone(), NodeDocument::from(node)))
            .collect();
        let connections = self
            .model
            .connections_among(node_ids)
            .into_iter()
            .map(|c| ConnectionDocument {
                input: (c.input.node, c.input.name),
                output: (c.output.node, c.output.name),
            })
            .collect();
        SessionDocument {
            graph: self.graph_document(),
            nodes,
            connections,
        }
    }

    fn apply_graph_document(&mut self, doc: &GraphDocument) {
        if let Some(direction) = doc.layout_direction {
            self.set_layout_direction(direction);
        }
        let settings = self.model.settings_mut();
        if let Some(acyclic) = doc.acyclic {
            settings.acyclic = acyclic;
        }
        if let Some(collision) = doc.pipe_collision {
            settings.pipe_collision = collision;
        }
        if let Some(slicing) = doc.pipe_slicing {
            settings.pipe_slicing = slicing;
        }
        if let Some(style) = doc.pipe_style {
            settings.pipe_style = style;
        }
        if let Some(accept) = &doc.accept_connection_types {
            self.model.accept_constraints_mut().merge(accept);
        }
        if let Some(reject) = &doc.reject_connection_types {
            self.model.reject_constraints_mut().merge(reject);
        }
    }

    /// Import a document into the graph as one undo step.
    ///
    /// Unknown node types are skipped. Connections resolve against the new
    /// nodes first, then the nodes already in the graph. Returns the ids of
    /// the new nodes in document order.
    pub fn deserialize(&mut self, doc: &SessionDocument, options: DeserializeOptions) -> Result<Vec<NodeId>> {
        // Graph settings are not part of the undo history, same as the
        // `set_acyclic` family of setters.
        self.apply_graph_document(&doc.graph);
        self.with_macro("import nodes", |graph| {
            let mut created: IndexMap<NodeId, NodeId> = IndexMap::new();
            for (old_id, data) in &doc.nodes {
                let Some(mut node) = graph.registry.read().create(&data.type_id) else {
                    tracing::warn!("skipped node '{}', unknown type '{}'", data.name, data.type_id);
                    continue;
                };
                data.restore(&mut node);
                let new_id = graph.add_node(node, Some(data.pos), data.selected)?;
                created.insert(old_id.clone(), new_id);
            }

            for connection in &doc.connections {
                graph.restore_connection(connection, &created)?;
            }

            if let Some(target) = options.position {
                let ids: Vec<NodeId> = created.values().cloned().collect();
                graph.move_to(&ids, target)?;
            }
            Ok(created.into_values().collect())
        })
    }

    fn restore_connection(&mut self, doc: &ConnectionDocument, created: &IndexMap<NodeId, NodeId>) -> Result<()> {
        let resolve = |id: &NodeId| {
            created
                .get(id)
                .cloned()
                .or_else(|| self.model.contains(id).then(|| id.clone()))
        };
        let (Some(input_node), Some(output_node)) = (resolve(&doc.input.0), resolve(&doc.output.0)) else {
            return Ok(());
        };
        let input = PortRef::input(&input_node, doc.input.1.clone());
        let output = PortRef::output(&output_node, doc.output.1.clone());
        let (Some(in_port), Some(out_port)) = (self.model.port(&input), self.model.port(&output)) else {
            tracing::debug!("skipped connection {} -> {}, missing port", output, input);
            return Ok(());
        };

        let free = |port: &Port| !port.is_connected() || port.multi_connection;
        let linked = in_port.is_connected_to(&output.node, &output.name);
        let cyclic = self.model.settings().acyclic && self.model.would_create_cycle(&output.node, &input.node);
        if !linked && free(in_port) && free(out_port) && !cyclic {
            self.push(Command::Connect {
                output: output.clone(),
                input: input.clone(),
            })?;
        }
        self.push(Command::InputConnected { input, output })
    }

    /// Translate nodes so the top-left of their bounding box is `target`
    fn move_to(&mut self, node_ids: &[NodeId], target: [f64; 2]) -> Result<()> {
        let mut corner: Option<[f64; 2]> = None;
        for id in node_ids {
            let [x, y] = self.require_node(id)?.position;
            corner = Some(match corner {
                Some([cx, cy]) => [cx.min(x), cy.min(y)],
                None => [x, y],
            });
        }
        let Some([cx, cy]) = corner else {
            return Ok(());
        };
        for id in node_ids {
            let [x, y] = self.require_node(id)?.position;
            self.set_node_position(id, [x - cx + target[0], y - cy + target[1]])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_graph::CreateNodeOptions;
    use crate::property::WidgetType;

    fn graph() -> NodeGraph {
        let graph = NodeGraph::new();
        graph.register_node("test.Source", "Source", || {
            Node::new("test.Source", "source")
                .with_output("out")
                .with_property("gain", 0.5, PropertyMeta::new(WidgetType::DoubleSpinBox))
        });
        graph.register_node("test.Sink", "Sink", || {
            Node::new("test.Sink", "sink")
                .with_port_deletion()
                .with_input(PortSpec::new("in").multi(true))
        });
        graph
    }

    #[test]
    fn test_document_shape() {
        let mut graph = graph();
        let a = graph.create_node("test.Source", CreateNodeOptions::new()).unwrap();
        let b = graph.create_node("test.Sink", CreateNodeOptions::new()).unwrap();
        graph.connect(&PortRef::output(&a, "out"), &PortRef::input(&b, "in")).unwrap();

        let doc = graph.serialize_nodes(&[a.clone(), b.clone()]);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["graph"]["acyclic"], true);
        assert_eq!(json["nodes"][a.as_str()]["custom"]["gain"], 0.5);
        assert!(json["nodes"][a.as_str()].get("input_ports").is_none());
        assert_eq!(json["nodes"][b.as_str()]["input_ports"][0]["name"], "in");
        assert_eq!(json["connections"][0]["in"][0], b.as_str());
        assert_eq!(json["connections"][0]["out"][1], "out");

        let lone = graph.serialize_nodes(&[]);
        assert!(serde_json::to_value(&lone).unwrap().get("connections").is_none());
    }

    #[test]
    fn test_undo_import_keeps_graph_settings() {
        let mut source = graph();
        source.set_acyclic(false);
        source.create_node("test.Source", CreateNodeOptions::new()).unwrap();
        let doc = source.serialize_session();

        let mut graph = NodeGraph::with_registry(source.registry().clone());
        graph.deserialize(&doc, DeserializeOptions::default()).unwrap();
        assert!(!graph.settings().acyclic);
        assert_eq!(graph.model().node_count(), 1);

        graph.undo().unwrap();
        assert!(graph.model().is_empty());
        assert!(!graph.settings().acyclic);
    }

    #[test]
    fn test_deserialize_skips_unknown_types() {
        let mut graph = graph();
        let json = r#"{
            "graph": {"acyclic": false, "future_setting": 3},
            "nodes": {
                "n1": {"type_id": "test.Source", "name": "one", "pos": [10.0, 20.0], "custom": {"gain": 0.9, "extra": "x"}},
                "n2": {"type_id": "test.Unknown", "name": "two"}
            },
            "connections": [{"in": ["n2", "in"], "out": ["n1", "out"]}]
        }"#;
        let doc: SessionDocument = serde_json::from_str(json).unwrap();
        let ids = graph.deserialize(&doc, DeserializeOptions::default()).unwrap();

        assert_eq!(ids.len(), 1);
        assert!(!graph.settings().acyclic);
        let node = graph.node(&ids[0]).unwrap();
        assert_eq!(node.name, "one");
        assert_eq!(node.position, [10.0, 20.0]);
        assert_eq!(node.get_property("gain"), Some(0.9.into()));
        assert_eq!(node.get_property("extra"), Some("x".into()));
        assert!(graph.model().connections().is_empty());
        assert_eq!(graph.undo_stack().undo_text(), Some("import nodes"));
    }

    #[test]
    fn test_dynamic_ports_and_position() {
        let mut graph = graph();
        let b = graph.create_node("test.Sink", CreateNodeOptions::new().at(40.0, 60.0)).unwrap();
        graph.add_input(&b, "extra").unwrap();
        let doc = graph.serialize_nodes(&[b]);

        let mut other = NodeGraph::with_registry(graph.registry().clone());
        let ids = other
            .deserialize(&doc, DeserializeOptions { position: Some([0.0, 0.0]) })
            .unwrap();
        let node = other.node(&ids[0]).unwrap();
        assert_eq!(node.position, [0.0, 0.0]);
        assert_eq!(node.inputs().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["in", "extra"]);
    }
}
