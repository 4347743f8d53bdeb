// SPDX-License-Identifier: MIT OR Apache-2.0
//! The editing controller.
//!
//! [`NodeGraph`] is the single writer of a [`GraphModel`]. Every intent goes
//! through it, is recorded on its [`UndoStack`] as commands, and produces
//! [`GraphEvent`]s that are delivered to observers once the call returns.

use crate::command::{Command, CommandContext};
use crate::error::{GraphError, Result};
use crate::event::{GraphEvent, GraphObserver};
use crate::graph::{GraphModel, GraphSettings, PipeStyle};
use crate::node::{LayoutDirection, Node, NodeId};
use crate::port::{PortDirection, PortRef, PortSpec};
use crate::property::PropertyValue;
use crate::registry::{NodeHooks, NodeRegistry, SharedRegistry};
use crate::undo::UndoStack;
use std::fmt;

/// Options for [`NodeGraph::create_node`]
#[derive(Debug, Clone, PartialEq)]
pub struct CreateNodeOptions {
    /// Node name; the constructor's name when `None`. Made unique.
    pub name: Option<String>,
    /// Select the new node and deselect the others
    pub selected: bool,
    /// Initial position
    pub position: Option<[f64; 2]>,
    /// Label color
    pub text_color: Option<[u8; 4]>,
}

impl Default for CreateNodeOptions {
    fn default() -> Self {
        Self {
            name: None,
            selected: true,
            position: None,
            text_color: None,
        }
    }
}

impl CreateNodeOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the position
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some([x, y]);
        self
    }

    /// Set the selection state
    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Set the label color
    pub fn text_color(mut self, color: [u8; 4]) -> Self {
        self.text_color = Some(color);
        self
    }
}

/// Node graph editor core
pub struct NodeGraph {
    pub(crate) model: GraphModel,
    pub(crate) registry: SharedRegistry,
    pub(crate) undo_stack: UndoStack,
    observers: Vec<Box<dyn GraphObserver>>,
    pending_events: Vec<GraphEvent>,
}

impl NodeGraph {
    /// Create an editor with its own empty registry
    pub fn new() -> Self {
        Self::with_registry(NodeRegistry::shared())
    }

    /// Create an editor using a shared registry
    pub fn with_registry(registry: SharedRegistry) -> Self {
        Self {
            model: GraphModel::new(),
            registry,
            undo_stack: UndoStack::new(),
            observers: Vec::new(),
            pending_events: Vec::new(),
        }
    }

    /// Replace the graph settings
    pub fn with_graph_settings(mut self, settings: GraphSettings) -> Self {
        *self.model.settings_mut() = settings;
        self
    }

    /// Graph data model
    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    /// Graph-wide settings
    pub fn settings(&self) -> &GraphSettings {
        self.model.settings()
    }

    /// Registry used to build nodes
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Undo history
    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo_stack
    }

    /// Get a node by ID
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.model.node(node_id)
    }

    pub(crate) fn require_node(&self, node_id: &NodeId) -> Result<&Node> {
        self.model
            .node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))
    }

    /// Register a node type
    pub fn register_node<F>(&self, type_id: &str, name: &str, constructor: F) -> bool
    where
        F: Fn() -> Node + Send + Sync + 'static,
    {
        self.registry.write().register(type_id, name, constructor)
    }

    /// Register a node type with connection hooks
    pub fn register_node_with_hooks<F, H>(&self, type_id: &str, name: &str, constructor: F, hooks: H) -> bool
    where
        F: Fn() -> Node + Send + Sync + 'static,
        H: NodeHooks + 'static,
    {
        self.registry
            .write()
            .register_with_hooks(type_id, name, constructor, hooks)
    }

    /// Subscribe to graph events
    pub fn add_observer(&mut self, observer: impl GraphObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ---------------------------------------------------------------------
    // Command plumbing

    fn with_context<T>(&mut self, f: impl FnOnce(&mut UndoStack, &mut CommandContext<'_>) -> T) -> T {
        let registry = self.registry.read();
        let mut ctx = CommandContext {
            model: &mut self.model,
            registry: &registry,
            events: &mut self.pending_events,
        };
        f(&mut self.undo_stack, &mut ctx)
    }

    /// Apply and record one command
    pub(crate) fn push(&mut self, command: Command) -> Result<()> {
        self.with_context(|stack, ctx| stack.push(command, ctx))
    }

    /// Run `f` inside one undo macro and deliver the events afterwards.
    /// The macro is closed even when `f` fails.
    pub(crate) fn with_macro<T>(&mut self, label: &str, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.undo_stack.begin(label);
        let result = f(self);
        let closed = self.undo_stack.end();
        self.flush_events();
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Deliver queued events unless a macro is still being recorded
    pub(crate) fn flush_events(&mut self) {
        if self.undo_stack.is_recording() || self.pending_events.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.pending_events);
        for event in &events {
            for observer in &mut self.observers {
                observer.on_event(event);
            }
        }
    }

    pub(crate) fn emit(&mut self, event: GraphEvent) {
        self.pending_events.push(event);
        self.flush_events();
    }

    // ---------------------------------------------------------------------
    // Undo

    /// Undo the last macro
    pub fn undo(&mut self) -> Result<()> {
        let result = self.with_context(|stack, ctx| stack.undo(ctx));
        self.flush_events();
        result
    }

    /// Redo the last undone macro
    pub fn redo(&mut self) -> Result<()> {
        let result = self.with_context(|stack, ctx| stack.redo(ctx));
        self.flush_events();
        result
    }

    /// Open an undo macro; pair with [`NodeGraph::end_undo`]
    pub fn begin_undo(&mut self, label: &str) {
        self.undo_stack.begin(label);
    }

    /// Close the macro opened by [`NodeGraph::begin_undo`]
    pub fn end_undo(&mut self) -> Result<()> {
        let result = self.undo_stack.end();
        self.flush_events();
        result
    }

    /// Drop the undo history
    pub fn clear_undo_stack(&mut self) {
        self.undo_stack.clear();
    }

    /// Set the undo history depth
    pub fn set_undo_limit(&mut self, limit: usize) {
        self.undo_stack.set_max_depth(limit);
    }

    // ---------------------------------------------------------------------
    // Graph settings

    /// Reject connections that would close a cycle
    pub fn set_acyclic(&mut self, acyclic: bool) {
        self.model.settings_mut().acyclic = acyclic;
    }

    /// Set the pipe drawing style
    pub fn set_pipe_style(&mut self, style: PipeStyle) {
        self.model.settings_mut().pipe_style = style;
    }

    /// Enable connecting by dropping a node onto a pipe
    pub fn set_pipe_collision(&mut self, enabled: bool) {
        self.model.settings_mut().pipe_collision = enabled;
    }

    /// Enable cutting pipes with a slicer gesture
    pub fn set_pipe_slicing(&mut self, enabled: bool) {
        self.model.settings_mut().pipe_slicing = enabled;
    }

    /// Set the layout direction of the graph and of every node in it
    pub fn set_layout_direction(&mut self, direction: LayoutDirection) {
        self.model.settings_mut().layout_direction = direction;
        let ids: Vec<NodeId> = self.model.node_ids().cloned().collect();
        for id in ids {
            let Some(node) = self.model.node_mut(&id) else {
                continue;
            };
            if node.layout_direction != direction {
                node.layout_direction = direction;
                self.pending_events.push(GraphEvent::PropertyChanged {
                    node: id,
                    name: "layout_direction".to_string(),
                    value: direction.as_str().into(),
                });
            }
        }
        self.flush_events();
    }

    // ---------------------------------------------------------------------
    // Nodes

    /// Create a node of a registered type.
    ///
    /// Other nodes are deselected when the new one is selected; the whole
    /// change is one undo step.
    pub fn create_node(&mut self, type_id: &str, options: CreateNodeOptions) -> Result<NodeId> {
        let mut node = self
            .registry
            .read()
            .create(type_id)
            .ok_or_else(|| GraphError::UnknownNodeType(type_id.to_string()))?;

        let base_name = options.name.unwrap_or_else(|| node.name.clone());
        node.name = self.get_unique_name(&base_name);
        node.selected = options.selected;
        node.layout_direction = self.model.settings().layout_direction;
        if let Some(position) = options.position {
            node.position = position;
        }
        if let Some(color) = options.text_color {
            node.text_color = color;
        }

        let id = node.id.clone();
        let label = format!("create node: '{}'", node.name);
        let deselect = options.selected;
        self.with_macro(&label, |graph| {
            if deselect {
                for other in graph.selected_nodes() {
                    graph.set_selected(&other, false)?;
                }
            }
            graph.push(Command::AddNode {
                node: Box::new(node),
                index: None,
            })
        })?;
        tracing::debug!("created node {} ({})", id, type_id);
        Ok(id)
    }

    /// Add a node built outside the registry.
    ///
    /// The node gets a unique name, and a fresh id if its id is taken.
    pub fn add_node(&mut self, mut node: Node, position: Option<[f64; 2]>, selected: bool) -> Result<NodeId> {
        if self.model.contains(&node.id) {
            node.assign_id(NodeId::new());
        }
        node.clear_peers();
        node.name = self.get_unique_name(&node.name);
        node.layout_direction = self.model.settings().layout_direction;
        node.selected = selected;
        if let Some(position) = position {
            node.position = position;
        }

        let id = node.id.clone();
        let label = format!("add node: '{}'", node.name);
        self.with_macro(&label, |graph| {
            graph.push(Command::AddNode {
                node: Box::new(node),
                index: None,
            })
        })?;
        Ok(id)
    }

    /// Delete one node after dropping its connections
    pub fn delete_node(&mut self, node_id: &NodeId) -> Result<()> {
        self.delete_nodes(std::slice::from_ref(node_id))
    }

    /// Delete nodes after dropping their connections.
    ///
    /// Locked ports are unlocked first; the whole change is one undo step.
    pub fn delete_nodes(&mut self, node_ids: &[NodeId]) -> Result<()> {
        let label = match node_ids {
            [] => return Ok(()),
            [single] => format!("delete node: '{}'", self.require_node(single)?.name),
            many => format!("deleted '{}' node(s)", many.len()),
        };
        self.remove_nodes_with_label(&label, node_ids)
    }

    /// Remove one node; same as [`NodeGraph::delete_node`] under a
    /// "remove node" undo label
    pub fn remove_node(&mut self, node_id: &NodeId) -> Result<()> {
        let label = format!("remove node: '{}'", self.require_node(node_id)?.name);
        self.remove_nodes_with_label(&label, std::slice::from_ref(node_id))
    }

    pub(crate) fn remove_nodes_with_label(&mut self, label: &str, node_ids: &[NodeId]) -> Result<()> {
        for id in node_ids {
            self.require_node(id)?;
        }
        self.with_macro(label, |graph| {
            graph.detach_nodes(node_ids)?;
            let command = Command::remove_nodes(&graph.model, node_ids)?;
            graph.push(command)
        })
    }

    /// Unlock every port of the nodes and drop all their connections.
    ///
    /// All ports of the set are unlocked before the first disconnect, so
    /// locked links between two nodes of the set never block removal.
    pub(crate) fn detach_nodes(&mut self, node_ids: &[NodeId]) -> Result<()> {
        let mut ports: Vec<(PortRef, bool)> = Vec::new();
        for id in node_ids {
            ports.extend(self.require_node(id)?.all_ports().map(|p| (p.port_ref(), p.locked)));
        }
        for (port, locked) in &ports {
            if *locked {
                self.push(Command::SetPortLocked {
                    port: port.clone(),
                    locked: false,
                })?;
            }
        }
        for (port, _) in &ports {
            self.clear_connections(port)?;
        }
        Ok(())
    }

    /// Disconnect the nodes from everything outside the set.
    ///
    /// Fails with `LockedPort` before changing anything if one of their
    /// ports is locked.
    pub fn extract_nodes(&mut self, node_ids: &[NodeId]) -> Result<()> {
        if node_ids.is_empty() {
            return Ok(());
        }
        let mut outside = Vec::new();
        for id in node_ids {
            for port in self.require_node(id)?.all_ports() {
                if port.locked {
                    return Err(GraphError::LockedPort {
                        node: id.clone(),
                        port: port.name.clone(),
                    });
                }
                for peer in port.peer_refs() {
                    if !node_ids.contains(&peer.node) {
                        outside.push((port.port_ref(), peer));
                    }
                }
            }
        }
        let label = format!("extracted '{}' node(s)", node_ids.len());
        self.with_macro(&label, |graph| {
            for (port, peer) in &outside {
                graph.disconnect(port, peer)?;
            }
            Ok(())
        })
    }

    /// Set a node property.
    ///
    /// An unchanged value records nothing. A new `name` is made unique.
    pub fn set_property(&mut self, node_id: &NodeId, name: &str, value: impl Into<PropertyValue>) -> Result<()> {
        let mut value = value.into();
        let node = self.require_node(node_id)?;
        let old = node
            .get_property(name)
            .ok_or_else(|| GraphError::UnknownProperty(name.to_string()))?;
        if old == value {
            return Ok(());
        }
        if name == "name" {
            let requested = value
                .as_str()
                .ok_or_else(|| GraphError::InvalidPropertyValue(name.to_string()))?;
            value = self.get_unique_name(requested).into();
            if old == value {
                return Ok(());
            }
        }
        self.push(Command::SetProperty {
            node: node_id.clone(),
            name: name.to_string(),
            old,
            new: value,
        })?;
        self.flush_events();
        Ok(())
    }

    /// Move a node
    pub fn set_node_position(&mut self, node_id: &NodeId, position: [f64; 2]) -> Result<()> {
        self.set_property(node_id, "pos", PropertyValue::pair(position))
    }

    /// Offset several nodes as one undo step
    pub fn move_nodes(&mut self, node_ids: &[NodeId], offset: [f64; 2]) -> Result<()> {
        self.with_macro("move nodes", |graph| {
            for id in node_ids {
                let [x, y] = graph.require_node(id)?.position;
                graph.set_node_position(id, [x + offset[0], y + offset[1]])?;
            }
            Ok(())
        })
    }

    /// Record the size the view realized for a node; not undoable
    pub fn set_node_size(&mut self, node_id: &NodeId, size: [f64; 2]) -> Result<()> {
        let node = self
            .model
            .node_mut(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))?;
        node.size = size;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Selection

    /// Selected nodes in graph order
    pub fn selected_nodes(&self) -> Vec<NodeId> {
        self.model
            .nodes()
            .filter(|n| n.selected)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Select or deselect one node
    pub fn set_selected(&mut self, node_id: &NodeId, selected: bool) -> Result<()> {
        self.set_property(node_id, "selected", selected)
    }

    fn select_where(&mut self, label: &str, select: impl Fn(&Node) -> bool) -> Result<()> {
        let targets: Vec<(NodeId, bool)> = self
            .model
            .nodes()
            .map(|n| (n.id.clone(), select(n)))
            .collect();
        self.with_macro(label, |graph| {
            for (id, selected) in &targets {
                graph.set_selected(id, *selected)?;
            }
            Ok(())
        })
    }

    /// Select exactly the given nodes
    pub fn select_nodes(&mut self, node_ids: &[NodeId]) -> Result<()> {
        self.select_where("select nodes", |n| node_ids.contains(&n.id))
    }

    /// Select every node
    pub fn select_all(&mut self) -> Result<()> {
        self.select_where("select all", |_| true)
    }

    /// Deselect every node
    pub fn clear_selection(&mut self) -> Result<()> {
        self.select_where("clear selection", |_| false)
    }

    /// Invert the selection; selects everything when nothing is selected
    pub fn invert_selection(&mut self) -> Result<()> {
        if self.selected_nodes().is_empty() {
            return self.select_all();
        }
        self.select_where("invert selection", |n| !n.selected)
    }

    /// Disable or enable nodes; `None` toggles each node
    pub fn disable_nodes(&mut self, node_ids: &[NodeId], mode: Option<bool>) -> Result<()> {
        let mut states = Vec::with_capacity(node_ids.len());
        for id in node_ids {
            states.push((id.clone(), self.require_node(id)?.disabled));
        }
        let label = match mode {
            Some(true) => format!("disable ({}) nodes", states.len()),
            Some(false) => format!("enable ({}) nodes", states.len()),
            None => {
                let enabling = states.iter().filter(|(_, disabled)| *disabled).count();
                let disabling = states.len() - enabling;
                let mut parts = Vec::new();
                if enabling > 0 {
                    parts.push(format!("enabled ({enabling})"));
                }
                if disabling > 0 {
                    parts.push(format!("disabled ({disabling})"));
                }
                format!("{} nodes", parts.join(" / "))
            }
        };
        self.with_macro(&label, |graph| {
            for (id, disabled) in &states {
                graph.set_property(id, "disabled", mode.unwrap_or(!disabled))?;
            }
            Ok(())
        })
    }

    // ---------------------------------------------------------------------
    // Dynamic ports

    fn require_port_deletion(&self, node_id: &NodeId) -> Result<()> {
        if self.require_node(node_id)?.port_deletion_allowed {
            Ok(())
        } else {
            Err(GraphError::PortDeletionNotAllowed(node_id.clone()))
        }
    }

    fn add_port(&mut self, node_id: &NodeId, direction: PortDirection, spec: PortSpec) -> Result<PortRef> {
        self.require_port_deletion(node_id)?;
        let node = self.require_node(node_id)?;
        if node.port(direction, &spec.name).is_some() {
            return Err(GraphError::DuplicateProperty(spec.name));
        }
        let index = node.ports(direction).len();
        let port = spec.build(node_id.clone(), direction);
        let port_ref = port.port_ref();
        self.push(Command::AddPort {
            port: Box::new(port),
            index,
        })?;
        self.flush_events();
        Ok(port_ref)
    }

    /// Add an input port to a node that allows port changes
    pub fn add_input(&mut self, node_id: &NodeId, spec: impl Into<PortSpec>) -> Result<PortRef> {
        self.add_port(node_id, PortDirection::In, spec.into())
    }

    /// Add an output port to a node that allows port changes
    pub fn add_output(&mut self, node_id: &NodeId, spec: impl Into<PortSpec>) -> Result<PortRef> {
        self.add_port(node_id, PortDirection::Out, spec.into())
    }

    fn delete_port(&mut self, port: &PortRef) -> Result<()> {
        self.require_port_deletion(&port.node)?;
        let existing = self
            .require_node(&port.node)?
            .require_port(port.direction, &port.name)?;
        if existing.locked {
            return Err(GraphError::LockedPort {
                node: port.node.clone(),
                port: port.name.clone(),
            });
        }
        let label = format!("delete {} port '{}'", port.direction, port.name);
        self.with_macro(&label, |graph| {
            graph.clear_connections(port)?;
            let command = Command::remove_port(&graph.model, port)?;
            graph.push(command)
        })
    }

    /// Remove an input port, dropping its connections
    pub fn delete_input(&mut self, node_id: &NodeId, name: &str) -> Result<()> {
        self.delete_port(&PortRef::input(node_id, name))
    }

    /// Remove an output port, dropping its connections
    pub fn delete_output(&mut self, node_id: &NodeId, name: &str) -> Result<()> {
        self.delete_port(&PortRef::output(node_id, name))
    }

    /// Replace every port of a node that allows port changes
    pub fn set_ports(&mut self, node_id: &NodeId, inputs: Vec<PortSpec>, outputs: Vec<PortSpec>) -> Result<()> {
        self.require_port_deletion(node_id)?;
        let existing: Vec<PortRef> = self
            .require_node(node_id)?
            .all_ports()
            .map(|p| p.port_ref())
            .collect();
        self.with_macro("set ports", |graph| {
            graph.detach_ports(&existing)?;
            for port in &existing {
                let command = Command::remove_port(&graph.model, port)?;
                graph.push(command)?;
            }
            for spec in inputs {
                graph.add_port(node_id, PortDirection::In, spec)?;
            }
            for spec in outputs {
                graph.add_port(node_id, PortDirection::Out, spec)?;
            }
            Ok(())
        })
    }

    fn detach_ports(&mut self, ports: &[PortRef]) -> Result<()> {
        for port in ports {
            let locked = self.model.port(port).is_some_and(|p| p.locked);
            if locked {
                self.push(Command::SetPortLocked {
                    port: port.clone(),
                    locked: false,
                })?;
            }
            self.clear_connections(port)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Lookups

    /// Make `name` unique among the node names, appending ` N` if needed
    pub fn get_unique_name(&self, name: &str) -> String {
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        let taken: Vec<&str> = self.model.nodes().map(|n| n.name.as_str()).collect();
        if !taken.contains(&name.as_str()) {
            return name;
        }
        let base = match name.rsplit_once(' ') {
            Some((head, digits))
                if !digits.is_empty()
                    && digits.chars().all(|c| c.is_ascii_digit())
                    && head.chars().last().is_some_and(|c| c.is_alphanumeric() || c == '_') =>
            {
                head.trim_end()
            }
            _ => name.as_str(),
        };
        (1..=taken.len() + 1)
            .map(|i| format!("{base} {i}"))
            .find(|candidate| !taken.contains(&candidate.as_str()))
            .unwrap_or_else(|| format!("{base} {}", taken.len() + 2))
    }

    /// First node with the given name
    pub fn get_node_by_name(&self, name: &str) -> Option<&Node> {
        self.model.nodes().find(|n| n.name == name)
    }

    /// Nodes of one type
    pub fn get_nodes_by_type(&self, type_id: &str) -> Vec<&Node> {
        self.model.nodes().filter(|n| n.type_id == type_id).collect()
    }
}

impl Default for NodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeGraph")
            .field("model", &self.model)
            .field("undo_stack", &self.undo_stack)
            .field("observers", &self.observers.len())
            .finish()
    }
}
