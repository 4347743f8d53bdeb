// SPDX-License-Identifier: MIT OR Apache-2.0
//! Elementary reversible graph mutations.
//!
//! Every change that goes through the undo engine is one of these values.
//! `apply` performs the change and `invert` restores the previous state;
//! both queue the matching [`GraphEvent`]s on the context.

use crate::error::{GraphError, Result};
use crate::event::GraphEvent;
use crate::graph::GraphModel;
use crate::node::{Node, NodeId};
use crate::port::{Port, PortRef};
use crate::property::PropertyValue;
use crate::registry::NodeRegistry;

/// What a command needs to run
pub struct CommandContext<'a> {
    /// Graph being edited
    pub model: &'a mut GraphModel,
    /// Registry providing node hooks
    pub registry: &'a NodeRegistry,
    /// Events waiting to be delivered
    pub events: &'a mut Vec<GraphEvent>,
}

/// An elementary reversible mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Insert a node; `index` `None` appends
    AddNode {
        /// Node to insert, without peers
        node: Box<Node>,
        /// Insertion index
        index: Option<usize>,
    },
    /// Remove nodes that no longer have connections
    RemoveNodes {
        /// Removed nodes with their former indices, ascending
        nodes: Vec<(usize, Node)>,
    },
    /// Change one property
    SetProperty {
        /// Node
        node: NodeId,
        /// Property name
        name: String,
        /// Value before the change
        old: PropertyValue,
        /// Value after the change
        new: PropertyValue,
    },
    /// Record a peer entry on both ports
    Connect {
        /// Output side
        output: PortRef,
        /// Input side
        input: PortRef,
    },
    /// Remove the peer entry from both ports
    Disconnect {
        /// Output side
        output: PortRef,
        /// Input side
        input: PortRef,
    },
    /// Run the connected hook of the input node
    InputConnected {
        /// Input side
        input: PortRef,
        /// Output side
        output: PortRef,
    },
    /// Run the disconnected hook of the input node
    InputDisconnected {
        /// Input side
        input: PortRef,
        /// Output side
        output: PortRef,
    },
    /// Lock or unlock a port
    SetPortLocked {
        /// Port
        port: PortRef,
        /// Lock state after the change
        locked: bool,
    },
    /// Show or hide a port
    SetPortVisible {
        /// Port
        port: PortRef,
        /// Visibility after the change
        visible: bool,
    },
    /// Attach a port to a node
    AddPort {
        /// Port to attach, without peers
        port: Box<Port>,
        /// Position among the ports of that direction
        index: usize,
    },
    /// Detach an unconnected port from a node
    RemovePort {
        /// Detached port
        port: Box<Port>,
        /// Former position among the ports of that direction
        index: usize,
    },
}

impl Command {
    /// Snapshot the nodes to remove, ordered by index
    pub fn remove_nodes(model: &GraphModel, node_ids: &[NodeId]) -> Result<Self> {
        let mut nodes = node_ids
            .iter()
            .map(|id| {
                let index = model.index_of(id).ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
                let node = model.node(id).ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
                Ok((index, node.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        nodes.sort_by_key(|(index, _)| *index);
        nodes.dedup_by(|a, b| a.0 == b.0);
        Ok(Self::RemoveNodes { nodes })
    }

    /// Snapshot a port to remove
    pub fn remove_port(model: &GraphModel, port: &PortRef) -> Result<Self> {
        let node = model
            .node(&port.node)
            .ok_or_else(|| GraphError::NodeNotFound(port.node.clone()))?;
        let index = node
            .ports(port.direction)
            .get_index_of(&port.name)
            .ok_or_else(|| GraphError::PortNotFound {
                node: port.node.clone(),
                direction: port.direction,
                port: port.name.clone(),
            })?;
        let detached = node.ports(port.direction)[index].clone();
        Ok(Self::RemovePort {
            port: Box::new(detached),
            index,
        })
    }

    /// Label used when the command is pushed outside of a macro
    pub fn label(&self) -> String {
        match self {
            Self::AddNode { node, .. } => format!("add node: '{}'", node.name),
            Self::RemoveNodes { nodes } => format!("remove {} node(s)", nodes.len()),
            Self::SetProperty { name, .. } => format!("property \"{name}\""),
            Self::Connect { .. } | Self::InputConnected { .. } => "connect port".to_string(),
            Self::Disconnect { .. } | Self::InputDisconnected { .. } => "disconnect port".to_string(),
            Self::SetPortLocked { locked: true, .. } => "lock port".to_string(),
            Self::SetPortLocked { locked: false, .. } => "unlock port".to_string(),
            Self::SetPortVisible { visible: true, .. } => "show port".to_string(),
            Self::SetPortVisible { visible: false, .. } => "hide port".to_string(),
            Self::AddPort { port, .. } => format!("add {} port '{}'", port.direction, port.name),
            Self::RemovePort { port, .. } => format!("delete {} port '{}'", port.direction, port.name),
        }
    }

    /// Perform the change
    pub fn apply(&self, ctx: &mut CommandContext<'_>) -> Result<()> {
        match self {
            Self::AddNode { node, index } => add_node(ctx, *index, node),
            Self::RemoveNodes { nodes } => {
                remove_nodes(ctx, nodes.iter().map(|(_, n)| &n.id));
                Ok(())
            }
            Self::SetProperty { node, name, new, .. } => set_property(ctx, node, name, new),
            Self::Connect { output, input } => link(ctx, output, input),
            Self::Disconnect { output, input } => unlink(ctx, output, input),
            Self::InputConnected { input, output } => run_hook(ctx, input, output, true),
            Self::InputDisconnected { input, output } => run_hook(ctx, input, output, false),
            Self::SetPortLocked { port, locked } => {
                port_mut(ctx.model, port)?.locked = *locked;
                Ok(())
            }
            Self::SetPortVisible { port, visible } => set_port_visible(ctx, port, *visible),
            Self::AddPort { port, index } => attach_port(ctx.model, port, *index),
            Self::RemovePort { port, .. } => detach_port(ctx.model, port),
        }
    }

    /// Restore the state before [`Command::apply`]
    pub fn invert(&self, ctx: &mut CommandContext<'_>) -> Result<()> {
        match self {
            Self::AddNode { node, .. } => {
                remove_nodes(ctx, std::iter::once(&node.id));
                Ok(())
            }
            Self::RemoveNodes { nodes } => {
                for (index, node) in nodes {
                    add_node(ctx, Some(*index), node)?;
                }
                Ok(())
            }
            Self::SetProperty { node, name, old, .. } => set_property(ctx, node, name, old),
            Self::Connect { output, input } => unlink(ctx, output, input),
            Self::Disconnect { output, input } => link(ctx, output, input),
            Self::InputConnected { input, output } => run_hook(ctx, input, output, false),
            Self::InputDisconnected { input, output } => run_hook(ctx, input, output, true),
            Self::SetPortLocked { port, locked } => {
                port_mut(ctx.model, port)?.locked = !*locked;
                Ok(())
            }
            Self::SetPortVisible { port, visible } => set_port_visible(ctx, port, !*visible),
            Self::AddPort { port, .. } => detach_port(ctx.model, port),
            Self::RemovePort { port, index } => attach_port(ctx.model, port, *index),
        }
    }
}

fn port_not_found(port: &PortRef) -> GraphError {
    GraphError::PortNotFound {
        node: port.node.clone(),
        direction: port.direction,
        port: port.name.clone(),
    }
}

fn port_mut<'m>(model: &'m mut GraphModel, port: &PortRef) -> Result<&'m mut Port> {
    if !model.contains(&port.node) {
        return Err(GraphError::NodeNotFound(port.node.clone()));
    }
    model.port_mut(port).ok_or_else(|| port_not_found(port))
}

fn set_port_visible(ctx: &mut CommandContext<'_>, port: &PortRef, visible: bool) -> Result<()> {
    port_mut(ctx.model, port)?.visible = visible;
    ctx.events.push(GraphEvent::PortVisibilityChanged {
        port: port.clone(),
        visible,
    });
    Ok(())
}

fn add_node(ctx: &mut CommandContext<'_>, index: Option<usize>, node: &Node) -> Result<()> {
    if ctx.model.contains(&node.id) {
        return Err(GraphError::DuplicateNode(node.id.clone()));
    }
    ctx.model.insert_node(index, node.clone());
    ctx.events.push(GraphEvent::NodeCreated(node.id.clone()));
    Ok(())
}

fn remove_nodes<'n>(ctx: &mut CommandContext<'_>, ids: impl Iterator<Item = &'n NodeId>) {
    let removed: Vec<NodeId> = ids
        .filter(|id| ctx.model.remove_node(id).is_some())
        .cloned()
        .collect();
    if !removed.is_empty() {
        ctx.events.push(GraphEvent::NodesDeleted(removed));
    }
}

fn set_property(ctx: &mut CommandContext<'_>, node_id: &NodeId, name: &str, value: &PropertyValue) -> Result<()> {
    let node = ctx
        .model
        .node_mut(node_id)
        .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))?;
    if node.get_property(name).as_ref() == Some(value) {
        return Ok(());
    }
    node.set_property(name, value.clone())?;
    ctx.events.push(GraphEvent::PropertyChanged {
        node: node_id.clone(),
        name: name.to_string(),
        value: value.clone(),
    });
    if name == "selected" {
        let ids = vec![node_id.clone()];
        let (selected, deselected) = if value.as_bool() == Some(true) {
            (ids, Vec::new())
        } else {
            (Vec::new(), ids)
        };
        ctx.events.push(GraphEvent::SelectionChanged { selected, deselected });
    }
    Ok(())
}

fn link(ctx: &mut CommandContext<'_>, output: &PortRef, input: &PortRef) -> Result<()> {
    port_mut(ctx.model, input)?;
    port_mut(ctx.model, output)?.add_peer(&input.node, &input.name);
    port_mut(ctx.model, input)?.add_peer(&output.node, &output.name);
    ctx.events.push(GraphEvent::PortConnected {
        input: input.clone(),
        output: output.clone(),
    });
    Ok(())
}

fn unlink(ctx: &mut CommandContext<'_>, output: &PortRef, input: &PortRef) -> Result<()> {
    port_mut(ctx.model, input)?;
    port_mut(ctx.model, output)?.remove_peer(&input.node, &input.name);
    port_mut(ctx.model, input)?.remove_peer(&output.node, &output.name);
    ctx.events.push(GraphEvent::PortDisconnected {
        input: input.clone(),
        output: output.clone(),
    });
    Ok(())
}

fn run_hook(ctx: &mut CommandContext<'_>, input: &PortRef, output: &PortRef, connected: bool) -> Result<()> {
    let node = ctx
        .model
        .node_mut(&input.node)
        .ok_or_else(|| GraphError::NodeNotFound(input.node.clone()))?;
    let Some(hooks) = ctx.registry.hooks(&node.type_id) else {
        return Ok(());
    };
    let before = node.custom_properties().clone();
    if connected {
        hooks.on_input_connected(node, &input.name, output);
    } else {
        hooks.on_input_disconnected(node, &input.name, output);
    }
    let changed: Vec<(String, PropertyValue)> = node
        .custom_properties()
        .iter()
        .filter(|(name, value)| before.get(*name) != Some(*value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    for (name, value) in changed {
        ctx.events.push(GraphEvent::PropertyChanged {
            node: input.node.clone(),
            name,
            value,
        });
    }
    Ok(())
}

fn attach_port(model: &mut GraphModel, port: &Port, index: usize) -> Result<()> {
    let node = model
        .node_mut(&port.node)
        .ok_or_else(|| GraphError::NodeNotFound(port.node.clone()))?;
    if node.port(port.direction, &port.name).is_some() {
        return Err(GraphError::DuplicateProperty(port.name.clone()));
    }
    node.insert_port(index, port.clone());
    Ok(())
}

fn detach_port(model: &mut GraphModel, port: &Port) -> Result<()> {
    let node = model
        .node_mut(&port.node)
        .ok_or_else(|| GraphError::NodeNotFound(port.node.clone()))?;
    node.take_port(port.direction, &port.name)
        .map(|_| ())
        .ok_or_else(|| port_not_found(&port.port_ref()))
}
