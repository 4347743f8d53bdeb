// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::node::NodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    #[serde(rename = "in")]
    In,
    /// Output port
    #[serde(rename = "out")]
    Out,
}

impl PortDirection {
    /// Short name used in session documents and constraint tables
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    /// The direction a peer of this port has
    pub fn opposite(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::In => "input",
            Self::Out => "output",
        })
    }
}

/// Address of a port from outside its node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortRef {
    /// Owning node
    pub node: NodeId,
    /// Port direction
    pub direction: PortDirection,
    /// Port name
    pub name: String,
}

impl PortRef {
    /// Create a port reference
    pub fn new(node: NodeId, direction: PortDirection, name: impl Into<String>) -> Self {
        Self {
            node,
            direction,
            name: name.into(),
        }
    }

    /// Reference an input port
    pub fn input(node: &NodeId, name: impl Into<String>) -> Self {
        Self::new(node.clone(), PortDirection::In, name)
    }

    /// Reference an output port
    pub fn output(node: &NodeId, name: impl Into<String>) -> Self {
        Self::new(node.clone(), PortDirection::Out, name)
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.node, self.name, self.direction)
    }
}

/// Declaration of a port before it is attached to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    /// Port name
    pub name: String,
    /// Allow more than one peer; `None` uses the direction default
    pub multi_connection: Option<bool>,
    /// Show the port label
    pub display_name: bool,
    /// Start locked
    pub locked: bool,
    /// Start visible
    pub visible: bool,
}

impl PortSpec {
    /// Create a spec with default flags
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multi_connection: None,
            display_name: true,
            locked: false,
            visible: true,
        }
    }

    /// Set whether the port accepts several peers
    pub fn multi(mut self, multi_connection: bool) -> Self {
        self.multi_connection = Some(multi_connection);
        self
    }

    /// Set whether the label is shown
    pub fn display_name(mut self, display_name: bool) -> Self {
        self.display_name = display_name;
        self
    }

    /// Create the port locked
    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Set the initial visibility
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Build the port for a node
    pub fn build(self, node: NodeId, direction: PortDirection) -> Port {
        Port {
            node,
            multi_connection: self
                .multi_connection
                .unwrap_or(direction == PortDirection::Out),
            direction,
            name: self.name,
            display_name: self.display_name,
            visible: self.visible,
            locked: self.locked,
            connected_peers: IndexMap::new(),
        }
    }
}

impl From<&str> for PortSpec {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PortSpec {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A port on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Owning node
    pub node: NodeId,
    /// Port name, unique per node and direction
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Show the port label
    pub display_name: bool,
    /// Whether multiple connections are allowed
    pub multi_connection: bool,
    /// Port visibility
    pub visible: bool,
    /// Locked ports neither gain nor lose connections
    pub locked: bool,
    /// Peer node id -> peer port names
    connected_peers: IndexMap<NodeId, Vec<String>>,
}

impl Port {
    /// Reference to this port
    pub fn port_ref(&self) -> PortRef {
        PortRef::new(self.node.clone(), self.direction, self.name.clone())
    }

    /// Connected peers grouped by node
    pub fn peers(&self) -> &IndexMap<NodeId, Vec<String>> {
        &self.connected_peers
    }

    /// Connected peers as port references
    pub fn peer_refs(&self) -> Vec<PortRef> {
        let direction = self.direction.opposite();
        self.connected_peers
            .iter()
            .flat_map(|(node, names)| {
                names
                    .iter()
                    .map(move |name| PortRef::new(node.clone(), direction, name.clone()))
            })
            .collect()
    }

    /// Total number of peers
    pub fn peer_count(&self) -> usize {
        self.connected_peers.values().map(Vec::len).sum()
    }

    /// Whether the port has any peer
    pub fn is_connected(&self) -> bool {
        !self.connected_peers.is_empty()
    }

    /// Whether `node.name` is a peer of this port
    pub fn is_connected_to(&self, node: &NodeId, name: &str) -> bool {
        self.connected_peers
            .get(node)
            .is_some_and(|names| names.iter().any(|n| n == name))
    }

    pub(crate) fn add_peer(&mut self, node: &NodeId, name: &str) {
        let names = self.connected_peers.entry(node.clone()).or_default();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    pub(crate) fn remove_peer(&mut self, node: &NodeId, name: &str) -> bool {
        let Some(names) = self.connected_peers.get_mut(node) else {
            return false;
        };
        let before = names.len();
        names.retain(|n| n != name);
        let removed = names.len() != before;
        if names.is_empty() {
            self.connected_peers.shift_remove(node);
        }
        removed
    }

    pub(crate) fn clear_peers(&mut self) {
        self.connected_peers.clear();
    }

    pub(crate) fn set_node(&mut self, node: NodeId) {
        self.node = node;
    }
}
